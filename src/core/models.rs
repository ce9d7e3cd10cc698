use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{AcquireError, Result};

/// Identifies one remote module package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRequest {
    pub name: String,
    pub version: String,
}

impl ModuleRequest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AcquireError::Validation(
                "module name must be present".to_string(),
            ));
        }
        Ok(())
    }
}

/// Install state of a module as seen by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailableType {
    Available,
    NeedDownload,
    NeedUpdate,
}

/// A module's descriptor, read from `<modules>/<name>.json` after extraction.
///
/// Every field the module defines is kept as-is in `fields`; only
/// `availableType` is owned here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(
        rename = "availableType",
        default,
        deserialize_with = "lenient_available_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub available_type: Option<AvailableType>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl HardwareConfig {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn mark_available(&mut self) {
        self.available_type = Some(AvailableType::Available);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Unrecognized prior markers read as None; acquisition overwrites the field anyway.
fn lenient_available_type<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<AvailableType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// One well-known payload directory moved out of the extracted module tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationPair {
    Drivers,
    Firmwares,
}

impl RelocationPair {
    pub const ALL: [RelocationPair; 2] = [RelocationPair::Drivers, RelocationPair::Firmwares];

    /// Directory name, identical at source and destination.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Drivers => "drivers",
            Self::Firmwares => "firmwares",
        }
    }
}
