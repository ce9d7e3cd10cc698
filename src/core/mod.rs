pub mod block;
pub mod encryption;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod relocator;

pub use block::{BLOCK_KEYS, BlockFetcher, BlockReport};
pub use encryption::{CommandEncryption, EncryptionGateway, create_gateway};
pub use extractor::{ExtractSummary, extract_stream};
pub use models::{AvailableType, HardwareConfig, ModuleRequest, RelocationPair};
pub use orchestrator::Orchestrator;
pub use paths::{DirectoryResolver, ModuleDirectories};
pub use relocator::{Relocation, Relocator};
