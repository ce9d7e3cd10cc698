use std::path::{Path, PathBuf};

/// Canonical locations the acquisition pipeline reads from and writes to.
pub trait DirectoryResolver: Send + Sync {
    /// Extraction target for module archives.
    fn modules(&self) -> PathBuf;

    /// Parent of the per-module `block` asset directories.
    fn block_modules(&self) -> PathBuf;

    /// Install root that receives relocated `drivers/` and `firmwares/`.
    fn module_root(&self) -> PathBuf;
}

/// Standard layout under a single install root.
#[derive(Debug, Clone)]
pub struct ModuleDirectories {
    root: PathBuf,
}

impl ModuleDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DirectoryResolver for ModuleDirectories {
    fn modules(&self) -> PathBuf {
        self.root.join("modules")
    }

    fn block_modules(&self) -> PathBuf {
        self.root.join("block_modules")
    }

    fn module_root(&self) -> PathBuf {
        self.root.clone()
    }
}
