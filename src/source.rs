//! File access for `.inc` and `.incbin`.
//!
//! The assembler never touches the filesystem itself; the host hands it a
//! [`SourceLoader`] so that assembling from in-memory strings works the
//! same way as assembling from disk.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Target of an `.inc` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludePath {
    /// `.inc <path>`, looked up in the system include directory.
    System(String),
    /// `.inc "path"`, relative to the project.
    Project(String),
}

impl IncludePath {
    pub fn name(&self) -> &str {
        match self {
            IncludePath::System(name) | IncludePath::Project(name) => name,
        }
    }
}

pub trait SourceLoader {
    fn load_source(&self, path: &IncludePath) -> Result<String>;
    fn load_binary(&self, path: &str) -> Result<Vec<u8>>;
}

/// Reads includes from disk.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
    system_dir: PathBuf,
}

impl FsLoader {
    /// Project paths resolve against `base_dir`, system paths against
    /// `base_dir/nes_lib` unless [`FsLoader::with_system_dir`] says otherwise.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> FsLoader {
        let base_dir = base_dir.as_ref().to_path_buf();
        FsLoader {
            system_dir: base_dir.join("nes_lib"),
            base_dir,
        }
    }

    pub fn with_system_dir<P: AsRef<Path>>(mut self, system_dir: P) -> FsLoader {
        self.system_dir = system_dir.as_ref().to_path_buf();
        self
    }

    fn resolve(&self, path: &IncludePath) -> PathBuf {
        match path {
            IncludePath::System(name) => self.system_dir.join(name),
            IncludePath::Project(name) => self.base_dir.join(name),
        }
    }
}

fn read_file(path: PathBuf) -> Result<Vec<u8>> {
    fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound { path },
        _ => Error::Io(e),
    })
}

impl SourceLoader for FsLoader {
    fn load_source(&self, path: &IncludePath) -> Result<String> {
        let raw = read_file(self.resolve(path))?;
        String::from_utf8(raw).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn load_binary(&self, path: &str) -> Result<Vec<u8>> {
        read_file(self.base_dir.join(path))
    }
}

/// Serves includes from memory, for tests and for callers that have no
/// filesystem. An empty loader refuses every include.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
    system_files: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> MemoryLoader {
        MemoryLoader::default()
    }

    pub fn with_file<C: Into<Vec<u8>>>(mut self, name: &str, contents: C) -> MemoryLoader {
        self.files.insert(name.to_string(), contents.into());
        self
    }

    pub fn with_system_file<C: Into<Vec<u8>>>(mut self, name: &str, contents: C) -> MemoryLoader {
        self.system_files.insert(name.to_string(), contents.into());
        self
    }

    fn lookup(files: &HashMap<String, Vec<u8>>, name: &str) -> Result<Vec<u8>> {
        files.get(name).cloned().ok_or_else(|| Error::FileNotFound {
            path: PathBuf::from(name),
        })
    }
}

impl SourceLoader for MemoryLoader {
    fn load_source(&self, path: &IncludePath) -> Result<String> {
        let raw = match path {
            IncludePath::System(name) => MemoryLoader::lookup(&self.system_files, name)?,
            IncludePath::Project(name) => MemoryLoader::lookup(&self.files, name)?,
        };
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn load_binary(&self, path: &str) -> Result<Vec<u8>> {
        MemoryLoader::lookup(&self.files, path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new()
            .with_file("sprites.chr", vec![1u8, 2, 3])
            .with_file("lib.asm", "nop")
            .with_system_file("ppu.asm", "rts");
        assert_eq!(loader.load_binary("sprites.chr").unwrap(), vec![1, 2, 3]);
        assert_eq!(
            loader
                .load_source(&IncludePath::Project("lib.asm".to_string()))
                .unwrap(),
            "nop"
        );
        assert_eq!(
            loader
                .load_source(&IncludePath::System("ppu.asm".to_string()))
                .unwrap(),
            "rts"
        );
        assert!(matches!(
            loader.load_source(&IncludePath::System("lib.asm".to_string())),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_fs_loader_reports_missing_files() {
        let loader = FsLoader::new(env!("CARGO_MANIFEST_DIR"));
        assert!(matches!(
            loader.load_binary("no/such/file.chr"),
            Err(Error::FileNotFound { .. })
        ));
        let manifest = loader
            .load_source(&IncludePath::Project("Cargo.toml".to_string()))
            .unwrap();
        assert!(manifest.contains("[package]"));
    }

    #[test]
    fn test_fs_loader_system_dir() {
        let loader = FsLoader::new("/project").with_system_dir("/usr/share/nes");
        assert_eq!(
            loader.resolve(&IncludePath::System("apu.asm".to_string())),
            PathBuf::from("/usr/share/nes/apu.asm")
        );
        assert_eq!(
            loader.resolve(&IncludePath::Project("src/main.asm".to_string())),
            PathBuf::from("/project/src/main.asm")
        );
    }
}
