use std::path::{Path, PathBuf};

use log::warn;

use crate::dwarf::{Dwarf, Location};
use crate::elf::Elf;
use crate::error::Result;

struct Binary {
    path: PathBuf,
    dwarf: Dwarf,
}

/// Resolves addresses against several binaries, first hit wins.
///
/// Each binary's debug information is independent; a binary that fails to
/// load or to decode is skipped with a warning rather than failing the whole
/// lookup.
#[derive(Default)]
pub struct Symbolizer {
    binaries: Vec<Binary>,
}

impl Symbolizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every path that can be loaded, warning about the rest.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut symbolizer = Self::new();
        for path in paths {
            let path = path.as_ref();
            if let Err(err) = symbolizer.add_binary(path) {
                warn!("skipping {}: {err}", path.display());
            }
        }
        symbolizer
    }

    pub fn add_binary(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let elf = Elf::open(path)?;
        let dwarf = Dwarf::load(&elf)?;
        self.add_dwarf(path, dwarf);
        Ok(())
    }

    pub fn add_dwarf(&mut self, path: impl Into<PathBuf>, dwarf: Dwarf) {
        self.binaries.push(Binary {
            path: path.into(),
            dwarf,
        });
    }

    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.binaries.iter().map(|binary| binary.path.as_path())
    }

    pub fn resolve(&self, address: u64) -> Option<Location> {
        for binary in &self.binaries {
            match binary.dwarf.resolve(address) {
                Ok(Some(location)) => return Some(location),
                Ok(None) => {}
                Err(err) => warn!("{}: {address:#x}: {err}", binary.path.display()),
            }
        }
        None
    }
}
