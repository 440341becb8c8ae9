//! DWARF 2-4 decoding for address to source lookups.
//!
//! [`Dwarf`] owns the six debug sections of one object. The address range
//! index is built up front; compilation units are decoded the first time an
//! address lands in them and kept for the lifetime of the `Dwarf`.

pub mod abbrev;
pub mod aranges;
pub mod constants;
pub mod function;
pub mod line;
pub mod reader;
pub mod unit;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace};
use once_cell::sync::OnceCell;

use crate::error::{DwarfError, Result};
use crate::utils::parse_address;

use aranges::ArangeIndex;
use function::{find_function, UnitLookup};
use unit::{CompileUnit, UnitHeader};

/// Anything that can hand out section bytes by name.
pub trait SectionSource {
    fn section_data(&self, name: &str) -> Option<&[u8]>;
}

impl SectionSource for HashMap<String, Vec<u8>> {
    fn section_data(&self, name: &str) -> Option<&[u8]> {
        self.get(name).map(Vec::as_slice)
    }
}

/// Immutable copies of the debug sections, shared by every decoded unit.
#[derive(Clone, Debug)]
pub struct DwarfSections {
    pub debug_info: Arc<[u8]>,
    pub debug_abbrev: Arc<[u8]>,
    pub debug_aranges: Arc<[u8]>,
    pub debug_line: Arc<[u8]>,
    pub debug_str: Arc<[u8]>,
    pub debug_ranges: Arc<[u8]>,
}

impl DwarfSections {
    pub fn load<S: SectionSource + ?Sized>(source: &S) -> Result<Self> {
        let section = |name: &'static str| -> Result<Arc<[u8]>> {
            source
                .section_data(name)
                .map(Arc::from)
                .ok_or(DwarfError::MissingSection(name))
        };
        Ok(Self {
            debug_info: section(".debug_info")?,
            debug_abbrev: section(".debug_abbrev")?,
            debug_aranges: section(".debug_aranges")?,
            debug_line: section(".debug_line")?,
            debug_str: section(".debug_str")?,
            debug_ranges: section(".debug_ranges")?,
        })
    }

    pub fn from_map(map: HashMap<String, Vec<u8>>) -> Result<Self> {
        Self::load(&map)
    }
}

/// Source position of one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub address: u64,
    pub file: String,
    pub line: u64,
    pub function: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

type UnitCell = Arc<OnceCell<Arc<CompileUnit>>>;

pub struct Dwarf {
    sections: DwarfSections,
    aranges: ArangeIndex,
    units: Mutex<HashMap<usize, UnitCell>>,
    parse_count: AtomicUsize,
}

impl Dwarf {
    pub fn new(sections: DwarfSections) -> Result<Self> {
        let aranges = ArangeIndex::parse(&sections.debug_aranges)?;
        Ok(Self {
            sections,
            aranges,
            units: Mutex::new(HashMap::new()),
            parse_count: AtomicUsize::new(0),
        })
    }

    pub fn load<S: SectionSource + ?Sized>(source: &S) -> Result<Self> {
        Self::new(DwarfSections::load(source)?)
    }

    pub fn sections(&self) -> &DwarfSections {
        &self.sections
    }

    pub fn aranges(&self) -> &ArangeIndex {
        &self.aranges
    }

    /// Number of compilation units decoded so far.
    pub fn cu_parse_count(&self) -> usize {
        self.parse_count.load(Ordering::SeqCst)
    }

    /// The unit whose header starts at `offset`, decoding it on first use.
    ///
    /// Concurrent callers asking for the same unit wait for a single decode.
    pub fn unit(&self, offset: usize) -> Result<Arc<CompileUnit>> {
        let cell = {
            let mut units = self.units.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(units.entry(offset).or_default())
        };
        cell.get_or_try_init(|| {
            let header = UnitHeader::parse(&self.sections.debug_info, offset)?;
            let unit = CompileUnit::parse(header, &self.sections)?;
            self.parse_count.fetch_add(1, Ordering::SeqCst);
            debug!(
                "parsed unit at {offset:#x}: {} entries, {} line rows",
                unit.dies().len(),
                unit.line_table().map_or(0, |table| table.rows().len())
            );
            Ok(Arc::new(unit))
        })
        .map(Arc::clone)
    }

    pub fn resolve(&self, address: u64) -> Result<Option<Location>> {
        let Some(offset) = self.aranges.find_unit(address) else {
            trace!("{address:#x}: no unit covers this address");
            return Ok(None);
        };
        let unit = self.unit(offset)?;

        let Some(table) = unit.line_table() else {
            trace!("{address:#x}: unit {offset:#x} has no line table");
            return Ok(None);
        };
        let Some(row) = table.find(address) else {
            trace!("{address:#x}: no line row in unit {offset:#x}");
            return Ok(None);
        };

        let function = find_function(&unit, address, &self.sections.debug_ranges, self)?;
        Ok(Some(Location {
            address,
            file: table.file_path(row).to_string_lossy().into_owned(),
            line: row.line,
            function,
        }))
    }

    /// Like [`Dwarf::resolve`] for a `0x`-prefixed hex or decimal string.
    pub fn resolve_str(&self, address: &str) -> Result<Option<Location>> {
        self.resolve(parse_address(address)?)
    }
}

impl UnitLookup for Dwarf {
    fn unit_containing(&self, section_offset: usize) -> Result<Option<Arc<CompileUnit>>> {
        match UnitHeader::containing(&self.sections.debug_info, section_offset)? {
            Some(header) => self.unit(header.offset).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Dwarf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dwarf")
            .field("aranges", &self.aranges.sets().len())
            .field("parsed_units", &self.cu_parse_count())
            .finish()
    }
}
