use log::debug;

use crate::dwarf::reader::{check_address_size, Reader};
use crate::dwarf::unit::DWARF64_ESCAPE;
use crate::error::{DwarfError, Result};

const SECTION: &str = ".debug_aranges";

/// Bytes from the start of a range-set to the end of its header.
const ARANGE_HEADER_SIZE: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArangeEntry {
    pub segment: u64,
    pub address: u64,
    pub length: u64,
}

impl ArangeEntry {
    pub fn contains(&self, address: u64) -> bool {
        address >= self.address && address - self.address < self.length
    }
}

/// Address ranges covered by one compilation unit.
#[derive(Clone, Debug)]
pub struct ArangeSet {
    pub offset: usize,
    pub version: u16,
    pub debug_info_offset: usize,
    pub address_size: u8,
    pub segment_size: u8,
    pub entries: Vec<ArangeEntry>,
}

impl ArangeSet {
    /// Parses the set at `offset`, returning it with the offset of the next set.
    fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cur = Reader::at(data, SECTION, offset)?;
        let unit_length = cur.read_u32()?;
        if unit_length >= DWARF64_ESCAPE {
            return Err(DwarfError::UnsupportedFormat {
                section: SECTION,
                offset,
            });
        }
        let mut set = cur.split(unit_length as usize)?;
        let next = cur.offset();

        let version = set.read_u16()?;
        if version != 2 {
            return Err(DwarfError::UnsupportedVersion {
                section: SECTION,
                offset,
                version,
            });
        }
        let debug_info_offset = set.read_u32()? as usize;
        let address_size = set.read_u8()?;
        check_address_size(address_size, SECTION, set.offset() - 1)?;
        let segment_size = set.read_u8()?;
        if segment_size != 0 {
            check_address_size(segment_size, SECTION, set.offset() - 1)?;
        }

        // Tuples start at a multiple of the tuple size from the set start.
        let tuple_size = 2 * address_size as usize + segment_size as usize;
        let padding = (tuple_size - ARANGE_HEADER_SIZE % tuple_size) % tuple_size;
        set.advance(padding)?;

        let mut entries = Vec::new();
        while !set.is_finished() {
            let segment = if segment_size == 0 {
                0
            } else {
                set.read_address(segment_size)?
            };
            let address = set.read_address(address_size)?;
            let length = set.read_address(address_size)?;
            if segment == 0 && address == 0 && length == 0 {
                break;
            }
            entries.push(ArangeEntry {
                segment,
                address,
                length,
            });
        }

        let parsed = Self {
            offset,
            version,
            debug_info_offset,
            address_size,
            segment_size,
            entries,
        };
        Ok((parsed, next))
    }
}

/// Address to compilation unit index built from `.debug_aranges`.
#[derive(Clone, Debug, Default)]
pub struct ArangeIndex {
    sets: Vec<ArangeSet>,
}

impl ArangeIndex {
    pub fn parse(debug_aranges: &[u8]) -> Result<Self> {
        let mut sets = Vec::new();
        let mut offset = 0;
        while offset < debug_aranges.len() {
            let (set, next) = ArangeSet::parse(debug_aranges, offset)?;
            sets.push(set);
            offset = next;
        }
        debug!("indexed {} address range sets", sets.len());
        Ok(Self { sets })
    }

    pub fn sets(&self) -> &[ArangeSet] {
        &self.sets
    }

    /// `.debug_info` offset of the first unit whose ranges cover `address`.
    pub fn find_unit(&self, address: u64) -> Option<usize> {
        self.sets
            .iter()
            .find(|set| set.entries.iter().any(|entry| entry.contains(address)))
            .map(|set| set.debug_info_offset)
    }
}
