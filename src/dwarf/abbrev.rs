use std::collections::HashMap;

use crate::dwarf::constants::{DwAt, DwForm, DwTag, DW_CHILDREN_NO};
use crate::dwarf::reader::Reader;
use crate::error::{DwarfError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: DwAt,
    pub form: DwForm,
}

/// DIE template: tag, children flag and the attribute layout that follows the code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Abbrev {
    pub code: u64,
    pub tag: DwTag,
    pub has_children: bool,
    pub attr_specs: Vec<AttrSpec>,
}

#[derive(Clone, Debug, Default)]
pub struct AbbrevTable {
    entries: HashMap<u64, Abbrev>,
}

impl AbbrevTable {
    /// Parses the table starting at `offset` in `.debug_abbrev`.
    ///
    /// The table ends at a zero code or at the end of the section. A code
    /// declared twice is rejected since DIEs referencing it would be ambiguous.
    pub fn parse(debug_abbrev: &[u8], offset: usize) -> Result<Self> {
        let mut cur = Reader::at(debug_abbrev, ".debug_abbrev", offset)?;
        let mut entries = HashMap::new();

        while !cur.is_finished() {
            let entry_offset = cur.offset();
            let code = cur.read_uleb128()?;
            if code == 0 {
                break;
            }
            let tag = DwTag(cur.read_uleb128()?);
            let has_children = cur.read_u8()? != DW_CHILDREN_NO;
            let mut attr_specs = Vec::new();
            loop {
                let name = cur.read_uleb128()?;
                let form = cur.read_uleb128()?;
                if name == 0 && form == 0 {
                    break;
                }
                attr_specs.push(AttrSpec {
                    name: DwAt(name),
                    form: DwForm(form),
                });
            }

            let abbrev = Abbrev {
                code,
                tag,
                has_children,
                attr_specs,
            };
            if entries.insert(code, abbrev).is_some() {
                return Err(DwarfError::DuplicateAbbreviation {
                    code,
                    offset: entry_offset,
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, code: u64) -> Option<&Abbrev> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
