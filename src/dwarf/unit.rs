use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use crate::dwarf::abbrev::AbbrevTable;
use crate::dwarf::constants::*;
use crate::dwarf::line::LineTable;
use crate::dwarf::reader::{check_address_size, to_usize, Reader};
use crate::dwarf::DwarfSections;
use crate::error::{DwarfError, Result};

/// Size of a 32-bit DWARF 2-4 compilation unit header.
pub const CU_HEADER_SIZE: usize = 11;

/// Unit lengths at or above this value are reserved; 0xffffffff introduces
/// the 64-bit format.
pub const DWARF64_ESCAPE: u32 = 0xffff_fff0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitHeader {
    /// Offset of the header within `.debug_info`.
    pub offset: usize,
    pub unit_length: u32,
    pub version: u16,
    pub abbrev_offset: u32,
    pub address_size: u8,
}

impl UnitHeader {
    pub fn parse(debug_info: &[u8], offset: usize) -> Result<Self> {
        let section = ".debug_info";
        let mut cur = Reader::at(debug_info, section, offset)?;
        let unit_length = cur.read_u32()?;
        if unit_length >= DWARF64_ESCAPE {
            return Err(DwarfError::UnsupportedFormat { section, offset });
        }
        let version = cur.read_u16()?;
        if !(2..=4).contains(&version) {
            return Err(DwarfError::UnsupportedVersion {
                section,
                offset,
                version,
            });
        }
        let abbrev_offset = cur.read_u32()?;
        let size_offset = cur.offset();
        let address_size = cur.read_u8()?;
        check_address_size(address_size, section, size_offset)?;

        let header = Self {
            offset,
            unit_length,
            version,
            abbrev_offset,
            address_size,
        };
        if (unit_length as usize) < CU_HEADER_SIZE - 4 || header.end() > debug_info.len() {
            return Err(DwarfError::UnexpectedEof {
                section,
                offset: header.end().min(debug_info.len()),
            });
        }
        Ok(header)
    }

    /// Walks the unit headers of `.debug_info` to find the unit that owns
    /// `section_offset`.
    pub fn containing(debug_info: &[u8], section_offset: usize) -> Result<Option<Self>> {
        let mut offset = 0;
        while offset < debug_info.len() {
            let header = Self::parse(debug_info, offset)?;
            if header.contains(section_offset) {
                return Ok(Some(header));
            }
            offset = header.end();
        }
        Ok(None)
    }

    pub fn total_size(&self) -> usize {
        self.unit_length as usize + 4
    }

    pub fn end(&self) -> usize {
        self.offset + self.total_size()
    }

    /// The DIE bytes of this unit, as a range of `.debug_info`.
    pub fn data_range(&self) -> Range<usize> {
        self.offset + CU_HEADER_SIZE..self.end()
    }

    pub fn contains(&self, section_offset: usize) -> bool {
        self.offset <= section_offset && section_offset < self.end()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    Address(u64),
    Block(Vec<u8>),
    /// `DW_FORM_data1/2/4/8`, kept as the raw little-endian bytes.
    Data(Vec<u8>),
    Udata(u64),
    Sdata(i64),
    String(String),
    Flag(bool),
    /// Offset from the start of the owning unit's header.
    UnitRef(usize),
    /// Offset into `.debug_info`.
    SectionRef(usize),
    SecOffset(u64),
    Exprloc(Vec<u8>),
    Signature(u64),
}

impl AttrValue {
    pub fn as_address(&self) -> Option<u64> {
        match self {
            AttrValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Numeric value of constant-class and section-offset values.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttrValue::Data(bytes) => le_value(bytes),
            AttrValue::Udata(value) | AttrValue::SecOffset(value) => Some(*value),
            AttrValue::Sdata(value) => Some(*value as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Little-endian value of a 1, 2, 4 or 8 byte constant.
pub fn le_value(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        1 | 2 | 4 | 8 => {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            Some(u64::from_le_bytes(buf))
        }
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: DwAt,
    /// Effective form; `DW_FORM_indirect` is replaced by the form it names.
    pub form: DwForm,
    pub value: AttrValue,
}

#[derive(Clone, Debug)]
pub struct Die {
    /// Offset of the abbreviation code, relative to the start of the unit's DIE data.
    pub offset: usize,
    pub code: u64,
    pub tag: DwTag,
    pub has_children: bool,
    pub attributes: Vec<Attribute>,
    /// Index of the enclosing DIE in the unit's DIE list.
    pub parent: Option<usize>,
}

impl Die {
    /// Null entries close the most recent scope that has children.
    pub fn is_null(&self) -> bool {
        self.code == 0
    }

    pub fn attr(&self, name: DwAt) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn value(&self, name: DwAt) -> Option<&AttrValue> {
        self.attr(name).map(|attr| &attr.value)
    }

    pub fn name(&self) -> Option<&str> {
        self.value(DW_AT_NAME).and_then(AttrValue::as_str)
    }
}

/// What attribute decoding needs to know about the unit being read.
pub(crate) struct AttrContext<'a> {
    pub version: u16,
    pub address_size: u8,
    pub debug_str: &'a [u8],
}

pub(crate) fn read_attr_value(
    cur: &mut Reader<'_>,
    form: DwForm,
    ctx: &AttrContext<'_>,
) -> Result<(DwForm, AttrValue)> {
    let start = cur.offset();
    let mut form = form;
    if form == DW_FORM_INDIRECT {
        form = DwForm(cur.read_uleb128()?);
        // An indirect form never names another indirect form.
        if form == DW_FORM_INDIRECT {
            return Err(DwarfError::UnsupportedForm {
                form,
                offset: start,
            });
        }
    }
    let value = match form {
        DW_FORM_ADDR => AttrValue::Address(cur.read_address(ctx.address_size)?),
        DW_FORM_BLOCK1 => {
            let len = cur.read_u8()? as usize;
            AttrValue::Block(cur.read_bytes(len)?.to_vec())
        }
        DW_FORM_BLOCK2 => {
            let len = cur.read_u16()? as usize;
            AttrValue::Block(cur.read_bytes(len)?.to_vec())
        }
        DW_FORM_BLOCK4 => {
            let len = to_usize(u64::from(cur.read_u32()?), cur.section(), start)?;
            AttrValue::Block(cur.read_bytes(len)?.to_vec())
        }
        DW_FORM_BLOCK => {
            let len = cur.read_uleb128_usize()?;
            AttrValue::Block(cur.read_bytes(len)?.to_vec())
        }
        DW_FORM_DATA1 => AttrValue::Data(cur.read_bytes(1)?.to_vec()),
        DW_FORM_DATA2 => AttrValue::Data(cur.read_bytes(2)?.to_vec()),
        DW_FORM_DATA4 => AttrValue::Data(cur.read_bytes(4)?.to_vec()),
        DW_FORM_DATA8 => AttrValue::Data(cur.read_bytes(8)?.to_vec()),
        DW_FORM_SDATA => AttrValue::Sdata(cur.read_sleb128()?),
        DW_FORM_UDATA => AttrValue::Udata(cur.read_uleb128()?),
        DW_FORM_STRING => AttrValue::String(cur.read_string()?),
        DW_FORM_STRP => {
            let offset = cur.read_u32()? as usize;
            let mut strings = Reader::at(ctx.debug_str, ".debug_str", offset)?;
            AttrValue::String(strings.read_string()?)
        }
        DW_FORM_FLAG => AttrValue::Flag(cur.read_u8()? != 0),
        DW_FORM_FLAG_PRESENT => AttrValue::Flag(true),
        DW_FORM_REF1 => AttrValue::UnitRef(cur.read_u8()? as usize),
        DW_FORM_REF2 => AttrValue::UnitRef(cur.read_u16()? as usize),
        DW_FORM_REF4 => AttrValue::UnitRef(cur.read_u32()? as usize),
        DW_FORM_REF8 => AttrValue::UnitRef(to_usize(cur.read_u64()?, cur.section(), start)?),
        DW_FORM_REF_UDATA => AttrValue::UnitRef(cur.read_uleb128_usize()?),
        DW_FORM_REF_ADDR => {
            // DWARF 2 sized this as an address, later versions as an offset.
            let offset = if ctx.version == 2 {
                cur.read_address(ctx.address_size)?
            } else {
                u64::from(cur.read_u32()?)
            };
            AttrValue::SectionRef(to_usize(offset, cur.section(), start)?)
        }
        DW_FORM_SEC_OFFSET => AttrValue::SecOffset(u64::from(cur.read_u32()?)),
        DW_FORM_EXPRLOC => {
            let len = cur.read_uleb128_usize()?;
            AttrValue::Exprloc(cur.read_bytes(len)?.to_vec())
        }
        DW_FORM_REF_SIG8 => AttrValue::Signature(cur.read_u64()?),
        other => {
            return Err(DwarfError::UnsupportedForm {
                form: other,
                offset: start,
            })
        }
    };
    Ok((form, value))
}

/// Expands every entry of a unit against its abbreviations.
///
/// Returns the DIEs in stream order together with a map from each entry's
/// data-relative offset to its index.
pub(crate) fn parse_dies(
    mut cur: Reader<'_>,
    abbrevs: &AbbrevTable,
    ctx: &AttrContext<'_>,
) -> Result<(Vec<Die>, HashMap<usize, usize>)> {
    let data_start = cur.offset();
    let mut dies = Vec::new();
    let mut die_offsets = HashMap::new();
    let mut parents: Vec<usize> = Vec::new();

    while !cur.is_finished() {
        let begin = cur.offset();
        let offset = begin - data_start;
        let code = cur.read_uleb128()?;
        die_offsets.insert(offset, dies.len());

        if code == 0 {
            let parent = parents.pop();
            dies.push(Die {
                offset,
                code,
                tag: DW_TAG_NULL,
                has_children: false,
                attributes: Vec::new(),
                parent,
            });
            continue;
        }

        let abbrev = abbrevs
            .get(code)
            .ok_or(DwarfError::UnknownAbbreviation {
                code,
                offset: begin,
            })?;

        let mut attributes = Vec::with_capacity(abbrev.attr_specs.len());
        for spec in &abbrev.attr_specs {
            let (form, value) = read_attr_value(&mut cur, spec.form, ctx)?;
            attributes.push(Attribute {
                name: spec.name,
                form,
                value,
            });
        }

        let index = dies.len();
        dies.push(Die {
            offset,
            code,
            tag: abbrev.tag,
            has_children: abbrev.has_children,
            attributes,
            parent: parents.last().copied(),
        });
        if abbrev.has_children {
            parents.push(index);
        }
    }

    Ok((dies, die_offsets))
}

/// A fully decoded compilation unit: abbreviations, DIE arena and line table.
pub struct CompileUnit {
    header: UnitHeader,
    debug_info: Arc<[u8]>,
    abbrevs: AbbrevTable,
    dies: Vec<Die>,
    die_offsets: HashMap<usize, usize>,
    line_table: Option<LineTable>,
}

impl CompileUnit {
    pub fn parse(header: UnitHeader, sections: &DwarfSections) -> Result<Self> {
        let abbrevs = AbbrevTable::parse(&sections.debug_abbrev, header.abbrev_offset as usize)?;

        let range = header.data_range();
        let cur = Reader::at(&sections.debug_info[..range.end], ".debug_info", range.start)?;
        let ctx = AttrContext {
            version: header.version,
            address_size: header.address_size,
            debug_str: &sections.debug_str,
        };
        let (dies, die_offsets) = parse_dies(cur, &abbrevs, &ctx)?;

        let stmt_list = dies.first().and_then(|root| {
            let offset = root.value(DW_AT_STMT_LIST)?.as_u64()?;
            Some((offset, range.start + root.offset))
        });
        let line_table = match stmt_list {
            Some((offset, die_offset)) => {
                let offset = to_usize(offset, ".debug_info", die_offset)?;
                Some(LineTable::parse(
                    &sections.debug_line,
                    offset,
                    header.address_size,
                )?)
            }
            None => None,
        };

        Ok(Self {
            header,
            debug_info: Arc::clone(&sections.debug_info),
            abbrevs,
            dies,
            die_offsets,
            line_table,
        })
    }

    pub fn header(&self) -> &UnitHeader {
        &self.header
    }

    /// Offset of this unit's header in `.debug_info`.
    pub fn offset(&self) -> usize {
        self.header.offset
    }

    pub fn address_size(&self) -> u8 {
        self.header.address_size
    }

    pub fn abbrevs(&self) -> &AbbrevTable {
        &self.abbrevs
    }

    /// DIE bytes of the unit, header excluded.
    pub fn data(&self) -> &[u8] {
        &self.debug_info[self.header.data_range()]
    }

    pub fn dies(&self) -> &[Die] {
        &self.dies
    }

    pub fn die(&self, index: usize) -> Option<&Die> {
        self.dies.get(index)
    }

    pub fn root(&self) -> Option<&Die> {
        self.dies.first().filter(|die| !die.is_null())
    }

    pub fn line_table(&self) -> Option<&LineTable> {
        self.line_table.as_ref()
    }

    /// Index of the DIE starting at `offset` bytes into the unit's DIE data.
    pub fn die_index_at(&self, offset: usize) -> Option<usize> {
        self.die_offsets.get(&offset).copied()
    }

    /// Index of the DIE a unit-relative reference (`DW_FORM_ref*`) points at.
    pub fn die_index_at_unit_offset(&self, unit_offset: usize) -> Option<usize> {
        unit_offset
            .checked_sub(CU_HEADER_SIZE)
            .and_then(|offset| self.die_index_at(offset))
    }

    /// Index of the DIE at a `.debug_info` offset, if it lies in this unit.
    pub fn die_index_at_section_offset(&self, section_offset: usize) -> Option<usize> {
        if !self.header.contains(section_offset) {
            return None;
        }
        self.die_index_at_unit_offset(section_offset - self.header.offset)
    }

    /// Offset of `die` within `.debug_info`.
    pub fn die_section_offset(&self, die: &Die) -> usize {
        self.header.data_range().start + die.offset
    }

    /// The enclosing DIEs of `index`, innermost first.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = &Die> + '_ {
        let mut next = self.dies.get(index).and_then(|die| die.parent);
        std::iter::from_fn(move || {
            let die = self.dies.get(next?)?;
            next = die.parent;
            Some(die)
        })
    }

    /// Base address for range lists: the unit's `DW_AT_low_pc`, or 0.
    pub fn base_address(&self) -> u64 {
        self.root()
            .and_then(|root| root.value(DW_AT_LOW_PC))
            .and_then(AttrValue::as_address)
            .unwrap_or(0)
    }
}
