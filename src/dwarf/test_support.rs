//! Byte-level builders for DWARF fixtures used by the unit tests.

use std::collections::HashMap;

use crate::dwarf::constants::*;
use crate::dwarf::unit::CU_HEADER_SIZE;

pub fn uleb(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn sleb(mut value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0) {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn push_address(out: &mut Vec<u8>, value: u64, size: u8) {
    out.extend_from_slice(&value.to_le_bytes()[..size as usize]);
}

#[derive(Default)]
pub struct AbbrevBuilder {
    data: Vec<u8>,
}

impl AbbrevBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, code: u64, tag: DwTag, children: bool, attrs: &[(DwAt, DwForm)]) -> Self {
        self.data.extend(uleb(code));
        self.data.extend(uleb(tag.0));
        self.data
            .push(if children { DW_CHILDREN_YES } else { DW_CHILDREN_NO });
        for (name, form) in attrs {
            self.data.extend(uleb(name.0));
            self.data.extend(uleb(form.0));
        }
        self.data.extend([0, 0]);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data.push(0);
        self.data
    }
}

/// Assembles one compilation unit of `.debug_info`.
pub struct UnitBuilder {
    pub version: u16,
    pub abbrev_offset: u32,
    pub address_size: u8,
    body: Vec<u8>,
}

impl UnitBuilder {
    pub fn new(address_size: u8) -> Self {
        Self {
            version: 4,
            abbrev_offset: 0,
            address_size,
            body: Vec::new(),
        }
    }

    /// Unit-relative offset (from the start of the header) of the next byte.
    pub fn offset(&self) -> usize {
        CU_HEADER_SIZE + self.body.len()
    }

    pub fn code(&mut self, code: u64) -> &mut Self {
        self.body.extend(uleb(code));
        self
    }

    pub fn null(&mut self) -> &mut Self {
        self.body.push(0);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.body.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.body.extend(value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.body.extend(value.to_le_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.body.extend(value.to_le_bytes());
        self
    }

    pub fn addr(&mut self, value: u64) -> &mut Self {
        push_address(&mut self.body, value, self.address_size);
        self
    }

    pub fn uleb(&mut self, value: u64) -> &mut Self {
        self.body.extend(uleb(value));
        self
    }

    pub fn sleb(&mut self, value: i64) -> &mut Self {
        self.body.extend(sleb(value));
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.body.extend(value.as_bytes());
        self.body.push(0);
        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.body.extend_from_slice(value);
        self
    }

    /// Overwrites four bytes at a unit-relative offset, for forward references.
    pub fn patch_u32(&mut self, unit_offset: usize, value: u32) -> &mut Self {
        let at = unit_offset - CU_HEADER_SIZE;
        self.body[at..at + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let unit_length = (CU_HEADER_SIZE - 4 + self.body.len()) as u32;
        let mut out = Vec::with_capacity(CU_HEADER_SIZE + self.body.len());
        out.extend(unit_length.to_le_bytes());
        out.extend(self.version.to_le_bytes());
        out.extend(self.abbrev_offset.to_le_bytes());
        out.push(self.address_size);
        out.extend_from_slice(&self.body);
        out
    }
}

const STANDARD_OPCODE_LENGTHS: [u8; 12] = [0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1];

/// Assembles one line-number program (header and opcodes).
pub struct LineProgramBuilder {
    pub version: u16,
    pub minimum_instruction_length: u8,
    pub maximum_operations_per_instruction: u8,
    pub default_is_stmt: bool,
    pub line_base: i8,
    pub line_range: u8,
    pub opcode_base: u8,
    pub address_size: u8,
    dirs: Vec<String>,
    files: Vec<(String, u64)>,
    program: Vec<u8>,
}

impl LineProgramBuilder {
    pub fn new() -> Self {
        Self {
            version: 4,
            minimum_instruction_length: 1,
            maximum_operations_per_instruction: 1,
            default_is_stmt: true,
            line_base: -5,
            line_range: 14,
            opcode_base: 13,
            address_size: 8,
            dirs: Vec::new(),
            files: Vec::new(),
            program: Vec::new(),
        }
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.dirs.push(dir.to_string());
        self
    }

    pub fn file(mut self, name: &str, dir_index: u64) -> Self {
        self.files.push((name.to_string(), dir_index));
        self
    }

    fn extended(&mut self, opcode: u8, payload: &[u8]) -> &mut Self {
        self.program.push(0);
        self.program.extend(uleb(payload.len() as u64 + 1));
        self.program.push(opcode);
        self.program.extend_from_slice(payload);
        self
    }

    pub fn set_address(&mut self, address: u64) -> &mut Self {
        let mut payload = Vec::new();
        push_address(&mut payload, address, self.address_size);
        self.extended(DW_LNE_SET_ADDRESS, &payload)
    }

    pub fn end_sequence(&mut self) -> &mut Self {
        self.extended(DW_LNE_END_SEQUENCE, &[])
    }

    pub fn define_file(&mut self, name: &str, dir_index: u64) -> &mut Self {
        let mut payload = name.as_bytes().to_vec();
        payload.push(0);
        payload.extend(uleb(dir_index));
        payload.extend([0, 0]);
        self.extended(DW_LNE_DEFINE_FILE, &payload)
    }

    pub fn set_discriminator(&mut self, value: u64) -> &mut Self {
        self.extended(DW_LNE_SET_DISCRIMINATOR, &uleb(value))
    }

    pub fn copy(&mut self) -> &mut Self {
        self.program.push(DW_LNS_COPY);
        self
    }

    pub fn advance_pc(&mut self, amount: u64) -> &mut Self {
        self.program.push(DW_LNS_ADVANCE_PC);
        self.program.extend(uleb(amount));
        self
    }

    pub fn advance_line(&mut self, amount: i64) -> &mut Self {
        self.program.push(DW_LNS_ADVANCE_LINE);
        self.program.extend(sleb(amount));
        self
    }

    pub fn set_file(&mut self, file: u64) -> &mut Self {
        self.program.push(DW_LNS_SET_FILE);
        self.program.extend(uleb(file));
        self
    }

    pub fn negate_stmt(&mut self) -> &mut Self {
        self.program.push(DW_LNS_NEGATE_STMT);
        self
    }

    pub fn const_add_pc(&mut self) -> &mut Self {
        self.program.push(DW_LNS_CONST_ADD_PC);
        self
    }

    pub fn fixed_advance_pc(&mut self, amount: u16) -> &mut Self {
        self.program.push(DW_LNS_FIXED_ADVANCE_PC);
        self.program.extend(amount.to_le_bytes());
        self
    }

    pub fn special(&mut self, opcode: u8) -> &mut Self {
        self.program.push(opcode);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.program.extend_from_slice(bytes);
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut header = Vec::new();
        header.push(self.minimum_instruction_length);
        if self.version >= 4 {
            header.push(self.maximum_operations_per_instruction);
        }
        header.push(u8::from(self.default_is_stmt));
        header.push(self.line_base as u8);
        header.push(self.line_range);
        header.push(self.opcode_base);
        for i in 0..self.opcode_base.saturating_sub(1) as usize {
            header.push(STANDARD_OPCODE_LENGTHS.get(i).copied().unwrap_or(1));
        }
        for dir in &self.dirs {
            header.extend(dir.as_bytes());
            header.push(0);
        }
        header.push(0);
        for (name, dir) in &self.files {
            header.extend(name.as_bytes());
            header.push(0);
            header.extend(uleb(*dir));
            header.extend([0, 0]);
        }
        header.push(0);

        let unit_length = (2 + 4 + header.len() + self.program.len()) as u32;
        let mut out = Vec::new();
        out.extend(unit_length.to_le_bytes());
        out.extend(self.version.to_le_bytes());
        out.extend((header.len() as u32).to_le_bytes());
        out.extend(header);
        out.extend_from_slice(&self.program);
        out
    }
}

/// One `.debug_aranges` range-set without segment selectors.
pub fn aranges_set(debug_info_offset: u32, address_size: u8, ranges: &[(u64, u64)]) -> Vec<u8> {
    let tuple = 2 * address_size as usize;
    let mut body = Vec::new();
    body.extend(2u16.to_le_bytes());
    body.extend(debug_info_offset.to_le_bytes());
    body.push(address_size);
    body.push(0);
    let padding = (tuple - 12 % tuple) % tuple;
    body.extend(std::iter::repeat(0).take(padding));
    for &(address, length) in ranges.iter().chain(std::iter::once(&(0, 0))) {
        push_address(&mut body, address, address_size);
        push_address(&mut body, length, address_size);
    }
    let mut out = (body.len() as u32).to_le_bytes().to_vec();
    out.extend(body);
    out
}

/// A `.debug_ranges` list; `(u64::MAX, base)` entries select a new base address.
pub fn range_list(address_size: u8, entries: &[(u64, u64)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(begin, end) in entries.iter().chain(std::iter::once(&(0, 0))) {
        push_address(&mut out, begin, address_size);
        push_address(&mut out, end, address_size);
    }
    out
}

#[derive(Default)]
pub struct Sections {
    pub info: Vec<u8>,
    pub abbrev: Vec<u8>,
    pub aranges: Vec<u8>,
    pub line: Vec<u8>,
    pub str: Vec<u8>,
    pub ranges: Vec<u8>,
}

impl Sections {
    pub fn into_map(self) -> HashMap<String, Vec<u8>> {
        HashMap::from([
            (".debug_info".to_string(), self.info),
            (".debug_abbrev".to_string(), self.abbrev),
            (".debug_aranges".to_string(), self.aranges),
            (".debug_line".to_string(), self.line),
            (".debug_str".to_string(), self.str),
            (".debug_ranges".to_string(), self.ranges),
        ])
    }
}
