//! Synthetic ELF64 objects carrying hand-assembled DWARF 4.

#![allow(dead_code)]

use std::io::Write;

use anyhow::Result;
use dwarfline::dwarf::constants::*;
use tempfile::NamedTempFile;

pub fn uleb(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn sleb(mut value: i64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0) {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn cstr(text: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

/// Abbreviation codes used by [`sample_sections`].
pub mod code {
    pub const COMPILE_UNIT: u64 = 1;
    pub const NAMESPACE: u64 = 2;
    pub const CLASS: u64 = 3;
    pub const DECLARATION: u64 = 4;
    pub const DEFINITION: u64 = 5;
    pub const FUNCTION: u64 = 6;
}

pub fn abbrev_table() -> Vec<u8> {
    let entries: [(u64, DwTag, bool, &[(DwAt, DwForm)]); 6] = [
        (
            code::COMPILE_UNIT,
            DW_TAG_COMPILE_UNIT,
            true,
            &[
                (DW_AT_NAME, DW_FORM_STRP),
                (DW_AT_COMP_DIR, DW_FORM_STRING),
                (DW_AT_STMT_LIST, DW_FORM_SEC_OFFSET),
                (DW_AT_LOW_PC, DW_FORM_ADDR),
            ],
        ),
        (code::NAMESPACE, DW_TAG_NAMESPACE, true, &[(DW_AT_NAME, DW_FORM_STRING)]),
        (code::CLASS, DW_TAG_CLASS_TYPE, true, &[(DW_AT_NAME, DW_FORM_STRING)]),
        (code::DECLARATION, DW_TAG_SUBPROGRAM, false, &[(DW_AT_NAME, DW_FORM_STRING)]),
        (
            code::DEFINITION,
            DW_TAG_SUBPROGRAM,
            false,
            &[
                (DW_AT_SPECIFICATION, DW_FORM_REF4),
                (DW_AT_LOW_PC, DW_FORM_ADDR),
                (DW_AT_HIGH_PC, DW_FORM_DATA4),
            ],
        ),
        (
            code::FUNCTION,
            DW_TAG_SUBPROGRAM,
            false,
            &[
                (DW_AT_NAME, DW_FORM_STRP),
                (DW_AT_LOW_PC, DW_FORM_ADDR),
                (DW_AT_HIGH_PC, DW_FORM_DATA4),
            ],
        ),
    ];

    let mut out = Vec::new();
    for (code, tag, children, attrs) in entries {
        uleb(code, &mut out);
        uleb(tag.0, &mut out);
        out.push(if children { DW_CHILDREN_YES } else { DW_CHILDREN_NO });
        for &(name, form) in attrs {
            uleb(name.0, &mut out);
            uleb(form.0, &mut out);
        }
        out.extend([0, 0]);
    }
    out.push(0);
    out
}

/// Wraps a DIE body in a version 4 unit header with 8-byte addresses.
pub fn unit(body: &[u8]) -> Vec<u8> {
    let mut out = ((7 + body.len()) as u32).to_le_bytes().to_vec();
    out.extend(4u16.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    out.push(8);
    out.extend_from_slice(body);
    out
}

const UNIT_HEADER_SIZE: usize = 11;

/// A version 4 line program with the usual opcode_base 13 layout.
pub fn line_program(dirs: &[&str], files: &[(&str, u64)], program: &[u8]) -> Vec<u8> {
    let mut header = vec![1, 1, 1, (-5i8) as u8, 14, 13];
    header.extend([0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
    for dir in dirs {
        cstr(dir, &mut header);
    }
    header.push(0);
    for &(name, dir) in files {
        cstr(name, &mut header);
        uleb(dir, &mut header);
        header.extend([0, 0]);
    }
    header.push(0);

    let mut out = ((2 + 4 + header.len() + program.len()) as u32)
        .to_le_bytes()
        .to_vec();
    out.extend(4u16.to_le_bytes());
    out.extend((header.len() as u32).to_le_bytes());
    out.extend(header);
    out.extend_from_slice(program);
    out
}

/// Line-program opcodes.
#[derive(Default)]
pub struct Ops(pub Vec<u8>);

impl Ops {
    pub fn set_address(mut self, address: u64) -> Self {
        self.0.extend([0, 9, DW_LNE_SET_ADDRESS]);
        self.0.extend(address.to_le_bytes());
        self
    }

    pub fn advance_line(mut self, delta: i64) -> Self {
        self.0.push(DW_LNS_ADVANCE_LINE);
        sleb(delta, &mut self.0);
        self
    }

    pub fn advance_pc(mut self, delta: u64) -> Self {
        self.0.push(DW_LNS_ADVANCE_PC);
        uleb(delta, &mut self.0);
        self
    }

    pub fn set_file(mut self, file: u64) -> Self {
        self.0.push(DW_LNS_SET_FILE);
        uleb(file, &mut self.0);
        self
    }

    pub fn copy(mut self) -> Self {
        self.0.push(DW_LNS_COPY);
        self
    }

    pub fn end_sequence(mut self) -> Self {
        self.0.extend([0, 1, DW_LNE_END_SEQUENCE]);
        self
    }
}

/// One `.debug_aranges` set for 8-byte addresses.
pub fn aranges_set(info_offset: u32, ranges: &[(u64, u64)]) -> Vec<u8> {
    let mut body = 2u16.to_le_bytes().to_vec();
    body.extend(info_offset.to_le_bytes());
    body.extend([8, 0]);
    body.extend([0u8; 4]);
    for &(address, length) in ranges.iter().chain(std::iter::once(&(0, 0))) {
        body.extend(address.to_le_bytes());
        body.extend(length.to_le_bytes());
    }
    let mut out = (body.len() as u32).to_le_bytes().to_vec();
    out.extend(body);
    out
}

/// Debug sections of a small program with two compilation units:
///
/// - `main.c` at [0x1000, 0x1100): `main` (0x1000..0x1040) and
///   `outer::inner::method` (0x1040..0x1100 via `DW_AT_specification`).
/// - `util/helper.c` at [0x5000, 0x5100): `helper` (0x5000..0x5080).
pub fn sample_sections() -> Vec<(&'static str, Vec<u8>)> {
    let mut debug_str = Vec::new();
    let main_c = debug_str.len() as u32;
    cstr("main.c", &mut debug_str);
    let helper_c = debug_str.len() as u32;
    cstr("helper.c", &mut debug_str);
    let main_fn = debug_str.len() as u32;
    cstr("main", &mut debug_str);
    let helper_fn = debug_str.len() as u32;
    cstr("helper", &mut debug_str);

    // main.c: lines 3, 4 for main; 10, 12 for the method.
    let first_lines = Ops::default()
        .set_address(0x1000)
        .advance_line(2)
        .copy()
        .advance_pc(0x10)
        .advance_line(1)
        .copy()
        .advance_pc(0x30)
        .advance_line(6)
        .copy()
        .advance_pc(0x40)
        .advance_line(2)
        .copy()
        .advance_pc(0x80)
        .end_sequence();
    let mut debug_line = line_program(&[], &[("main.c", 0)], &first_lines.0);
    let second_line_offset = debug_line.len() as u32;
    let second_lines = Ops::default()
        .set_address(0x5000)
        .advance_line(19)
        .copy()
        .advance_pc(0x100)
        .end_sequence();
    debug_line.extend(line_program(
        &["util"],
        &[("helper.c", 1)],
        &second_lines.0,
    ));

    let mut body = Vec::new();
    uleb(code::COMPILE_UNIT, &mut body);
    body.extend(main_c.to_le_bytes());
    cstr("/build", &mut body);
    body.extend(0u32.to_le_bytes());
    body.extend(0x1000u64.to_le_bytes());

    uleb(code::FUNCTION, &mut body);
    body.extend(main_fn.to_le_bytes());
    body.extend(0x1000u64.to_le_bytes());
    body.extend(0x40u32.to_le_bytes());

    uleb(code::NAMESPACE, &mut body);
    cstr("outer", &mut body);
    uleb(code::CLASS, &mut body);
    cstr("inner", &mut body);
    let declaration = UNIT_HEADER_SIZE + body.len();
    uleb(code::DECLARATION, &mut body);
    cstr("method", &mut body);
    body.push(0);
    body.push(0);

    uleb(code::DEFINITION, &mut body);
    body.extend((declaration as u32).to_le_bytes());
    body.extend(0x1040u64.to_le_bytes());
    body.extend(0xc0u32.to_le_bytes());
    body.push(0);
    let mut debug_info = unit(&body);

    let second_unit = debug_info.len() as u32;
    let mut body = Vec::new();
    uleb(code::COMPILE_UNIT, &mut body);
    body.extend(helper_c.to_le_bytes());
    cstr("/build", &mut body);
    body.extend(second_line_offset.to_le_bytes());
    body.extend(0x5000u64.to_le_bytes());
    uleb(code::FUNCTION, &mut body);
    body.extend(helper_fn.to_le_bytes());
    body.extend(0x5000u64.to_le_bytes());
    body.extend(0x80u32.to_le_bytes());
    body.push(0);
    debug_info.extend(unit(&body));

    let mut debug_aranges = aranges_set(0, &[(0x1000, 0x100)]);
    debug_aranges.extend(aranges_set(second_unit, &[(0x5000, 0x100)]));

    vec![
        (".text", vec![0x90; 16]),
        (".debug_info", debug_info),
        (".debug_abbrev", abbrev_table()),
        (".debug_aranges", debug_aranges),
        (".debug_line", debug_line),
        (".debug_str", debug_str),
        (".debug_ranges", Vec::new()),
    ]
}

const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;
const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;

/// Lays out an ELF64 little-endian relocatable-style file:
/// header, section contents, `.shstrtab`, section header table.
#[derive(Default)]
pub struct ElfWriter {
    sections: Vec<(String, Vec<u8>)>,
    /// Store the section count in the first section header.
    pub extended_numbering: bool,
    /// Write an ELFCLASS32 identifier.
    pub class32: bool,
}

impl ElfWriter {
    pub fn new(sections: &[(&str, Vec<u8>)]) -> Self {
        Self {
            sections: sections
                .iter()
                .map(|(name, data)| (name.to_string(), data.clone()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut shstrtab = vec![0u8];
        let mut names = Vec::new();
        for (name, _) in &self.sections {
            names.push(shstrtab.len() as u32);
            cstr(name, &mut shstrtab);
        }
        let shstrtab_name = shstrtab.len() as u32;
        cstr(".shstrtab", &mut shstrtab);

        let mut body = Vec::new();
        let mut offsets = Vec::new();
        for (_, data) in &self.sections {
            offsets.push(EHDR_SIZE + body.len());
            body.extend_from_slice(data);
        }
        let shstrtab_offset = EHDR_SIZE + body.len();
        body.extend_from_slice(&shstrtab);
        while body.len() % 8 != 0 {
            body.push(0);
        }
        let shoff = EHDR_SIZE + body.len();
        let count = self.sections.len() + 2;
        let shstrndx = count - 1;

        let mut out = Vec::with_capacity(shoff + count * SHDR_SIZE);
        out.extend(b"\x7fELF");
        out.push(if self.class32 { 1 } else { 2 });
        out.extend([1, 1, 0]);
        out.extend([0u8; 8]);
        out.extend(1u16.to_le_bytes()); // ET_REL
        out.extend(0x3eu16.to_le_bytes()); // EM_X86_64
        out.extend(1u32.to_le_bytes());
        out.extend(0u64.to_le_bytes()); // e_entry
        out.extend(0u64.to_le_bytes()); // e_phoff
        out.extend((shoff as u64).to_le_bytes());
        out.extend(0u32.to_le_bytes()); // e_flags
        out.extend((EHDR_SIZE as u16).to_le_bytes());
        out.extend(0u16.to_le_bytes()); // e_phentsize
        out.extend(0u16.to_le_bytes()); // e_phnum
        out.extend((SHDR_SIZE as u16).to_le_bytes());
        let shnum = if self.extended_numbering { 0 } else { count as u16 };
        out.extend(shnum.to_le_bytes());
        out.extend((shstrndx as u16).to_le_bytes());
        assert_eq!(out.len(), EHDR_SIZE);
        out.extend(body);

        let null_size = if self.extended_numbering { count as u64 } else { 0 };
        section_header(&mut out, 0, 0, 0, 0, null_size);
        for (i, (_, data)) in self.sections.iter().enumerate() {
            section_header(
                &mut out,
                names[i],
                SHT_PROGBITS,
                0,
                offsets[i] as u64,
                data.len() as u64,
            );
        }
        section_header(
            &mut out,
            shstrtab_name,
            SHT_STRTAB,
            0,
            shstrtab_offset as u64,
            shstrtab.len() as u64,
        );
        out
    }

    pub fn write(&self) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&self.finish())?;
        file.flush()?;
        Ok(file)
    }
}

fn section_header(out: &mut Vec<u8>, name: u32, kind: u32, addr: u64, offset: u64, size: u64) {
    out.extend(name.to_le_bytes());
    out.extend(kind.to_le_bytes());
    out.extend(0u64.to_le_bytes()); // sh_flags
    out.extend(addr.to_le_bytes());
    out.extend(offset.to_le_bytes());
    out.extend(size.to_le_bytes());
    out.extend(0u32.to_le_bytes()); // sh_link
    out.extend(0u32.to_le_bytes()); // sh_info
    out.extend(1u64.to_le_bytes()); // sh_addralign
    out.extend(0u64.to_le_bytes()); // sh_entsize
}

/// Writes the sample program to a temporary ELF file.
pub fn sample_binary() -> Result<NamedTempFile> {
    ElfWriter::new(&sample_sections()).write()
}
