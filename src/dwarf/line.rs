use std::path::{Path, PathBuf};

use log::trace;

use crate::dwarf::constants::*;
use crate::dwarf::reader::Reader;
use crate::dwarf::unit::DWARF64_ESCAPE;
use crate::error::{DwarfError, Result};

const SECTION: &str = ".debug_line";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub dir_index: u64,
    pub mtime: u64,
    pub length: u64,
}

#[derive(Clone, Debug)]
pub struct LineProgramHeader {
    pub offset: usize,
    pub unit_length: u32,
    pub version: u16,
    pub header_length: u32,
    pub minimum_instruction_length: u8,
    pub maximum_operations_per_instruction: u8,
    pub default_is_stmt: bool,
    pub line_base: i8,
    pub line_range: u8,
    pub opcode_base: u8,
    /// Operand counts of standard opcodes 1..opcode_base.
    pub standard_opcode_lengths: Vec<u8>,
    pub include_directories: Vec<String>,
    pub file_names: Vec<FileEntry>,
}

fn read_file_entry(cur: &mut Reader<'_>, name: String) -> Result<FileEntry> {
    Ok(FileEntry {
        name,
        dir_index: cur.read_uleb128()?,
        mtime: cur.read_uleb128()?,
        length: cur.read_uleb128()?,
    })
}

fn invalid(offset: usize, reason: impl Into<String>) -> DwarfError {
    DwarfError::InvalidLineProgram {
        offset,
        reason: reason.into(),
    }
}

impl LineProgramHeader {
    /// Parses the header at `offset`, returning it with a reader positioned
    /// over exactly the opcode stream.
    fn parse<'a>(debug_line: &'a [u8], offset: usize) -> Result<(Self, Reader<'a>)> {
        let mut cur = Reader::at(debug_line, SECTION, offset)?;
        let unit_length = cur.read_u32()?;
        if unit_length >= DWARF64_ESCAPE {
            return Err(DwarfError::UnsupportedFormat {
                section: SECTION,
                offset,
            });
        }
        let mut unit = cur.split(unit_length as usize)?;

        let version = unit.read_u16()?;
        if !(2..=4).contains(&version) {
            return Err(DwarfError::UnsupportedVersion {
                section: SECTION,
                offset,
                version,
            });
        }
        let header_length = unit.read_u32()?;
        let mut fields = unit.split(header_length as usize)?;
        let program = unit;

        let minimum_instruction_length = fields.read_u8()?;
        let maximum_operations_per_instruction = if version >= 4 {
            fields.read_u8()?
        } else {
            1
        };
        let default_is_stmt = fields.read_u8()? != 0;
        let line_base = fields.read_i8()?;
        let line_range = fields.read_u8()?;
        let opcode_base = fields.read_u8()?;

        if line_range == 0 {
            return Err(invalid(offset, "line_range is zero"));
        }
        if opcode_base == 0 {
            return Err(invalid(offset, "opcode_base is zero"));
        }
        if maximum_operations_per_instruction == 0 {
            return Err(invalid(offset, "maximum_operations_per_instruction is zero"));
        }

        let standard_opcode_lengths = fields.read_bytes(opcode_base as usize - 1)?.to_vec();

        let mut include_directories = Vec::new();
        loop {
            let dir = fields.read_cstr()?;
            if dir.is_empty() {
                break;
            }
            include_directories.push(String::from_utf8_lossy(dir).into_owned());
        }

        let mut file_names = Vec::new();
        loop {
            let name = fields.read_cstr()?;
            if name.is_empty() {
                break;
            }
            let name = String::from_utf8_lossy(name).into_owned();
            file_names.push(read_file_entry(&mut fields, name)?);
        }

        let header = Self {
            offset,
            unit_length,
            version,
            header_length,
            minimum_instruction_length,
            maximum_operations_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
            include_directories,
            file_names,
        };
        Ok((header, program))
    }

    /// Directory-joined path of a 1-based file index.
    fn file_path(&self, index: u64) -> Option<PathBuf> {
        let entry = self.file_names.get(usize::try_from(index).ok()?.checked_sub(1)?)?;
        let name = Path::new(&entry.name);
        if name.is_absolute() || entry.dir_index == 0 {
            return Some(name.to_path_buf());
        }
        let dir = self
            .include_directories
            .get(usize::try_from(entry.dir_index - 1).ok()?)?;
        Some(Path::new(dir).join(name))
    }
}

/// Registers of the line-number state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRegisters {
    pub address: u64,
    pub op_index: u64,
    pub file: u64,
    pub line: u64,
    pub column: u64,
    pub is_stmt: bool,
    pub basic_block: bool,
    pub end_sequence: bool,
    pub prologue_end: bool,
    pub epilogue_begin: bool,
    pub isa: u64,
    pub discriminator: u64,
}

impl LineRegisters {
    fn new(default_is_stmt: bool) -> Self {
        Self {
            address: 0,
            op_index: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
            prologue_end: false,
            epilogue_begin: false,
            isa: 0,
            discriminator: 0,
        }
    }

    fn reset(&mut self, default_is_stmt: bool) {
        *self = Self::new(default_is_stmt);
    }

    fn clear_row_flags(&mut self) {
        self.basic_block = false;
        self.prologue_end = false;
        self.epilogue_begin = false;
        self.discriminator = 0;
    }
}

/// Runs one line-number program, collecting a copy of the registers at every
/// emitted row.
struct LineProgram<'h, 'a> {
    header: &'h mut LineProgramHeader,
    cursor: Reader<'a>,
    address_size: u8,
    registers: LineRegisters,
    rows: Vec<LineRegisters>,
}

impl<'h, 'a> LineProgram<'h, 'a> {
    fn run(mut self) -> Result<Vec<LineRegisters>> {
        let opcode_base = self.header.opcode_base;
        while !self.cursor.is_finished() {
            let opcode = self.cursor.read_u8()?;
            if opcode >= opcode_base {
                self.execute_special_opcode(opcode);
            } else if opcode == 0 {
                self.execute_extended_opcode()?;
            } else {
                self.execute_standard_opcode(opcode)?;
            }
        }
        Ok(self.rows)
    }

    fn emit(&mut self) {
        self.rows.push(self.registers);
    }

    /// Advances by `operation_advance` operations, tracking `op_index` for VLIW.
    fn advance(&mut self, operation_advance: u64) {
        let min_len = u64::from(self.header.minimum_instruction_length);
        let max_ops = u64::from(self.header.maximum_operations_per_instruction);
        if max_ops == 1 {
            self.registers.address = self
                .registers
                .address
                .wrapping_add(min_len.wrapping_mul(operation_advance));
        } else {
            let ops = self.registers.op_index.wrapping_add(operation_advance);
            self.registers.address = self
                .registers
                .address
                .wrapping_add(min_len.wrapping_mul(ops / max_ops));
            self.registers.op_index = ops % max_ops;
        }
    }

    fn execute_special_opcode(&mut self, opcode: u8) {
        let adjusted = opcode - self.header.opcode_base;
        let line_range = self.header.line_range;
        self.advance(u64::from(adjusted / line_range));
        let line_delta = i64::from(self.header.line_base) + i64::from(adjusted % line_range);
        self.registers.line = self.registers.line.wrapping_add_signed(line_delta);
        self.emit();
        self.registers.clear_row_flags();
    }

    fn execute_standard_opcode(&mut self, opcode: u8) -> Result<()> {
        match opcode {
            DW_LNS_COPY => {
                self.emit();
                self.registers.clear_row_flags();
            }
            DW_LNS_ADVANCE_PC => {
                let advance = self.cursor.read_uleb128()?;
                self.advance(advance);
            }
            DW_LNS_ADVANCE_LINE => {
                let delta = self.cursor.read_sleb128()?;
                self.registers.line = self.registers.line.wrapping_add_signed(delta);
            }
            DW_LNS_SET_FILE => self.registers.file = self.cursor.read_uleb128()?,
            DW_LNS_SET_COLUMN => self.registers.column = self.cursor.read_uleb128()?,
            DW_LNS_NEGATE_STMT => self.registers.is_stmt = !self.registers.is_stmt,
            DW_LNS_SET_BASIC_BLOCK => self.registers.basic_block = true,
            DW_LNS_CONST_ADD_PC => {
                let adjusted = 255 - self.header.opcode_base;
                self.advance(u64::from(adjusted / self.header.line_range));
            }
            DW_LNS_FIXED_ADVANCE_PC => {
                let advance = self.cursor.read_u16()?;
                self.registers.address = self.registers.address.wrapping_add(u64::from(advance));
                self.registers.op_index = 0;
            }
            DW_LNS_SET_PROLOGUE_END => self.registers.prologue_end = true,
            DW_LNS_SET_EPILOGUE_BEGIN => self.registers.epilogue_begin = true,
            DW_LNS_SET_ISA => self.registers.isa = self.cursor.read_uleb128()?,
            _ => {
                let operands = self.header.standard_opcode_lengths[opcode as usize - 1];
                trace!("skipping standard opcode {opcode:#x} with {operands} operands");
                for _ in 0..operands {
                    self.cursor.read_uleb128()?;
                }
            }
        }
        Ok(())
    }

    fn execute_extended_opcode(&mut self) -> Result<()> {
        let len = self.cursor.read_uleb128_usize()?;
        if len == 0 {
            return Ok(());
        }
        let mut operands = self.cursor.split(len)?;
        let opcode = operands.read_u8()?;
        match opcode {
            DW_LNE_END_SEQUENCE => {
                self.registers.end_sequence = true;
                self.emit();
                self.registers.reset(self.header.default_is_stmt);
            }
            DW_LNE_SET_ADDRESS => {
                self.registers.address = operands.read_address(self.address_size)?;
                self.registers.op_index = 0;
            }
            DW_LNE_DEFINE_FILE => {
                let name = operands.read_string()?;
                let entry = read_file_entry(&mut operands, name)?;
                self.header.file_names.push(entry);
            }
            DW_LNE_SET_DISCRIMINATOR => {
                self.registers.discriminator = operands.read_uleb128()?;
            }
            _ => trace!("skipping extended opcode {opcode:#x} ({len} bytes)"),
        }
        Ok(())
    }
}

/// One normalized row: an address and the source position it maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRow {
    pub address: u64,
    /// Index into [`LineTable::files`].
    pub file: usize,
    pub line: u64,
    pub column: u64,
    pub is_stmt: bool,
    pub end_sequence: bool,
}

/// The decoded line-number program of one compilation unit.
#[derive(Clone, Debug)]
pub struct LineTable {
    header: LineProgramHeader,
    files: Vec<PathBuf>,
    rows: Vec<LineRow>,
}

impl LineTable {
    pub fn parse(debug_line: &[u8], offset: usize, address_size: u8) -> Result<Self> {
        let (mut header, cursor) = LineProgramHeader::parse(debug_line, offset)?;
        let default_is_stmt = header.default_is_stmt;
        let registers = LineProgram {
            header: &mut header,
            cursor,
            address_size,
            registers: LineRegisters::new(default_is_stmt),
            rows: Vec::new(),
        }
        .run()?;
        Self::normalize(header, &registers)
    }

    /// Resolves each row's file index against the final file table.
    fn normalize(header: LineProgramHeader, registers: &[LineRegisters]) -> Result<Self> {
        let mut files = Vec::with_capacity(header.file_names.len());
        for index in 1..=header.file_names.len() as u64 {
            let path = header.file_path(index).ok_or_else(|| {
                invalid(
                    header.offset,
                    format!("file {index} names a missing include directory"),
                )
            })?;
            files.push(path);
        }

        let mut rows = Vec::with_capacity(registers.len());
        for reg in registers {
            let file = reg
                .file
                .checked_sub(1)
                .and_then(|index| usize::try_from(index).ok())
                .filter(|&index| index < files.len())
                .ok_or_else(|| {
                    invalid(
                        header.offset,
                        format!("row at {:#x} uses file index {}", reg.address, reg.file),
                    )
                })?;
            rows.push(LineRow {
                address: reg.address,
                file,
                line: reg.line,
                column: reg.column,
                is_stmt: reg.is_stmt,
                end_sequence: reg.end_sequence,
            });
        }

        Ok(Self {
            header,
            files,
            rows,
        })
    }

    pub fn header(&self) -> &LineProgramHeader {
        &self.header
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn rows(&self) -> &[LineRow] {
        &self.rows
    }

    pub fn file_path(&self, row: &LineRow) -> &Path {
        &self.files[row.file]
    }

    /// Finds the row covering `address`.
    ///
    /// A row covers its own address and everything up to the next row of its
    /// sequence. End-of-sequence rows only bound the previous row.
    pub fn find(&self, address: u64) -> Option<&LineRow> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.end_sequence {
                continue;
            }
            if row.address == address {
                return Some(row);
            }
            if let Some(next) = self.rows.get(i + 1) {
                if row.address <= address && address < next.address {
                    return Some(row);
                }
            }
        }
        None
    }
}
