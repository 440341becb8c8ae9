use crate::error::{DwarfError, Result};

/// Longest LEB128 encoding accepted. 18 groups hold 126 bits, comfortably more
/// than any padded encoding of a 64-bit value.
const MAX_LEB128_BYTES: usize = 18;

/// Why a free-standing LEB128 decode failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LebError {
    /// The input ended before a byte without the continuation bit.
    Truncated,
    /// The decoded value does not fit in 64 bits.
    Overflow,
}

/// Decodes an unsigned LEB128 value, returning it with the number of bytes consumed.
pub fn read_uleb128(bytes: &[u8]) -> std::result::Result<(u64, usize), LebError> {
    let mut result = 0u128;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == MAX_LEB128_BYTES {
            return Err(LebError::Overflow);
        }
        result |= u128::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            let value = u64::try_from(result).map_err(|_| LebError::Overflow)?;
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(LebError::Truncated)
}

/// Decodes a signed LEB128 value, sign-extending from the last group.
pub fn read_sleb128(bytes: &[u8]) -> std::result::Result<(i64, usize), LebError> {
    let mut result = 0i128;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == MAX_LEB128_BYTES {
            return Err(LebError::Overflow);
        }
        result |= i128::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if byte & 0x40 != 0 {
                result |= !0i128 << shift;
            }
            let value = i64::try_from(result).map_err(|_| LebError::Overflow)?;
            return Ok((value, i + 1));
        }
    }
    Err(LebError::Truncated)
}

/// Bounds-checked little-endian reader over one DWARF section.
///
/// `base` is the section offset of `data[0]`, so every error reports an
/// absolute position inside `section`.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    section: &'static str,
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], section: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            section,
            base: 0,
        }
    }

    /// Starts reading `section_data` at `offset`.
    pub fn at(section_data: &'a [u8], section: &'static str, offset: usize) -> Result<Self> {
        if offset > section_data.len() {
            return Err(DwarfError::OffsetOutOfBounds {
                section,
                offset: offset as u64,
            });
        }
        Ok(Self {
            data: &section_data[offset..],
            pos: 0,
            section,
            base: offset,
        })
    }

    pub fn section(&self) -> &'static str {
        self.section
    }

    /// Absolute offset of the cursor within the section.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Offset of the cursor relative to where this reader started.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_finished(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn eof(&self) -> DwarfError {
        DwarfError::UnexpectedEof {
            section: self.section,
            offset: self.offset(),
        }
    }

    pub fn overflow(&self) -> DwarfError {
        DwarfError::IntegerOverflow {
            section: self.section,
            offset: self.offset(),
        }
    }

    pub fn advance(&mut self, amount: usize) -> Result<()> {
        if amount > self.remaining_len() {
            return Err(self.eof());
        }
        self.pos += amount;
        Ok(())
    }

    /// Splits off the next `len` bytes as their own reader and skips past them.
    pub fn split(&mut self, len: usize) -> Result<Reader<'a>> {
        if len > self.remaining_len() {
            return Err(self.eof());
        }
        let sub = Reader {
            data: &self.data[self.pos..self.pos + len],
            pos: 0,
            section: self.section,
            base: self.offset(),
        };
        self.pos += len;
        Ok(sub)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining_len() {
            return Err(self.eof());
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads an unsigned integer of `size` bytes (1, 2, 4 or 8).
    pub fn read_address(&mut self, size: u8) -> Result<u64> {
        match size {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            _ => Err(DwarfError::UnsupportedAddressSize {
                section: self.section,
                offset: self.offset(),
                size,
            }),
        }
    }

    pub fn read_uleb128(&mut self) -> Result<u64> {
        match read_uleb128(self.remaining()) {
            Ok((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            Err(LebError::Truncated) => Err(self.eof()),
            Err(LebError::Overflow) => Err(self.overflow()),
        }
    }

    pub fn read_sleb128(&mut self) -> Result<i64> {
        match read_sleb128(self.remaining()) {
            Ok((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            Err(LebError::Truncated) => Err(self.eof()),
            Err(LebError::Overflow) => Err(self.overflow()),
        }
    }

    /// ULEB128 used as a length or offset into memory.
    pub fn read_uleb128_usize(&mut self) -> Result<usize> {
        let at = *self;
        let value = self.read_uleb128()?;
        usize::try_from(value).map_err(|_| at.overflow())
    }

    /// Reads a NUL-terminated string, not including the terminator.
    pub fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DwarfError::UnterminatedString {
                section: self.section,
                offset: self.offset(),
            })?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    pub fn read_string(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_cstr()?).into_owned())
    }
}

/// Rejects address sizes other than 1, 2, 4 and 8 bytes.
pub fn check_address_size(size: u8, section: &'static str, offset: usize) -> Result<()> {
    match size {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(DwarfError::UnsupportedAddressSize {
            section,
            offset,
            size,
        }),
    }
}

/// Converts a decoded 64-bit offset into `usize`, reporting overflow at `offset`.
pub fn to_usize(value: u64, section: &'static str, offset: usize) -> Result<usize> {
    usize::try_from(value).map_err(|_| DwarfError::IntegerOverflow { section, offset })
}
