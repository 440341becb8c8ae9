use std::path::PathBuf;

use thiserror::Error;

use crate::dwarf::constants::DwForm;

/// Everything that can go wrong while loading or decoding debug information.
///
/// Offsets are absolute within the named section so a failure can be located
/// with `readelf --debug-dump` or a hex editor.
#[derive(Error, Debug)]
pub enum DwarfError {
    #[error("required DWARF section {0} not found")]
    MissingSection(&'static str),

    /// The unit length used the 0xffffffff escape of the 64-bit DWARF format.
    #[error("64-bit DWARF format is not supported ({section} offset {offset:#x})")]
    UnsupportedFormat { section: &'static str, offset: usize },

    #[error("unsupported DWARF version {version} ({section} offset {offset:#x})")]
    UnsupportedVersion {
        section: &'static str,
        offset: usize,
        version: u16,
    },

    #[error("integer does not fit in 64 bits ({section} offset {offset:#x})")]
    IntegerOverflow { section: &'static str, offset: usize },

    #[error("unexpected end of data ({section} offset {offset:#x})")]
    UnexpectedEof { section: &'static str, offset: usize },

    #[error("unterminated string ({section} offset {offset:#x})")]
    UnterminatedString { section: &'static str, offset: usize },

    #[error("abbreviation code {code} not declared (.debug_info offset {offset:#x})")]
    UnknownAbbreviation { code: u64, offset: usize },

    #[error("abbreviation code {code} declared twice (.debug_abbrev offset {offset:#x})")]
    DuplicateAbbreviation { code: u64, offset: usize },

    #[error("unsupported address size {size} ({section} offset {offset:#x})")]
    UnsupportedAddressSize {
        section: &'static str,
        offset: usize,
        size: u8,
    },

    #[error("unsupported attribute form {form} (.debug_info offset {offset:#x})")]
    UnsupportedForm { form: DwForm, offset: usize },

    #[error("offset {offset:#x} is outside {section}")]
    OffsetOutOfBounds { section: &'static str, offset: u64 },

    #[error("invalid line program (.debug_line offset {offset:#x}): {reason}")]
    InvalidLineProgram { offset: usize, reason: String },

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("{}: {reason}", path.display())]
    Elf { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DwarfError>;
