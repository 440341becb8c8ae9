//! Address-to-source resolution over DWARF debug information.
//!
//! [`Dwarf`] decodes the DWARF sections of one object and answers
//! `address -> (file, line, function)` queries, parsing compilation units
//! lazily. [`Symbolizer`] tries a list of binaries in order.

pub mod dwarf;
pub mod elf;
pub mod error;
pub mod symbolizer;
pub mod utils;

pub use dwarf::{Dwarf, DwarfSections, Location, SectionSource};
pub use elf::Elf;
pub use error::{DwarfError, Result};
pub use symbolizer::Symbolizer;
