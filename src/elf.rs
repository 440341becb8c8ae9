use std::collections::HashMap;
use std::fs::File;
use std::mem;
use std::path::{Path, PathBuf};

use log::debug;
use memmap2::Mmap;
use nix::libc::{Elf64_Ehdr, Elf64_Shdr};

use crate::dwarf::SectionSource;
use crate::error::{DwarfError, Result};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

const SHN_XINDEX: u16 = 0xffff;
const SHT_NOBITS: u32 = 8;
const SHF_COMPRESSED: u64 = 0x800;

/// A memory-mapped ELF64 little-endian object, read for its section table.
pub struct Elf {
    path: PathBuf,
    mmap: Mmap,
    header: Elf64_Ehdr,
    section_headers: Vec<Elf64_Shdr>,
    // Section name -> index into section_headers
    section_map: HashMap<String, usize>,
}

/// Copies a `T` out of `data` at `offset`, if it fits.
fn read_struct<T: Copy>(data: &[u8], offset: usize) -> Option<T> {
    let end = offset.checked_add(mem::size_of::<T>())?;
    if end > data.len() {
        return None;
    }
    // SAFETY: bounds checked above, and the plain-data ELF structs are valid
    // for any bit pattern. The mapping has no alignment guarantee.
    Some(unsafe { std::ptr::read_unaligned(data[offset..].as_ptr() as *const T) })
}

impl Elf {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: the mapping is read-only; the file is not expected to be
        // modified while it is open.
        let mmap = unsafe { Mmap::map(&file)? };

        let header: Elf64_Ehdr = read_struct(&mmap, 0)
            .ok_or_else(|| Self::error(&path, "file too small for an ELF header"))?;
        if &header.e_ident[..4] != ELF_MAGIC {
            return Err(Self::error(&path, "not an ELF file"));
        }
        if header.e_ident[EI_CLASS] != ELFCLASS64 {
            return Err(Self::error(&path, "only 64-bit ELF files are supported"));
        }
        if header.e_ident[EI_DATA] != ELFDATA2LSB {
            return Err(Self::error(&path, "only little-endian ELF files are supported"));
        }

        let mut elf = Self {
            path,
            mmap,
            header,
            section_headers: Vec::new(),
            section_map: HashMap::new(),
        };
        elf.parse_section_headers()?;
        elf.build_section_map();
        debug!(
            "{}: {} sections",
            elf.path.display(),
            elf.section_headers.len()
        );
        Ok(elf)
    }

    fn error(path: &Path, reason: &str) -> DwarfError {
        DwarfError::Elf {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Elf64_Ehdr {
        &self.header
    }

    fn parse_section_headers(&mut self) -> Result<()> {
        let shoff = self.header.e_shoff as usize;
        if shoff == 0 {
            return Ok(());
        }
        let entsize = self.header.e_shentsize as usize;
        if entsize != mem::size_of::<Elf64_Shdr>() {
            return Err(Self::error(&self.path, "unexpected section header size"));
        }

        let first: Elf64_Shdr = read_struct(&self.mmap, shoff)
            .ok_or_else(|| Self::error(&self.path, "section header table outside the file"))?;
        // Counts that do not fit the header live in the first section header.
        let count = match self.header.e_shnum {
            0 => first.sh_size as usize,
            n => n as usize,
        };

        let mut headers = Vec::with_capacity(count.min(self.mmap.len() / entsize));
        for i in 0..count {
            let offset = i
                .checked_mul(entsize)
                .and_then(|rel| rel.checked_add(shoff))
                .ok_or_else(|| Self::error(&self.path, "section header table overflows"))?;
            let section = read_struct(&self.mmap, offset)
                .ok_or_else(|| Self::error(&self.path, "section header table outside the file"))?;
            headers.push(section);
        }
        self.section_headers = headers;
        Ok(())
    }

    fn shstrndx(&self) -> usize {
        match self.header.e_shstrndx {
            SHN_XINDEX => self
                .section_headers
                .first()
                .map_or(0, |first| first.sh_link as usize),
            index => index as usize,
        }
    }

    pub fn get_section_name(&self, section_index: usize) -> Option<&str> {
        let shstr = self.section_headers.get(self.shstrndx())?;
        let section = self.section_headers.get(section_index)?;
        let start = (shstr.sh_offset as usize).checked_add(section.sh_name as usize)?;
        let rest = self.mmap.get(start..)?;
        let len = rest.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&rest[..len]).ok()
    }

    fn build_section_map(&mut self) {
        let mut map = HashMap::new();
        for index in 0..self.section_headers.len() {
            if let Some(name) = self.get_section_name(index) {
                if !name.is_empty() {
                    map.entry(name.to_string()).or_insert(index);
                }
            }
        }
        self.section_map = map;
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.section_map.keys().map(String::as_str)
    }

    fn get_section(&self, name: &str) -> Option<&Elf64_Shdr> {
        self.section_map
            .get(name)
            .and_then(|&index| self.section_headers.get(index))
    }

    /// File contents of a section; `None` when absent or without file data.
    pub fn get_section_bytes(&self, name: &str) -> Option<&[u8]> {
        let section = self.get_section(name)?;
        if section.sh_type == SHT_NOBITS {
            return None;
        }
        if section.sh_flags & SHF_COMPRESSED != 0 {
            debug!("{}: {name} is compressed, ignoring it", self.path.display());
            return None;
        }
        let offset = section.sh_offset as usize;
        let end = offset.checked_add(section.sh_size as usize)?;
        self.mmap.get(offset..end)
    }
}

impl SectionSource for Elf {
    fn section_data(&self, name: &str) -> Option<&[u8]> {
        self.get_section_bytes(name)
    }
}

impl std::fmt::Debug for Elf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Elf")
            .field("path", &self.path)
            .field("sections", &self.section_headers.len())
            .finish()
    }
}
