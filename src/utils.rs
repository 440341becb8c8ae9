use std::path::Path;

use crate::error::{DwarfError, Result};

/// Parses `0x`-prefixed hex or plain decimal.
pub fn parse_address(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| DwarfError::InvalidAddress(text.to_string()))
}

/// File name without its directories, as `addr2line -s` prints it.
pub fn basename(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}
