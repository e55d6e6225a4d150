use crate::error::{Result, SubtrackError};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl std::str::FromStr for Encoding {
    type Err = SubtrackError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16le" | "utf16le" => Ok(Encoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Encoding::Utf16Be),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            _ => Err(SubtrackError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Decode raw bytes. A leading byte-order mark matching the encoding is dropped.
pub fn decode_bytes(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).map_err(|e| {
                SubtrackError::UnsupportedEncoding(format!("input is not valid UTF-8: {e}"))
            })
        }
        Encoding::Utf16Le | Encoding::Utf16Be => {
            if bytes.len() % 2 != 0 {
                return Err(SubtrackError::UnsupportedEncoding(
                    "UTF-16 input has an odd number of bytes".to_string(),
                ));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| match encoding {
                    Encoding::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                    _ => u16::from_be_bytes([pair[0], pair[1]]),
                })
                .collect();
            let units = units.strip_prefix(&[0xFEFF]).unwrap_or(&units[..]);
            String::from_utf16(units).map_err(|e| {
                SubtrackError::UnsupportedEncoding(format!("input is not valid UTF-16: {e}"))
            })
        }
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Read `path` and decode it with the named encoding.
pub fn read_text(path: &Path, encoding: &str) -> Result<String> {
    let encoding: Encoding = encoding.parse()?;

    if !path.exists() {
        return Err(SubtrackError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    debug!("Read {} bytes from {:?} as {:?}", bytes.len(), path, encoding);
    decode_bytes(&bytes, encoding)
}
