//! Format detection utilities.
//!
//! Detects the container format from file extensions and magic bytes.
//! Both formats are accepted in either byte order, so each magic is
//! matched in its swapped orientation as well.

use crate::IoResult;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// DPX magic number ("SDPX", big-endian file).
pub(crate) const DPX_MAGIC: u32 = 0x5344_5058;
/// Cineon magic number (big-endian file).
pub(crate) const CINEON_MAGIC: u32 = 0x802A_5FD7;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// DPX (SMPTE 268M).
    Dpx,
    /// Kodak Cineon.
    Cineon,
    /// Unknown/unsupported format.
    Unknown,
}

impl Format {
    /// Detects format from file path (magic bytes, then extension).
    pub fn detect<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let path = path.as_ref();

        if let Ok(format) = Self::from_magic_bytes(path) {
            if format != Format::Unknown {
                return Ok(format);
            }
        }

        Ok(Self::from_extension(path))
    }

    /// Detects format from file extension only.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("dpx") => Format::Dpx,
            Some("cin") | Some("cineon") => Format::Cineon,
            _ => Format::Unknown,
        }
    }

    /// Detects format from file magic bytes.
    pub fn from_magic_bytes<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let mut file = File::open(path)?;
        let mut header = [0u8; 4];

        let bytes_read = file.read(&mut header)?;
        if bytes_read < 4 {
            return Ok(Format::Unknown);
        }

        Ok(Self::from_bytes(&header))
    }

    /// Detects format from raw bytes (magic number check).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() < 4 {
            return Format::Unknown;
        }

        let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic == DPX_MAGIC || magic == DPX_MAGIC.swap_bytes() {
            return Format::Dpx;
        }
        if magic == CINEON_MAGIC || magic == CINEON_MAGIC.swap_bytes() {
            return Format::Cineon;
        }

        Format::Unknown
    }

    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Dpx => "dpx",
            Format::Cineon => "cin",
            Format::Unknown => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert_eq!(Format::from_extension("scan.0001.dpx"), Format::Dpx);
        assert_eq!(Format::from_extension("scan.0001.DPX"), Format::Dpx);
        assert_eq!(Format::from_extension("scan.cin"), Format::Cineon);
        assert_eq!(Format::from_extension("scan.png"), Format::Unknown);
    }

    #[test]
    fn test_magic_bytes() {
        // DPX big-endian: SDPX
        assert_eq!(Format::from_bytes(&[0x53, 0x44, 0x50, 0x58]), Format::Dpx);
        // DPX little-endian: XPDS
        assert_eq!(Format::from_bytes(&[0x58, 0x50, 0x44, 0x53]), Format::Dpx);
        // Cineon big-endian
        assert_eq!(
            Format::from_bytes(&[0x80, 0x2A, 0x5F, 0xD7]),
            Format::Cineon
        );
        // Cineon little-endian
        assert_eq!(
            Format::from_bytes(&[0xD7, 0x5F, 0x2A, 0x80]),
            Format::Cineon
        );
        // Unknown
        assert_eq!(Format::from_bytes(&[0x00, 0x00, 0x00, 0x00]), Format::Unknown);
        // Truncated
        assert_eq!(Format::from_bytes(&[0x53, 0x44]), Format::Unknown);
    }
}
