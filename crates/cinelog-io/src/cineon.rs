//! Kodak Cineon container support.
//!
//! The original film-scan format DPX grew out of. Cineon stores one
//! pixel-interleaved image whose channels are described individually,
//! always in printing density, with the classic 95/685 reference
//! levels fixed by the format.
//!
//! # Layout
//!
//! | Offset | Section |
//! |--------|---------|
//! | 0      | File information (magic, offsets, version) |
//! | 192    | Image information, eight 28-byte channel blocks at 196 |
//! | 680    | Data format (interleave, packing, sign) |
//! | 712    | Image origination |
//! | 1024   | Image data in created files |

use crate::detect::CINEON_MAGIC;
use crate::element::{Descriptor, Element, Packing, SourceFormat, Transfer};
use crate::io::{
    read_f32, read_u32, read_u8, write_f32, write_fixed_str, write_u16, write_u32, write_zeros,
    ReadSeek,
};
use crate::logimage::{CreateOptions, LogImage, Stream};
use crate::{IoError, IoResult};
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Byte offset of the image data in created files.
const CREATED_DATA_OFFSET: u32 = 1024;

/// Default density range of the full code scale.
const DEFAULT_DENSITY_RANGE: f32 = 2.048;

/// Kodak packing codes for the three word layouts.
const PACKING_PACKED: u8 = 0;
const PACKING_FILLED_LSB: u8 = 5;
const PACKING_FILLED_MSB: u8 = 6;

/// Parses a Cineon header into an open handle.
pub(crate) fn open(mut reader: Box<dyn ReadSeek>) -> IoResult<LogImage> {
    reader.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    let big_endian = match u32::from_be_bytes(magic) {
        CINEON_MAGIC => true,
        m if m == CINEON_MAGIC.swap_bytes() => false,
        _ => return Err(IoError::InvalidFile("bad Cineon magic number".to_string())),
    };

    let data_offset = read_u32(&mut reader, big_endian)?;

    // Image information header.
    reader.seek(SeekFrom::Start(192))?;
    let _orientation = read_u8(&mut reader)?;
    let num_channels = read_u8(&mut reader)? as u32;
    if !(1..=8).contains(&num_channels) {
        return Err(IoError::InvalidFile(format!(
            "Cineon declares {} channels",
            num_channels
        )));
    }

    let mut width = 0u32;
    let mut height = 0u32;
    let mut bits_per_sample = 0u32;
    let mut ref_low_data = f32::NAN;
    let mut ref_low_quantity = f32::NAN;
    let mut ref_high_data = f32::NAN;
    let mut ref_high_quantity = f32::NAN;

    for i in 0..num_channels as u64 {
        reader.seek(SeekFrom::Start(196 + i * 28))?;
        let _designator_universe = read_u8(&mut reader)?;
        let _designator = read_u8(&mut reader)?;
        let bits = read_u8(&mut reader)? as u32;
        let _filler = read_u8(&mut reader)?;
        let pixels_per_line = read_u32(&mut reader, big_endian)?;
        let lines_per_image = read_u32(&mut reader, big_endian)?;
        let low_data = read_f32(&mut reader, big_endian)?;
        let low_quantity = read_f32(&mut reader, big_endian)?;
        let high_data = read_f32(&mut reader, big_endian)?;
        let high_quantity = read_f32(&mut reader, big_endian)?;

        if i == 0 {
            width = pixels_per_line;
            height = lines_per_image;
            bits_per_sample = bits;
            ref_low_data = low_data;
            ref_low_quantity = low_quantity;
            ref_high_data = high_data;
            ref_high_quantity = high_quantity;
        } else if bits != bits_per_sample
            || pixels_per_line != width
            || lines_per_image != height
        {
            return Err(IoError::UnsupportedFormat(
                "Cineon channels with mismatched layout".to_string(),
            ));
        }
    }

    if width == 0 || height == 0 {
        return Err(IoError::InvalidFile(format!(
            "invalid image size {}x{}",
            width, height
        )));
    }
    if !matches!(bits_per_sample, 1 | 8 | 10 | 12 | 16) {
        return Err(IoError::UnsupportedFormat(format!(
            "{} bits per sample",
            bits_per_sample
        )));
    }

    let descriptor = match num_channels {
        1 => Descriptor::Luminance,
        3 => Descriptor::Rgb,
        n => {
            return Err(IoError::UnsupportedFormat(format!(
                "{}-channel Cineon image",
                n
            )))
        }
    };

    // Data format header.
    reader.seek(SeekFrom::Start(680))?;
    let interleave = read_u8(&mut reader)?;
    let packing_code = read_u8(&mut reader)?;
    let data_sign = read_u8(&mut reader)?;
    if interleave != 0 {
        return Err(IoError::UnsupportedFormat(
            "planar Cineon interleave".to_string(),
        ));
    }
    if data_sign != 0 {
        return Err(IoError::UnsupportedFormat(
            "signed Cineon samples".to_string(),
        ));
    }
    let packing = match packing_code {
        PACKING_PACKED => Packing::Packed,
        PACKING_FILLED_LSB => Packing::FilledLsb,
        PACKING_FILLED_MSB => Packing::FilledMsb,
        code => {
            return Err(IoError::UnsupportedFormat(format!(
                "Cineon packing code {}",
                code
            )))
        }
    };

    let max_value = (1u32 << bits_per_sample) - 1;
    let element = Element {
        descriptor,
        transfer: Transfer::PrintingDensity,
        depth: num_channels,
        bits_per_sample,
        packing,
        data_offset,
        ref_low_data: if ref_low_data.is_finite() {
            ref_low_data as u32
        } else {
            0
        },
        ref_high_data: if ref_high_data.is_finite() {
            ref_high_data as u32
        } else {
            max_value
        },
        ref_low_quantity: if ref_low_quantity.is_finite() {
            ref_low_quantity
        } else {
            0.0
        },
        ref_high_quantity: if ref_high_quantity.is_finite() {
            ref_high_quantity
        } else {
            DEFAULT_DENSITY_RANGE
        },
        max_value,
    };

    tracing::debug!(
        "Cineon {}x{} depth {} {}-endian",
        width,
        height,
        num_channels,
        if big_endian { "big" } else { "little" }
    );

    // The format fixes its colorimetry: 95/685 scaled to the code
    // range, display gamma 1.7.
    let max = max_value as f32;
    Ok(LogImage {
        width,
        height,
        depth: num_channels,
        elements: SmallVec::from_elem(element, 1),
        big_endian,
        format: SourceFormat::Cineon,
        reference_black: 95.0 / 1023.0 * max,
        reference_white: 685.0 / 1023.0 * max,
        gamma: 1.7,
        stream: Stream::Reader(reader),
    })
}

/// Creates a new Cineon on disk and writes its complete header.
///
/// Cineon output is always big-endian printing-density RGB; the
/// logarithmic, alpha and reference options do not apply.
pub(crate) fn create(path: &Path, options: &CreateOptions) -> IoResult<LogImage> {
    if !matches!(options.bits_per_sample, 8 | 10 | 12 | 16) {
        return Err(IoError::UnsupportedFormat(format!(
            "cannot write {} bits per sample",
            options.bits_per_sample
        )));
    }

    let max_value = (1u32 << options.bits_per_sample) - 1;
    let packing = match options.bits_per_sample {
        10 | 12 => Packing::FilledLsb,
        _ => Packing::Packed,
    };
    let element = Element {
        descriptor: Descriptor::Rgb,
        transfer: Transfer::PrintingDensity,
        depth: 3,
        bits_per_sample: options.bits_per_sample,
        packing,
        data_offset: CREATED_DATA_OFFSET,
        ref_low_data: 0,
        ref_high_data: max_value,
        ref_low_quantity: 0.0,
        ref_high_quantity: DEFAULT_DENSITY_RANGE,
        max_value,
    };

    let image_size = element.row_length(options.width) as u32 * options.height;
    let file_size = CREATED_DATA_OFFSET + image_size;

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    let be = true;

    // File information header.
    w.write_all(&CINEON_MAGIC.to_be_bytes())?;
    write_u32(&mut w, CREATED_DATA_OFFSET, be)?;
    write_u32(&mut w, CREATED_DATA_OFFSET, be)?; // Generic header length
    write_u32(&mut w, 0, be)?; // Industry header length
    write_u32(&mut w, 0, be)?; // User data length
    write_u32(&mut w, file_size, be)?;
    write_fixed_str(&mut w, "V4.5", 8)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("untitled.cin");
    write_fixed_str(&mut w, filename, 100)?;
    write_zeros(&mut w, 12)?; // Creation date
    write_zeros(&mut w, 12)?; // Creation time
    write_zeros(&mut w, 36)?; // Reserved, up to offset 192

    // Image information header.
    w.write_all(&[0u8, 3])?; // Orientation, channel count
    write_u16(&mut w, 0, be)?; // Filler
    for designator in 1u8..=3 {
        w.write_all(&[0, designator, options.bits_per_sample as u8, 0])?;
        write_u32(&mut w, options.width, be)?;
        write_u32(&mut w, options.height, be)?;
        write_f32(&mut w, 0.0, be)?; // Reference low data
        write_f32(&mut w, 0.0, be)?; // Reference low quantity
        write_f32(&mut w, max_value as f32, be)?;
        write_f32(&mut w, DEFAULT_DENSITY_RANGE, be)?;
    }
    write_zeros(&mut w, 5 * 28)?; // Unused channel blocks
    write_zeros(&mut w, 8)?; // White point
    write_zeros(&mut w, 24)?; // Primaries
    write_zeros(&mut w, 200)?; // Label
    write_zeros(&mut w, 28)?; // Reserved, up to offset 680

    // Data format header.
    let packing_code = match packing {
        Packing::Packed => PACKING_PACKED,
        Packing::FilledLsb => PACKING_FILLED_LSB,
        Packing::FilledMsb => PACKING_FILLED_MSB,
    };
    w.write_all(&[0, packing_code, 0, 0])?; // Interleave, packing, sign, sense
    write_u32(&mut w, 0, be)?; // End-of-line padding
    write_u32(&mut w, 0, be)?; // End-of-channel padding
    write_zeros(&mut w, 20)?; // Reserved, up to offset 712

    // Image origination header.
    write_u32(&mut w, 0, be)?; // X offset
    write_u32(&mut w, 0, be)?; // Y offset
    write_fixed_str(&mut w, filename, 100)?;
    write_zeros(&mut w, 12)?; // Date
    write_zeros(&mut w, 12)?; // Time
    write_fixed_str(&mut w, &options.creator, 64)?;
    write_zeros(&mut w, 32)?; // Model
    write_zeros(&mut w, 32)?; // Serial
    write_f32(&mut w, 0.0, be)?; // X pitch
    write_f32(&mut w, 0.0, be)?; // Y pitch
    write_f32(&mut w, 1.7, be)?; // Input gamma
    write_zeros(&mut w, 40)?; // Reserved, up to offset 1024

    w.flush()?;

    let max = max_value as f32;
    Ok(LogImage {
        width: options.width,
        height: options.height,
        depth: 3,
        elements: SmallVec::from_elem(element, 1),
        big_endian: be,
        format: SourceFormat::Cineon,
        reference_black: 95.0 / 1023.0 * max,
        reference_white: 685.0 / 1023.0 * max,
        gamma: 1.7,
        stream: Stream::Writer(w),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logimage::LogImage;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn test_header_roundtrip() {
        let path = temp_path("cinelog_cineon_header.cin");
        let options = CreateOptions {
            format: SourceFormat::Cineon,
            width: 24,
            height: 9,
            bits_per_sample: 10,
            ..Default::default()
        };
        {
            let mut file = LogImage::create(&path, &options).unwrap();
            file.write_rgba(&vec![0.25f32; 24 * 9 * 4], false).unwrap();
        }

        let file = LogImage::open(&path).unwrap();
        assert_eq!(file.width(), 24);
        assert_eq!(file.height(), 9);
        assert_eq!(file.depth(), 3);
        assert_eq!(file.format(), SourceFormat::Cineon);
        assert!(file.is_big_endian());

        let element = &file.elements()[0];
        assert_eq!(element.descriptor, Descriptor::Rgb);
        assert_eq!(element.transfer, Transfer::PrintingDensity);
        assert_eq!(element.packing, Packing::FilledLsb);
        assert_eq!(element.data_offset, 1024);

        // Fixed film colorimetry.
        assert!((file.reference_black - 95.0).abs() < 1e-3);
        assert!((file.reference_white - 685.0).abs() < 1e-3);
        assert!((file.gamma - 1.7).abs() < 1e-6);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_alpha_ignored() {
        // Cineon has no alpha; the option is silently dropped.
        let path = temp_path("cinelog_cineon_alpha.cin");
        let options = CreateOptions {
            format: SourceFormat::Cineon,
            width: 2,
            height: 2,
            alpha: true,
            ..Default::default()
        };
        {
            let mut file = LogImage::create(&path, &options).unwrap();
            assert_eq!(file.depth(), 3);
            file.write_rgba(&vec![0.5f32; 2 * 2 * 4], false).unwrap();
        }
        let file = LogImage::open(&path).unwrap();
        assert_eq!(file.depth(), 3);

        let _ = std::fs::remove_file(&path);
    }
}
