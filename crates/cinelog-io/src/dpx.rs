//! DPX (SMPTE 268M) container support.
//!
//! Industry standard for film scanning and digital intermediate work.
//! The 2048-byte header splits into a generic file header, an image
//! information header with up to eight element descriptions, and the
//! industry (film and television) headers carrying the colorimetric
//! reference levels.
//!
//! # Layout
//!
//! | Offset | Section |
//! |--------|---------|
//! | 0      | File header (magic, offsets, version, creator) |
//! | 768    | Image information, eight 72-byte element blocks at 780 |
//! | 1408   | Image origination |
//! | 1664   | Film industry header |
//! | 1920   | Television header (gamma 1948, black 1952, white 1964) |

use crate::detect::DPX_MAGIC;
use crate::element::{Descriptor, Element, Packing, SourceFormat, Transfer};
use crate::io::{
    read_f32, read_u16, read_u32, read_u8, write_f32, write_fixed_str, write_u16, write_u32,
    write_zeros, ReadSeek,
};
use crate::logimage::{CreateOptions, LogImage, Stream};
use crate::{IoError, IoResult};
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Value of unset integer header fields.
const UNDEFINED_U32: u32 = 0xFFFF_FFFF;

/// Byte offset of the image data in created files.
const CREATED_DATA_OFFSET: u32 = 2048;

/// Default density range of the full code scale.
const DEFAULT_DENSITY_RANGE: f32 = 2.048;

fn undefined_f32(value: f32) -> bool {
    !value.is_finite()
}

/// Parses a DPX header into an open handle.
///
/// The reader is past the magic; its first four bytes were already
/// matched against the DPX magic in either orientation.
pub(crate) fn open(mut reader: Box<dyn ReadSeek>) -> IoResult<LogImage> {
    reader.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    let big_endian = match u32::from_be_bytes(magic) {
        DPX_MAGIC => true,
        m if m == DPX_MAGIC.swap_bytes() => false,
        _ => return Err(IoError::InvalidFile("bad DPX magic number".to_string())),
    };

    // Image information header.
    reader.seek(SeekFrom::Start(768))?;
    let _orientation = read_u16(&mut reader, big_endian)?;
    let num_elements = read_u16(&mut reader, big_endian)?;
    if !(1..=8).contains(&num_elements) {
        return Err(IoError::InvalidFile(format!(
            "DPX declares {} image elements",
            num_elements
        )));
    }
    let width = read_u32(&mut reader, big_endian)?;
    let height = read_u32(&mut reader, big_endian)?;
    if width == 0 || height == 0 {
        return Err(IoError::InvalidFile(format!(
            "invalid image size {}x{}",
            width, height
        )));
    }

    let mut elements: SmallVec<[Element; 8]> = SmallVec::new();
    let mut depth = 0u32;
    for i in 0..num_elements as u64 {
        reader.seek(SeekFrom::Start(780 + i * 72))?;
        let _data_sign = read_u32(&mut reader, big_endian)?;
        let ref_low_data = read_u32(&mut reader, big_endian)?;
        let ref_low_quantity = read_f32(&mut reader, big_endian)?;
        let ref_high_data = read_u32(&mut reader, big_endian)?;
        let ref_high_quantity = read_f32(&mut reader, big_endian)?;
        let descriptor_code = read_u8(&mut reader)?;
        let transfer_code = read_u8(&mut reader)?;
        let _colorimetric = read_u8(&mut reader)?;
        let bits_per_sample = read_u8(&mut reader)? as u32;
        let packing_code = read_u16(&mut reader, big_endian)?;
        let encoding = read_u16(&mut reader, big_endian)?;
        let data_offset = read_u32(&mut reader, big_endian)?;

        let descriptor = Descriptor::from_dpx_code(descriptor_code).ok_or_else(|| {
            IoError::UnsupportedFormat(format!("descriptor code {}", descriptor_code))
        })?;
        let transfer = Transfer::from_dpx_code(transfer_code)
            .ok_or_else(|| IoError::UnsupportedFormat(format!("transfer code {}", transfer_code)))?;
        let packing = Packing::from_dpx_code(packing_code)
            .ok_or_else(|| IoError::UnsupportedFormat(format!("packing code {}", packing_code)))?;
        if encoding != 0 {
            return Err(IoError::UnsupportedFormat(
                "run-length encoded DPX".to_string(),
            ));
        }
        if !matches!(bits_per_sample, 1 | 8 | 10 | 12 | 16) {
            return Err(IoError::UnsupportedFormat(format!(
                "{} bits per sample",
                bits_per_sample
            )));
        }

        let max_value = (1u32 << bits_per_sample) - 1;
        if !descriptor.is_auxiliary() {
            depth += descriptor.channels();
        }
        elements.push(Element {
            descriptor,
            transfer,
            depth: descriptor.channels(),
            bits_per_sample,
            packing,
            data_offset,
            ref_low_data: if ref_low_data == UNDEFINED_U32 {
                0
            } else {
                ref_low_data
            },
            ref_high_data: if ref_high_data == UNDEFINED_U32 {
                max_value
            } else {
                ref_high_data
            },
            ref_low_quantity: if undefined_f32(ref_low_quantity) {
                0.0
            } else {
                ref_low_quantity
            },
            ref_high_quantity: if undefined_f32(ref_high_quantity) {
                DEFAULT_DENSITY_RANGE
            } else {
                ref_high_quantity
            },
            max_value,
        });
    }

    if !(1..=4).contains(&depth) {
        return Err(IoError::UnsupportedFormat(format!(
            "assembled image depth {}",
            depth
        )));
    }

    // Television header: the film-curve reference levels. Some files
    // stop after the generic header, so fall back to defaults rather
    // than failing.
    let max = elements[0].max_value as f32;
    let mut gamma = f32::NAN;
    let mut reference_black = f32::NAN;
    let mut reference_white = f32::NAN;
    if reader.seek(SeekFrom::Start(1948)).is_ok() {
        if let Ok(value) = read_f32(&mut reader, big_endian) {
            gamma = value;
        }
        if let Ok(value) = read_f32(&mut reader, big_endian) {
            reference_black = value;
        }
    }
    if reader.seek(SeekFrom::Start(1964)).is_ok() {
        if let Ok(value) = read_f32(&mut reader, big_endian) {
            reference_white = value;
        }
    }
    if undefined_f32(reference_black)
        || undefined_f32(reference_white)
        || reference_black < 0.0
        || reference_white > max
        || reference_white <= reference_black
    {
        reference_black = 95.0 / 1023.0 * max;
        reference_white = 685.0 / 1023.0 * max;
    }
    if undefined_f32(gamma) || gamma <= 0.0 {
        gamma = 1.7;
    }

    tracing::debug!(
        "DPX {}x{} depth {} elements {} {}-endian",
        width,
        height,
        depth,
        elements.len(),
        if big_endian { "big" } else { "little" }
    );

    Ok(LogImage {
        width,
        height,
        depth,
        elements,
        big_endian,
        format: SourceFormat::Dpx,
        reference_black,
        reference_white,
        gamma,
        stream: Stream::Reader(reader),
    })
}

/// Creates a new DPX on disk and writes its complete header.
///
/// Created files are big-endian with a single RGB or RGBA element,
/// filled-LSB packing for sub-word depths, and transfer printing
/// density or linear per the options.
pub(crate) fn create(path: &Path, options: &CreateOptions) -> IoResult<LogImage> {
    if !matches!(options.bits_per_sample, 8 | 10 | 12 | 16) {
        return Err(IoError::UnsupportedFormat(format!(
            "cannot write {} bits per sample",
            options.bits_per_sample
        )));
    }

    let max_value = (1u32 << options.bits_per_sample) - 1;
    let max = max_value as f32;
    let mut reference_white = options.reference_white.unwrap_or(685.0 / 1023.0 * max);
    let mut reference_black = options.reference_black.unwrap_or(95.0 / 1023.0 * max);
    if reference_black < 0.0 || reference_white > max || reference_white <= reference_black {
        tracing::warn!(
            "reference levels {}/{} out of range, using defaults",
            reference_black,
            reference_white
        );
        reference_black = 95.0 / 1023.0 * max;
        reference_white = 685.0 / 1023.0 * max;
    }
    let mut gamma = options.gamma.unwrap_or(1.7);
    if !gamma.is_finite() || gamma <= 0.0 {
        gamma = 1.7;
    }

    let descriptor = if options.alpha {
        Descriptor::Rgba
    } else {
        Descriptor::Rgb
    };
    let transfer = if options.logarithmic {
        Transfer::PrintingDensity
    } else {
        Transfer::Linear
    };
    let packing = match options.bits_per_sample {
        10 | 12 => Packing::FilledLsb,
        _ => Packing::Packed,
    };
    let element = Element {
        descriptor,
        transfer,
        depth: descriptor.channels(),
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

    // File header.
    w.write_all(&DPX_MAGIC.to_be_bytes())?;
    write_u32(&mut w, CREATED_DATA_OFFSET, be)?;
    w.write_all(b"V2.0\0\0\0\0")?;
    write_u32(&mut w, file_size, be)?;
    write_u32(&mut w, 1, be)?; // Ditto key: new frame
    write_u32(&mut w, 1664, be)?; // Generic header length
    write_u32(&mut w, 384, be)?; // Industry header length
    write_u32(&mut w, 0, be)?; // User data length
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("untitled.dpx");
    write_fixed_str(&mut w, filename, 100)?;
    write_zeros(&mut w, 24)?; // Creation date
    write_fixed_str(&mut w, &options.creator, 100)?;
    write_zeros(&mut w, 200)?; // Project
    write_zeros(&mut w, 200)?; // Copyright
    write_u32(&mut w, UNDEFINED_U32, be)?; // Encryption key: unencrypted
    write_zeros(&mut w, 104)?; // Reserved, up to offset 768

    // Image information header.
    write_u16(&mut w, 0, be)?; // Orientation: left to right, top to bottom
    write_u16(&mut w, 1, be)?; // Number of elements
    write_u32(&mut w, options.width, be)?;
    write_u32(&mut w, options.height, be)?;

    // Element block 0.
    write_u32(&mut w, 0, be)?; // Data sign: unsigned
    write_u32(&mut w, element.ref_low_data, be)?;
    write_f32(&mut w, element.ref_low_quantity, be)?;
    write_u32(&mut w, element.ref_high_data, be)?;
    write_f32(&mut w, element.ref_high_quantity, be)?;
    w.write_all(&[
        descriptor.dpx_code(),
        transfer.dpx_code(),
        transfer.dpx_code(), // Colorimetric mirrors the transfer
        options.bits_per_sample as u8,
    ])?;
    write_u16(&mut w, packing.dpx_code(), be)?;
    write_u16(&mut w, 0, be)?; // Encoding: none
    write_u32(&mut w, CREATED_DATA_OFFSET, be)?;
    write_u32(&mut w, 0, be)?; // End-of-line padding
    write_u32(&mut w, 0, be)?; // End-of-image padding
    write_zeros(&mut w, 32)?; // Description

    write_zeros(&mut w, 7 * 72)?; // Unused element blocks
    write_zeros(&mut w, 52)?; // Reserved, up to offset 1408

    write_zeros(&mut w, 256)?; // Image origination header
    write_zeros(&mut w, 256)?; // Film industry header

    // Television header; only the film-curve levels are meaningful.
    write_zeros(&mut w, 28)?; // Through the frame-rate fields
    write_f32(&mut w, gamma, be)?;
    write_f32(&mut w, reference_black, be)?;
    write_f32(&mut w, 0.0, be)?; // Black gain
    write_f32(&mut w, 0.0, be)?; // Break point
    write_f32(&mut w, reference_white, be)?;
    write_f32(&mut w, 0.0, be)?; // Integration time
    write_zeros(&mut w, 76)?; // Reserved, up to offset 2048

    w.flush()?;

    Ok(LogImage {
        width: options.width,
        height: options.height,
        depth: element.depth,
        elements: SmallVec::from_elem(element, 1),
        big_endian: be,
        format: SourceFormat::Dpx,
        reference_black,
        reference_white,
        gamma,
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
        let path = temp_path("cinelog_dpx_header.dpx");
        let options = CreateOptions {
            width: 32,
            height: 17,
            bits_per_sample: 10,
            logarithmic: true,
            ..Default::default()
        };
        {
            let mut file = LogImage::create(&path, &options).unwrap();
            let data = vec![0.5f32; 32 * 17 * 4];
            file.write_rgba(&data, false).unwrap();
        }

        let file = LogImage::open(&path).unwrap();
        assert_eq!(file.width(), 32);
        assert_eq!(file.height(), 17);
        assert_eq!(file.depth(), 3);
        assert_eq!(file.format(), SourceFormat::Dpx);
        assert!(file.is_big_endian());

        let element = &file.elements()[0];
        assert_eq!(element.descriptor, Descriptor::Rgb);
        assert_eq!(element.transfer, Transfer::PrintingDensity);
        assert_eq!(element.bits_per_sample, 10);
        assert_eq!(element.packing, Packing::FilledLsb);
        assert_eq!(element.data_offset, 2048);
        assert_eq!(element.max_value, 1023);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reference_levels_roundtrip() {
        let path = temp_path("cinelog_dpx_refs.dpx");
        let options = CreateOptions {
            width: 4,
            height: 4,
            reference_white: Some(700.0),
            reference_black: Some(100.0),
            gamma: Some(2.2),
            ..Default::default()
        };
        {
            let mut file = LogImage::create(&path, &options).unwrap();
            file.write_rgba(&vec![0.0f32; 4 * 4 * 4], false).unwrap();
        }

        let file = LogImage::open(&path).unwrap();
        assert!((file.reference_white - 700.0).abs() < 1e-3);
        assert!((file.reference_black - 100.0).abs() < 1e-3);
        assert!((file.gamma - 2.2).abs() < 1e-3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_alpha_element() {
        let path = temp_path("cinelog_dpx_alpha.dpx");
        let options = CreateOptions {
            width: 2,
            height: 2,
            alpha: true,
            logarithmic: false,
            bits_per_sample: 16,
            ..Default::default()
        };
        {
            let mut file = LogImage::create(&path, &options).unwrap();
            file.write_rgba(&vec![1.0f32; 2 * 2 * 4], false).unwrap();
        }

        let file = LogImage::open(&path).unwrap();
        assert_eq!(file.depth(), 4);
        assert_eq!(file.elements()[0].descriptor, Descriptor::Rgba);
        assert_eq!(file.elements()[0].transfer, Transfer::Linear);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_bits_rejected() {
        let path = temp_path("cinelog_dpx_badbits.dpx");
        let options = CreateOptions {
            width: 2,
            height: 2,
            bits_per_sample: 11,
            ..Default::default()
        };
        assert!(LogImage::create(&path, &options).is_err());
    }

    #[test]
    fn test_truncated_file_rejected() {
        let bytes = DPX_MAGIC.to_be_bytes();
        assert!(LogImage::open_from_memory(&bytes).is_err());
    }
}
