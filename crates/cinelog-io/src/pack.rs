//! Bit-pack engines.
//!
//! The inverse of the unpack module: serializes a dense float sample
//! stream into the on-disk row layout for 8, 10, 12 and 16 bits per
//! sample. Each float is quantized to `round(f * max_value)` clamped
//! to the code range. Rows are assembled in a zeroed buffer so the
//! 32-bit row padding is always written as zero bytes.
//!
//! Writers only emit the filled-LSB layouts for sub-word depths, the
//! same layouts the filled readers consume.

use crate::element::Element;
use crate::{IoError, IoResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use cinelog_transfer::float_to_code;
use std::io::Write;

/// Writes one element's samples in its on-disk layout.
///
/// `data` holds `width * height * depth` interleaved samples; the
/// writer must already be positioned at the element's data offset.
pub(crate) fn write_element<W: Write + ?Sized>(
    writer: &mut W,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    data: &[f32],
) -> IoResult<()> {
    match element.bits_per_sample {
        8 => write_8bit(writer, element, width, height, data),
        10 => write_10bit(writer, element, width, height, big_endian, data),
        12 => write_12bit(writer, element, width, height, big_endian, data),
        16 => write_16bit(writer, element, width, height, big_endian, data),
        bits => Err(IoError::UnsupportedFormat(format!(
            "cannot write {} bits per sample",
            bits
        ))),
    }
}

fn write_8bit<W: Write + ?Sized>(
    writer: &mut W,
    element: &Element,
    width: u32,
    height: u32,
    data: &[f32],
) -> IoResult<()> {
    let row_samples = (width * element.depth) as usize;
    let row_length = element.row_length(width);
    let mut row = vec![0u8; row_length];

    for y in 0..height as usize {
        let samples = &data[y * row_samples..(y + 1) * row_samples];
        for (slot, &value) in row.iter_mut().zip(samples.iter()) {
            *slot = float_to_code(value, 255) as u8;
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

fn write_10bit<W: Write + ?Sized>(
    writer: &mut W,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    data: &[f32],
) -> IoResult<()> {
    let row_samples = (width * element.depth) as usize;
    let row_length = element.row_length(width);
    let mut row = vec![0u8; row_length];

    for y in 0..height as usize {
        row.fill(0);
        let mut shift = 22i32;
        let mut word = 0u32;
        let mut index = 0usize;

        for x in 0..row_samples {
            let code = float_to_code(data[y * row_samples + x], 1023) as u32;
            word |= code << shift;
            shift -= 10;
            if shift < 0 {
                store_u32(&mut row[index * 4..], word, big_endian);
                index += 1;
                word = 0;
                shift = 22;
            }
        }
        // Flush a partial final word; its padding bits stay zero.
        if shift != 22 {
            store_u32(&mut row[index * 4..], word, big_endian);
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

fn write_12bit<W: Write + ?Sized>(
    writer: &mut W,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    data: &[f32],
) -> IoResult<()> {
    let row_samples = (width * element.depth) as usize;
    let mut row = vec![0u8; element.row_length(width)];

    for y in 0..height as usize {
        for x in 0..row_samples {
            let code = float_to_code(data[y * row_samples + x], 4095) as u16;
            store_u16(&mut row[x * 2..], code << 4, big_endian);
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

fn write_16bit<W: Write + ?Sized>(
    writer: &mut W,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    data: &[f32],
) -> IoResult<()> {
    let row_samples = (width * element.depth) as usize;
    let mut row = vec![0u8; element.row_length(width)];

    for y in 0..height as usize {
        for x in 0..row_samples {
            let code = float_to_code(data[y * row_samples + x], 65535) as u16;
            store_u16(&mut row[x * 2..], code, big_endian);
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

#[inline]
fn store_u32(buf: &mut [u8], value: u32, big_endian: bool) {
    if big_endian {
        BigEndian::write_u32(buf, value);
    } else {
        LittleEndian::write_u32(buf, value);
    }
}

#[inline]
fn store_u16(buf: &mut [u8], value: u16, big_endian: bool) {
    if big_endian {
        BigEndian::write_u16(buf, value);
    } else {
        LittleEndian::write_u16(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Descriptor, Packing, Transfer};
    use crate::unpack::read_element;
    use std::io::Cursor;

    fn element(bits: u32, packing: Packing, depth: u32) -> Element {
        Element {
            descriptor: Descriptor::Rgb,
            transfer: Transfer::Linear,
            depth,
            bits_per_sample: bits,
            packing,
            data_offset: 0,
            ref_low_data: 0,
            ref_high_data: (1u32 << bits) - 1,
            ref_low_quantity: 0.0,
            ref_high_quantity: 2.048,
            max_value: (1u32 << bits) - 1,
        }
    }

    #[test]
    fn test_10bit_word_layout() {
        // One RGB pixel (1023, 0, 0) occupies one big-endian word.
        let elem = element(10, Packing::FilledLsb, 3);
        let mut bytes = Vec::new();
        write_element(&mut bytes, &elem, 1, 1, true, &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(bytes, [0xFF, 0xC0, 0x00, 0x00]);
    }

    #[test]
    fn test_10bit_partial_word_flush() {
        // Four samples: the second word holds one sample and zero padding.
        let elem = element(10, Packing::FilledLsb, 1);
        let mut bytes = Vec::new();
        write_element(&mut bytes, &elem, 4, 1, true, &[0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(bytes.len(), 8);
        let w1 = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(w1, 1023 << 22);
    }

    #[test]
    fn test_12bit_shifted_left() {
        let elem = element(12, Packing::FilledLsb, 1);
        let mut bytes = Vec::new();
        write_element(&mut bytes, &elem, 1, 1, true, &[0xABC as f32 / 4095.0]).unwrap();
        assert_eq!(bytes, (0xABCu16 << 4).to_be_bytes());
    }

    #[test]
    fn test_8bit_row_padding_zeroed() {
        // Width 3 rows pad to four bytes; the pad byte must be zero.
        let elem = element(8, Packing::Packed, 1);
        let mut bytes = Vec::new();
        write_element(&mut bytes, &elem, 3, 2, true, &[1.0; 6]).unwrap();
        assert_eq!(bytes, [255, 255, 255, 0, 255, 255, 255, 0]);
    }

    #[test]
    fn test_code_clamping() {
        let elem = element(16, Packing::Packed, 1);
        let mut bytes = Vec::new();
        write_element(&mut bytes, &elem, 2, 1, false, &[-0.25, 1.25]).unwrap();
        assert_eq!(bytes, [0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_pack_unpack_symmetry() {
        // A gradient survives every supported depth within one code step.
        let samples: Vec<f32> = (0..30).map(|i| i as f32 / 29.0).collect();
        for bits in [8u32, 10, 12, 16] {
            let elem = element(bits, Packing::FilledLsb, 3);
            let mut bytes = Vec::new();
            write_element(&mut bytes, &elem, 10, 1, true, &samples).unwrap();
            assert_eq!(bytes.len(), elem.row_length(10));

            let mut cursor = Cursor::new(bytes);
            let back = read_element(&mut cursor, &elem, 10, 1, true, false).unwrap();
            let step = 1.0 / elem.max_value as f32;
            for (got, want) in back.iter().zip(samples.iter()) {
                assert!(
                    (got - want).abs() <= 0.5 * step + 1e-6,
                    "{} bits: {} vs {}",
                    bits,
                    got,
                    want
                );
            }
        }
    }
}
