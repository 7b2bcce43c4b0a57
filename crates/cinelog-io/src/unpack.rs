//! Bit-unpack engines.
//!
//! Each function turns one element's on-disk layout into a dense
//! stream of `width * height * depth` float samples in [0, 1],
//! row-major and channel-interleaved, each computed as
//! `code / max_value`.
//!
//! Rows of the 8-bit and packed layouts are padded to 32-bit
//! boundaries, so those readers reposition at every row start; the
//! filled layouts restart their word accumulator per row instead,
//! which discards the same padding without a seek.

use crate::element::{Element, Packing};
use crate::io::{read_u32, ReadSeek};
use crate::{IoError, IoResult};
use std::io::{Read, Seek, SeekFrom};

/// Reads one element's samples as normalized floats.
///
/// The reader may be positioned anywhere; every path seeks to the
/// element's data offset itself. `dpx_luma_layout` selects the DPX
/// single-channel 10-bit word convention and is set only when the
/// file is a DPX with an assembled depth of one.
pub(crate) fn read_element<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    dpx_luma_layout: bool,
) -> IoResult<Vec<f32>> {
    match (element.bits_per_sample, element.packing) {
        (1, _) => read_1bit(reader, element, width, height, big_endian),
        (8, _) => read_8bit(reader, element, width, height),
        (10, Packing::Packed) => read_10bit_packed(reader, element, width, height, big_endian),
        (10, _) => read_10bit_filled(
            reader,
            element,
            width,
            height,
            big_endian,
            dpx_luma_layout,
        ),
        (12, Packing::Packed) => read_12bit_packed(reader, element, width, height, big_endian),
        (12, _) => read_12bit_filled(reader, element, width, height, big_endian),
        (16, _) => read_16bit(reader, element, width, height, big_endian),
        (bits, packing) => Err(IoError::UnsupportedFormat(format!(
            "{} bits per sample with packing {:?}",
            bits, packing
        ))),
    }
}

/// 1-bit samples, each row padded to a whole number of 32-bit words.
fn read_1bit<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
) -> IoResult<Vec<f32>> {
    let row_samples = (width * element.depth) as usize;
    let mut data = Vec::with_capacity(row_samples * height as usize);

    reader.seek(SeekFrom::Start(element.data_offset as u64))?;

    for _ in 0..height {
        let mut x = 0;
        while x < row_samples {
            let word = read_u32(reader, big_endian)?;
            for bit in 0..32 {
                if x + bit >= row_samples {
                    break;
                }
                data.push(((word >> bit) & 0x1) as f32);
            }
            x += 32;
        }
    }
    Ok(data)
}

/// 8-bit samples; rows are padded to 32 bits, skipped by seeking.
fn read_8bit<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
) -> IoResult<Vec<f32>> {
    let row_samples = (width * element.depth) as usize;
    let row_length = element.row_length(width) as u64;
    let mut data = Vec::with_capacity(row_samples * height as usize);
    let mut row = vec![0u8; row_samples];

    for y in 0..height as u64 {
        reader.seek(SeekFrom::Start(element.data_offset as u64 + y * row_length))?;
        reader.read_exact(&mut row)?;
        data.extend(row.iter().map(|&v| v as f32 / 255.0));
    }
    Ok(data)
}

/// 10-bit samples filled three to a word.
///
/// The general layout walks each word downward from the first sample's
/// shift (22 with LSB padding, 20 with MSB padding). DPX single-channel
/// files store the same words in the opposite order, walking upward
/// from 2 or 0.
fn read_10bit_filled<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    dpx_luma_layout: bool,
) -> IoResult<Vec<f32>> {
    let row_samples = (width * element.depth) as usize;
    let mut data = Vec::with_capacity(row_samples * height as usize);

    reader.seek(SeekFrom::Start(element.data_offset as u64))?;

    if dpx_luma_layout {
        for _ in 0..height {
            let mut shift = 32i32;
            let mut word = 0u32;
            for _ in 0..row_samples {
                if shift >= 30 {
                    shift = match element.packing {
                        Packing::FilledLsb => 2,
                        _ => 0,
                    };
                    word = read_u32(reader, big_endian)?;
                }
                data.push(((word >> shift) & 0x3FF) as f32 / 1023.0);
                shift += 10;
            }
        }
    } else {
        for _ in 0..height {
            let mut shift = -1i32;
            let mut word = 0u32;
            for _ in 0..row_samples {
                if shift < 0 {
                    shift = match element.packing {
                        Packing::FilledLsb => 22,
                        _ => 20,
                    };
                    word = read_u32(reader, big_endian)?;
                }
                data.push(((word >> shift) & 0x3FF) as f32 / 1023.0);
                shift -= 10;
            }
        }
    }
    Ok(data)
}

/// 10-bit samples packed without padding bits.
///
/// Samples fill each word from bit 0 upward and may straddle two
/// words; the straddled sample takes its low bits from the old word's
/// top and its high bits from the fresh word's bottom. The accumulator
/// restarts at every row so row-tail padding bits are never consumed.
fn read_10bit_packed<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
) -> IoResult<Vec<f32>> {
    read_packed(reader, element, width, height, big_endian, 10, 0x3FF, 1023.0)
}

/// 12-bit packed layout; same walk as 10-bit with a wider field.
fn read_12bit_packed<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
) -> IoResult<Vec<f32>> {
    read_packed(reader, element, width, height, big_endian, 12, 0xFFF, 4095.0)
}

fn read_packed<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
    bits: u32,
    mask: u32,
    max: f32,
) -> IoResult<Vec<f32>> {
    let row_samples = (width * element.depth) as usize;
    let row_length = element.row_length(width) as u64;
    let mut data = Vec::with_capacity(row_samples * height as usize);

    for y in 0..height as u64 {
        reader.seek(SeekFrom::Start(element.data_offset as u64 + y * row_length))?;

        let mut word = 0u32;
        let mut low_bits = 0u32;
        let mut offset = 0u32;
        let mut spill = 0u32;

        for _ in 0..row_samples {
            if spill != 0 {
                // The previous sample ended partway into this word.
                offset = bits - spill;
                spill = 0;
                low_bits = 0;
            } else if offset == 32 {
                offset = 0;
            } else if offset + bits > 32 {
                // Sample straddles two words: carry the tail bits.
                low_bits = word >> offset;
                spill = 32 - offset;
                offset = 0;
            }

            if offset == 0 {
                word = read_u32(reader, big_endian)?;
            }
            let code = (((word << spill) >> offset) & mask) | low_bits;
            data.push(code as f32 / max);
            offset += bits;
        }
    }
    Ok(data)
}

/// 12-bit samples filled one per 16-bit slot.
fn read_12bit_filled<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
) -> IoResult<Vec<f32>> {
    let num_samples = (width * height * element.depth) as usize;
    let mut data = Vec::with_capacity(num_samples);

    reader.seek(SeekFrom::Start(element.data_offset as u64))?;

    for _ in 0..num_samples {
        let code = crate::io::read_u16(reader, big_endian)?;
        let code = match element.packing {
            Packing::FilledMsb => code & 0xFFF,
            _ => code >> 4,
        };
        data.push(code as f32 / 4095.0);
    }
    Ok(data)
}

/// 16-bit samples, a plain endian-sensitive stream.
fn read_16bit<R: ReadSeek + ?Sized>(
    reader: &mut R,
    element: &Element,
    width: u32,
    height: u32,
    big_endian: bool,
) -> IoResult<Vec<f32>> {
    let num_samples = (width * height * element.depth) as usize;
    let mut data = Vec::with_capacity(num_samples);

    reader.seek(SeekFrom::Start(element.data_offset as u64))?;

    for _ in 0..num_samples {
        let code = crate::io::read_u16(reader, big_endian)?;
        data.push(code as f32 / 65535.0);
    }
    Ok(data)
}
