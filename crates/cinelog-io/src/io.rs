//! Endian-aware primitive reads and writes.
//!
//! Both containers declare their word order in the magic number, so
//! every multi-byte field goes through these helpers with the file's
//! `big_endian` flag. Host endianness never enters the picture.

use crate::IoResult;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{Read, Seek, Write};

/// Combined trait bound for readers (Read + Seek).
///
/// Required for random-access parsing of file headers and per-row
/// repositioning in the pixel data. Automatically implemented for any
/// type that implements both traits.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub(crate) fn read_u8<R: Read + ?Sized>(reader: &mut R) -> IoResult<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16<R: Read + ?Sized>(reader: &mut R, big_endian: bool) -> IoResult<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(if big_endian {
        BigEndian::read_u16(&buf)
    } else {
        LittleEndian::read_u16(&buf)
    })
}

pub(crate) fn read_u32<R: Read + ?Sized>(reader: &mut R, big_endian: bool) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(if big_endian {
        BigEndian::read_u32(&buf)
    } else {
        LittleEndian::read_u32(&buf)
    })
}

pub(crate) fn read_f32<R: Read + ?Sized>(reader: &mut R, big_endian: bool) -> IoResult<f32> {
    Ok(f32::from_bits(read_u32(reader, big_endian)?))
}

pub(crate) fn write_u16<W: Write + ?Sized>(
    writer: &mut W,
    value: u16,
    big_endian: bool,
) -> IoResult<()> {
    let mut buf = [0u8; 2];
    if big_endian {
        BigEndian::write_u16(&mut buf, value);
    } else {
        LittleEndian::write_u16(&mut buf, value);
    }
    writer.write_all(&buf)?;
    Ok(())
}

pub(crate) fn write_u32<W: Write + ?Sized>(
    writer: &mut W,
    value: u32,
    big_endian: bool,
) -> IoResult<()> {
    let mut buf = [0u8; 4];
    if big_endian {
        BigEndian::write_u32(&mut buf, value);
    } else {
        LittleEndian::write_u32(&mut buf, value);
    }
    writer.write_all(&buf)?;
    Ok(())
}

pub(crate) fn write_f32<W: Write + ?Sized>(
    writer: &mut W,
    value: f32,
    big_endian: bool,
) -> IoResult<()> {
    write_u32(writer, value.to_bits(), big_endian)
}

/// Writes `text` into a fixed-size zero-padded field.
pub(crate) fn write_fixed_str<W: Write + ?Sized>(
    writer: &mut W,
    text: &str,
    len: usize,
) -> IoResult<()> {
    let mut buf = vec![0u8; len];
    let bytes = text.as_bytes();
    let copy_len = bytes.len().min(len.saturating_sub(1));
    buf[..copy_len].copy_from_slice(&bytes[..copy_len]);
    writer.write_all(&buf)?;
    Ok(())
}

/// Writes `len` zero bytes of padding.
pub(crate) fn write_zeros<W: Write + ?Sized>(writer: &mut W, len: usize) -> IoResult<()> {
    writer.write_all(&vec![0u8; len])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_endian_reads() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_u32(&mut Cursor::new(&bytes), true).unwrap(), 0x12345678);
        assert_eq!(read_u32(&mut Cursor::new(&bytes), false).unwrap(), 0x78563412);
        assert_eq!(read_u16(&mut Cursor::new(&bytes), true).unwrap(), 0x1234);
        assert_eq!(read_u16(&mut Cursor::new(&bytes), false).unwrap(), 0x3412);
    }

    #[test]
    fn test_write_read_symmetry() {
        for &big_endian in &[true, false] {
            let mut buf = Vec::new();
            write_u32(&mut buf, 0xDEADBEEF, big_endian).unwrap();
            let back = read_u32(&mut Cursor::new(&buf), big_endian).unwrap();
            assert_eq!(back, 0xDEADBEEF);
        }
    }

    #[test]
    fn test_fixed_str_truncates_and_pads() {
        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "hello", 8).unwrap();
        assert_eq!(&buf, b"hello\0\0\0");

        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "hello", 4).unwrap();
        assert_eq!(&buf, b"hel\0");
    }
}
