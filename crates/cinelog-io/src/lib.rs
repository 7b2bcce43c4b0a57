//! # cinelog-io
//!
//! Reading and writing of the film-scan still image containers used
//! in cinema post-production:
//!
//! - **DPX** - SMPTE 268M, the digital-intermediate interchange format
//! - **Cineon** - the original Kodak film scanner format
//!
//! Both store bit-packed integer code values (commonly 10 bits in
//! printing density) across one or more planar or interleaved image
//! elements. This crate decodes any supported element layout to a
//! canonical RGBA float image and encodes RGB/RGBA back.
//!
//! # Architecture
//!
//! - [`LogImage`] - An open file handle: `open`/`create`,
//!   [`read_rgba`](LogImage::read_rgba) / [`write_rgba`](LogImage::write_rgba)
//! - [`read`] / [`write`] - High-level functions over [`RgbaImage`]
//!   with format auto-detection
//! - [`Format`] - Magic-number and extension detection
//!
//! Decoding runs unpack -> assemble -> color convert: each element's
//! bit layout is expanded to dense float planes, planar elements are
//! merged into one interleaved element, and the element's descriptor
//! and transfer pick the conversion to RGBA (printing-density LUTs,
//! Y'CbCr matrixing, or plain channel reordering). Encoding is the
//! mirror image, restricted to RGB/RGBA elements.
//!
//! # Quick Start
//!
//! ```ignore
//! use cinelog_io::{read, write, CreateOptions};
//!
//! // Read any supported format (auto-detected) as linear RGBA
//! let image = read("scan.0001.dpx")?;
//! println!("Size: {}x{}", image.width, image.height);
//!
//! // Write it back as a 10-bit log DPX
//! write("out.0001.dpx", &image, &CreateOptions::default())?;
//! ```
//!
//! # Format-Specific Usage
//!
//! ```ignore
//! use cinelog_io::{CreateOptions, LogImage, SourceFormat};
//!
//! // Open with full control over the colorimetry flags
//! let mut file = LogImage::open("scan.0001.cin")?;
//! let rgba = file.read_rgba(/* dst_is_linear */ false)?;
//!
//! // Create a 16-bit linear DPX with alpha
//! let mut out = LogImage::create(
//!     "comp.dpx",
//!     &CreateOptions {
//!         width: 2048,
//!         height: 1556,
//!         bits_per_sample: 16,
//!         logarithmic: false,
//!         alpha: true,
//!         ..Default::default()
//!     },
//! )?;
//! out.write_rgba(&rgba, false)?;
//! ```
//!
//! # Supported Layouts
//!
//! | | Read | Write |
//! |--------|------|-------|
//! | Bits per sample | 1, 8, 10, 12, 16 | 8, 10, 12, 16 |
//! | Packing | packed, filled (LSB/MSB pad) | filled (LSB pad) |
//! | Descriptors | R/G/B/A planes, Y, CbCr, RGB, RGBA, ABGR, CbYCr variants | RGB, RGBA |
//! | Transfers | linear, log, printing density, user, 240M/709/601 (Y'CbCr) | linear, printing density |
//!
//! Run-length encoded DPX files are not supported, nor is writing
//! Y'CbCr or ABGR layouts.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cineon;
mod convert;
mod detect;
mod dpx;
mod element;
mod error;
mod io;
mod logimage;
mod merge;
mod pack;
mod unpack;

// Re-exports
pub use detect::Format;
pub use element::{Descriptor, Element, Packing, SourceFormat, Transfer};
pub use error::{IoError, IoResult};
pub use io::ReadSeek;
pub use logimage::{CreateOptions, LogImage};

use std::path::Path;

/// A decoded image: linear-light RGBA floats.
///
/// The container type of the high-level [`read`] and [`write`]
/// functions; `data` holds `width * height * 4` samples in [0, 1].
#[derive(Debug, Clone)]
pub struct RgbaImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Interleaved RGBA samples, `width * height * 4` floats.
    pub data: Vec<f32>,
}

impl RgbaImage {
    /// Creates a black, fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width * height * 4) as usize],
        }
    }

    /// Wraps existing sample data.
    ///
    /// # Errors
    ///
    /// Fails if `data` is not `width * height * 4` samples long.
    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> IoResult<Self> {
        let expected = (width * height * 4) as usize;
        if data.len() != expected {
            return Err(IoError::DimensionMismatch {
                expected: format!("{} samples", expected),
                actual: format!("{} samples", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

/// Reads a Cineon or DPX file as linear RGBA.
///
/// The format is detected from the magic number; use
/// [`LogImage::open`] for display-referred output or access to the
/// element metadata.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not a supported
/// container, or uses an unsupported element layout.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<RgbaImage> {
    let mut file = LogImage::open(path)?;
    let data = file.read_rgba(true)?;
    Ok(RgbaImage {
        width: file.width(),
        height: file.height(),
        data,
    })
}

/// Writes linear RGBA to a Cineon or DPX file.
///
/// The `width` and `height` in `options` are taken from the image.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the options name
/// an unsupported layout.
pub fn write<P: AsRef<Path>>(path: P, image: &RgbaImage, options: &CreateOptions) -> IoResult<()> {
    let options = CreateOptions {
        width: image.width,
        height: image.height,
        ..options.clone()
    };
    let mut file = LogImage::create(path, &options)?;
    file.write_rgba(&image.data, true)
}
