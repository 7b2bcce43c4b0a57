//! The open-file handle and top-level read/write orchestration.
//!
//! A [`LogImage`] owns the byte stream of one container. Reading
//! decodes every imageable element to float planes, assembles planar
//! files into a single interleaved element, and color-converts to
//! RGBA. Writing runs the same pipeline backwards against the first
//! element, which is the only one a created file carries.

use crate::convert::{self, ColorSpec};
use crate::detect::Format;
use crate::element::{Element, SourceFormat};
use crate::io::ReadSeek;
use crate::{cineon, dpx, merge, pack, unpack, IoError, IoResult};
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

/// Byte stream behind a handle; reading and writing are exclusive.
pub(crate) enum Stream {
    Reader(Box<dyn ReadSeek>),
    Writer(BufWriter<File>),
}

/// Options for creating a new file.
///
/// The `Default` value describes the common film master: a 10-bit
/// big-endian DPX with printing-density RGB.
///
/// # Example
///
/// ```rust,no_run
/// use cinelog_io::{CreateOptions, LogImage, SourceFormat};
///
/// let mut file = LogImage::create(
///     "out.dpx",
///     &CreateOptions {
///         width: 1920,
///         height: 1080,
///         ..Default::default()
///     },
/// )?;
/// # Ok::<(), cinelog_io::IoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Container format to write.
    pub format: SourceFormat,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Bits per sample: 8, 10, 12 or 16.
    pub bits_per_sample: u32,
    /// Store printing density rather than linear code values.
    /// Ignored for Cineon, which is always printing density.
    pub logarithmic: bool,
    /// Add an alpha channel (DPX only).
    pub alpha: bool,
    /// Reference white code value; `None` picks 685 scaled to the
    /// code range. Ignored for Cineon.
    pub reference_white: Option<f32>,
    /// Reference black code value; `None` picks 95 scaled to the
    /// code range. Ignored for Cineon.
    pub reference_black: Option<f32>,
    /// Display gamma of the film curve; `None` picks 1.7.
    /// Ignored for Cineon.
    pub gamma: Option<f32>,
    /// Creator string recorded in the header.
    pub creator: String,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            format: SourceFormat::Dpx,
            width: 0,
            height: 0,
            bits_per_sample: 10,
            logarithmic: true,
            alpha: false,
            reference_white: None,
            reference_black: None,
            gamma: None,
            creator: "cinelog".to_string(),
        }
    }
}

/// An open Cineon or DPX file.
///
/// Handles are created by [`LogImage::open`], [`LogImage::open_from_memory`]
/// or [`LogImage::create`] and release their byte stream on drop.
pub struct LogImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Channel count of the assembled image, 1 to 4.
    pub(crate) depth: u32,
    pub(crate) elements: SmallVec<[Element; 8]>,
    pub(crate) big_endian: bool,
    pub(crate) format: SourceFormat,
    pub(crate) reference_black: f32,
    pub(crate) reference_white: f32,
    pub(crate) gamma: f32,
    pub(crate) stream: Stream,
}

impl LogImage {
    /// Opens a file for reading, sniffing the format from its magic.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, carries neither
    /// magic number, or its header is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_stream(Box::new(BufReader::new(file)))
    }

    /// Opens an in-memory file for reading.
    pub fn open_from_memory(data: &[u8]) -> IoResult<Self> {
        Self::from_stream(Box::new(Cursor::new(data.to_vec())))
    }

    fn from_stream(mut reader: Box<dyn ReadSeek>) -> IoResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        match Format::from_bytes(&magic) {
            Format::Dpx => dpx::open(reader),
            Format::Cineon => cineon::open(reader),
            Format::Unknown => Err(IoError::InvalidFile(
                "neither a DPX nor a Cineon magic number".to_string(),
            )),
        }
    }

    /// Creates a new file for writing.
    ///
    /// The header is written immediately; pixel data follows via
    /// [`write_rgba`](Self::write_rgba).
    pub fn create<P: AsRef<Path>>(path: P, options: &CreateOptions) -> IoResult<Self> {
        if options.width == 0 || options.height == 0 {
            return Err(IoError::EncodeError(format!(
                "invalid image size {}x{}",
                options.width, options.height
            )));
        }
        match options.format {
            SourceFormat::Cineon => cineon::create(path.as_ref(), options),
            SourceFormat::Dpx => dpx::create(path.as_ref(), options),
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the assembled image (1 to 4).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Container format of this handle.
    #[inline]
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// True when the file stores big-endian words.
    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// The file's image elements in header order.
    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Decodes the whole image to RGBA floats.
    ///
    /// The result holds `width * height * 4` samples in [0, 1] with
    /// alpha 1.0 where the file has none. With `dst_is_linear` the
    /// color channels are converted from display-referred to linear
    /// light.
    ///
    /// # Errors
    ///
    /// Fails on any unsupported descriptor, transfer or bit layout,
    /// and on short reads; no partial output is returned.
    pub fn read_rgba(&mut self, dst_is_linear: bool) -> IoResult<Vec<f32>> {
        let dpx_luma_layout = self.format == SourceFormat::Dpx && self.depth == 1;
        let reader = match &mut self.stream {
            Stream::Reader(reader) => reader,
            Stream::Writer(_) => {
                return Err(IoError::UnsupportedOperation(
                    "file was opened for writing".to_string(),
                ))
            }
        };

        let mut planes: Vec<Option<Vec<f32>>> = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            if element.descriptor.is_auxiliary() {
                planes.push(None);
                continue;
            }
            planes.push(Some(unpack::read_element(
                reader.as_mut(),
                element,
                self.width,
                self.height,
                self.big_endian,
                dpx_luma_layout,
            )?));
        }

        if self.elements.len() == 1 {
            let plane = planes[0].take().ok_or_else(|| {
                IoError::UnsupportedFormat("only auxiliary elements present".to_string())
            })?;
            let spec = self.color_spec(&self.elements[0]);
            convert::element_to_rgba(&spec, &plane, dst_is_linear)
        } else {
            let (merged, data) = merge::merge_elements(
                self.width,
                self.height,
                self.depth,
                &self.elements,
                &planes,
            )?;
            let spec = self.color_spec(&merged);
            convert::element_to_rgba(&spec, &data, dst_is_linear)
        }
    }

    /// Encodes RGBA floats into the file's first element.
    ///
    /// `data` must hold `width * height * 4` samples. With
    /// `src_is_linear` the color channels are first encoded to
    /// display-referred values. Only RGB and RGBA elements are
    /// writable.
    pub fn write_rgba(&mut self, data: &[f32], src_is_linear: bool) -> IoResult<()> {
        let expected = (self.width * self.height * 4) as usize;
        if data.len() != expected {
            return Err(IoError::DimensionMismatch {
                expected: format!("{} samples", expected),
                actual: format!("{} samples", data.len()),
            });
        }

        let element = self.elements[0].clone();
        let spec = self.color_spec(&element);
        let element_data = convert::rgba_to_element(&spec, data, src_is_linear)?;

        let writer = match &mut self.stream {
            Stream::Writer(writer) => writer,
            Stream::Reader(_) => {
                return Err(IoError::UnsupportedOperation(
                    "file was opened for reading".to_string(),
                ))
            }
        };
        pack::write_element(
            writer,
            &element,
            self.width,
            self.height,
            self.big_endian,
            &element_data,
        )?;
        writer.flush()?;
        Ok(())
    }

    fn color_spec<'e>(&self, element: &'e Element) -> ColorSpec<'e> {
        ColorSpec {
            width: self.width,
            height: self.height,
            reference_black: self.reference_black,
            reference_white: self.reference_white,
            gamma: self.gamma,
            element,
        }
    }
}

impl std::fmt::Debug for LogImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("format", &self.format)
            .field("big_endian", &self.big_endian)
            .field("elements", &self.elements.len())
            .finish()
    }
}
