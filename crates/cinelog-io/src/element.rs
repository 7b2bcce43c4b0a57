//! Image element description.
//!
//! A file carries up to eight elements, each a planar group of one to
//! four channels with its own bit depth, packing and transfer curve.
//! The enums here model the wire identifiers of SMPTE 268M so the
//! dispatch over them stays exhaustive.

/// Container format an element came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Kodak Cineon.
    Cineon,
    /// DPX (SMPTE 268M).
    Dpx,
}

/// Channel content of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// Red plane.
    Red,
    /// Green plane.
    Green,
    /// Blue plane.
    Blue,
    /// Alpha plane.
    Alpha,
    /// Luma (Y') plane.
    Luminance,
    /// Chroma (Cb or Cr) plane.
    Chrominance,
    /// Interleaved RGB.
    Rgb,
    /// Interleaved RGBA.
    Rgba,
    /// Interleaved ABGR.
    Abgr,
    /// 4:2:2 Cb,Y,Cr,Y.
    CbYCrY,
    /// 4:2:2:4 Cb,Y,A,Cr,Y,A.
    CbYACrYA,
    /// 4:4:4 Cb,Y,Cr.
    CbYCr,
    /// 4:4:4:4 Cb,Y,Cr,A.
    CbYCrA,
    /// Luma plus alpha; synthesized during assembly, never on disk.
    Ya,
    /// Depth (Z) plane, not imaged.
    Depth,
    /// Composite video, not imaged.
    Composite,
}

impl Descriptor {
    /// Maps a DPX wire descriptor code.
    pub fn from_dpx_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            3 => Some(Self::Blue),
            4 => Some(Self::Alpha),
            6 => Some(Self::Luminance),
            7 => Some(Self::Chrominance),
            8 => Some(Self::Depth),
            9 => Some(Self::Composite),
            50 => Some(Self::Rgb),
            51 => Some(Self::Rgba),
            52 => Some(Self::Abgr),
            100 => Some(Self::CbYCrY),
            101 => Some(Self::CbYACrYA),
            102 => Some(Self::CbYCr),
            103 => Some(Self::CbYCrA),
            _ => None,
        }
    }

    /// DPX wire descriptor code.
    pub fn dpx_code(&self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Green => 2,
            Self::Blue => 3,
            Self::Alpha => 4,
            Self::Luminance => 6,
            Self::Chrominance => 7,
            Self::Depth => 8,
            Self::Composite => 9,
            Self::Rgb => 50,
            Self::Rgba => 51,
            Self::Abgr => 52,
            Self::CbYCrY => 100,
            Self::CbYACrYA => 101,
            Self::CbYCr => 102,
            Self::CbYCrA => 103,
            // Assembly-only, never written.
            Self::Ya => 0,
        }
    }

    /// Samples this descriptor stores per pixel.
    ///
    /// Subsampled chroma layouts average their samples over the pixel
    /// pair, so CbYCrY carries 2 and CbYACrYA carries 3.
    pub fn channels(&self) -> u32 {
        match self {
            Self::Red
            | Self::Green
            | Self::Blue
            | Self::Alpha
            | Self::Luminance
            | Self::Chrominance
            | Self::Depth => 1,
            Self::CbYCrY | Self::Ya => 2,
            Self::Rgb | Self::CbYCr | Self::CbYACrYA => 3,
            Self::Rgba | Self::Abgr | Self::CbYCrA => 4,
            Self::Composite => 2,
        }
    }

    /// True for planes that never participate in image assembly.
    #[inline]
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, Self::Depth | Self::Composite)
    }
}

/// Photometric transfer curve identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// No transfer recorded.
    Unspecified,
    /// User defined, treated as already display-referred.
    UserDefined,
    /// Linear light.
    Linear,
    /// Generic logarithmic.
    Logarithmic,
    /// Film printing density.
    PrintingDensity,
    /// SMPTE 240M component video.
    Smpte240m,
    /// ITU-R/CCIR 709-1 component video.
    Ccir709,
    /// ITU-R/CCIR 601 (625-line) component video.
    Ccir601,
    /// ITU-R/CCIR 601 (525-line) component video; same matrix as 601.
    Ccir601Ntsc,
}

impl Transfer {
    /// Maps a DPX wire transfer code.
    pub fn from_dpx_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::UserDefined),
            1 => Some(Self::PrintingDensity),
            2 => Some(Self::Linear),
            3 => Some(Self::Logarithmic),
            4 => Some(Self::Unspecified),
            5 => Some(Self::Smpte240m),
            6 => Some(Self::Ccir709),
            7 => Some(Self::Ccir601),
            8 => Some(Self::Ccir601Ntsc),
            _ => None,
        }
    }

    /// DPX wire transfer code.
    pub fn dpx_code(&self) -> u8 {
        match self {
            Self::UserDefined => 0,
            Self::PrintingDensity => 1,
            Self::Linear => 2,
            Self::Logarithmic => 3,
            Self::Unspecified => 4,
            Self::Smpte240m => 5,
            Self::Ccir709 => 6,
            Self::Ccir601 => 7,
            Self::Ccir601Ntsc => 8,
        }
    }
}

/// How samples narrower than a word sit inside 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Samples straddle word boundaries; no padding bits.
    Packed,
    /// Samples aligned within each word, padding at the LSB end.
    FilledLsb,
    /// Samples aligned within each word, padding at the MSB end.
    FilledMsb,
}

impl Packing {
    /// Maps a DPX wire packing code.
    pub fn from_dpx_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Packed),
            1 => Some(Self::FilledLsb),
            2 => Some(Self::FilledMsb),
            _ => None,
        }
    }

    /// DPX wire packing code.
    pub fn dpx_code(&self) -> u16 {
        match self {
            Self::Packed => 0,
            Self::FilledLsb => 1,
            Self::FilledMsb => 2,
        }
    }
}

/// One planar channel group of an open file.
#[derive(Debug, Clone)]
pub struct Element {
    /// Channel content.
    pub descriptor: Descriptor,
    /// Transfer curve of the stored samples.
    pub transfer: Transfer,
    /// Samples per pixel in this element.
    pub depth: u32,
    /// Bits per sample: 1, 8, 10, 12 or 16.
    pub bits_per_sample: u32,
    /// Word packing of sub-word samples.
    pub packing: Packing,
    /// Byte offset of this element's pixel data.
    pub data_offset: u32,
    /// Code value mapped to 0.0 (and chroma floor for Y'CbCr).
    pub ref_low_data: u32,
    /// Code value mapped to 1.0.
    pub ref_high_data: u32,
    /// Reference density at the low code.
    pub ref_low_quantity: f32,
    /// Reference density at the high code.
    pub ref_high_quantity: f32,
    /// Largest code value, `(1 << bits_per_sample) - 1`.
    pub max_value: u32,
}

impl Element {
    /// Bytes per row of this element's on-disk layout.
    ///
    /// Rows of sub-word layouts are padded up to a multiple of four
    /// bytes; 12-bit filled and 16-bit rows are plain 16-bit streams.
    pub fn row_length(&self, width: u32) -> usize {
        let samples = width as usize * self.depth as usize;
        match (self.bits_per_sample, self.packing) {
            (1, _) => ((samples - 1) / 32 + 1) * 4,
            (8, _) => ((samples - 1) / 4 + 1) * 4,
            (10, Packing::Packed) => ((samples * 10 - 1) / 32 + 1) * 4,
            (10, _) => ((samples - 1) / 3 + 1) * 4,
            (12, Packing::Packed) => ((samples * 12 - 1) / 32 + 1) * 4,
            (12, _) => samples * 2,
            (16, _) => samples * 2,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(bits: u32, packing: Packing, depth: u32) -> Element {
        Element {
            descriptor: Descriptor::Rgb,
            transfer: Transfer::Linear,
            depth,
            bits_per_sample: bits,
            packing,
            data_offset: 0,
            ref_low_data: 0,
            ref_high_data: (1 << bits) - 1,
            ref_low_quantity: 0.0,
            ref_high_quantity: 2.048,
            max_value: (1 << bits) - 1,
        }
    }

    #[test]
    fn test_row_length() {
        // 1920x RGB, the common film scan widths
        assert_eq!(element(10, Packing::FilledLsb, 3).row_length(1920), 7680);
        assert_eq!(element(10, Packing::Packed, 3).row_length(1920), 7200);
        assert_eq!(element(8, Packing::FilledLsb, 3).row_length(1920), 5760);
        assert_eq!(element(16, Packing::FilledLsb, 3).row_length(1920), 11520);

        // Odd widths exercise the padding
        assert_eq!(element(8, Packing::Packed, 3).row_length(1), 4);
        assert_eq!(element(10, Packing::FilledLsb, 3).row_length(1), 4);
        assert_eq!(element(10, Packing::FilledLsb, 3).row_length(2), 8);
        assert_eq!(element(10, Packing::Packed, 1).row_length(5), 8);
        assert_eq!(element(12, Packing::Packed, 3).row_length(1), 8);
        assert_eq!(element(12, Packing::FilledLsb, 3).row_length(1), 6);
        assert_eq!(element(1, Packing::Packed, 1).row_length(33), 8);
        assert_eq!(element(1, Packing::Packed, 1).row_length(32), 4);
    }

    #[test]
    fn test_descriptor_codes() {
        for code in [1u8, 2, 3, 4, 6, 7, 8, 9, 50, 51, 52, 100, 101, 102, 103] {
            let d = Descriptor::from_dpx_code(code).unwrap();
            assert_eq!(d.dpx_code(), code);
        }
        assert!(Descriptor::from_dpx_code(5).is_none());
        assert!(Descriptor::from_dpx_code(104).is_none());
    }

    #[test]
    fn test_transfer_codes() {
        for code in 0u8..=8 {
            let t = Transfer::from_dpx_code(code).unwrap();
            assert_eq!(t.dpx_code(), code);
        }
        assert!(Transfer::from_dpx_code(9).is_none());
    }

    #[test]
    fn test_descriptor_channels() {
        assert_eq!(Descriptor::Red.channels(), 1);
        assert_eq!(Descriptor::Rgb.channels(), 3);
        assert_eq!(Descriptor::Rgba.channels(), 4);
        assert_eq!(Descriptor::CbYCrY.channels(), 2);
        assert_eq!(Descriptor::CbYACrYA.channels(), 3);
        assert!(Descriptor::Depth.is_auxiliary());
        assert!(Descriptor::Composite.is_auxiliary());
        assert!(!Descriptor::Alpha.is_auxiliary());
    }
}
