//! Color conversion between element layouts and RGBA.
//!
//! Dispatches on the element descriptor: RGB family layouts reorder
//! channels (running printing-density samples through the film LUTs),
//! the Y'CbCr family goes through a transfer-dependent conversion
//! matrix scaled by the element's reference levels, and luma-only
//! layouts replicate Y across RGB. An optional final pass converts the
//! display-referred result to linear light (reads) or linear input to
//! display-referred values (writes) via the sRGB tables.

use crate::element::{Descriptor, Element, Transfer};
use crate::{IoError, IoResult};
use cinelog_transfer::{CodeLut, FilmCurve};

/// Everything the converters need to know about the image.
pub(crate) struct ColorSpec<'a> {
    pub width: u32,
    pub height: u32,
    pub reference_black: f32,
    pub reference_white: f32,
    pub gamma: f32,
    pub element: &'a Element,
}

impl ColorSpec<'_> {
    #[inline]
    fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    fn film_curve(&self) -> FilmCurve {
        FilmCurve::new(
            self.reference_black,
            self.reference_white,
            self.gamma,
            self.element.ref_high_quantity,
            self.element.max_value,
        )
    }

    fn ref_low(&self) -> f32 {
        self.element.ref_low_data as f32 / self.element.max_value as f32
    }
}

/// Converts decoded element samples to RGBA.
///
/// Output is `width * height * 4` floats; alpha defaults to 1.0 for
/// layouts without one. With `dst_is_linear` the display-referred
/// result is converted to linear light through the sRGB table.
pub(crate) fn element_to_rgba(
    spec: &ColorSpec,
    src: &[f32],
    dst_is_linear: bool,
) -> IoResult<Vec<f32>> {
    let mut dst = vec![0f32; spec.pixel_count() * 4];

    match spec.element.descriptor {
        Descriptor::Rgb => rgb_to_rgba(spec, src, &mut dst)?,
        Descriptor::Rgba => rgba_to_rgba(spec, src, &mut dst)?,
        Descriptor::Abgr => abgr_to_rgba(spec, src, &mut dst)?,
        Descriptor::Luminance => luma_to_rgba(spec, src, &mut dst, false)?,
        Descriptor::Ya => luma_to_rgba(spec, src, &mut dst, true)?,
        Descriptor::CbYCr => cbycr_to_rgba(spec, src, &mut dst, false)?,
        Descriptor::CbYCrA => cbycr_to_rgba(spec, src, &mut dst, true)?,
        Descriptor::CbYCrY => cbycry_to_rgba(spec, src, &mut dst, false)?,
        Descriptor::CbYACrYA => cbycry_to_rgba(spec, src, &mut dst, true)?,
        d => {
            return Err(IoError::UnsupportedFormat(format!(
                "cannot convert {:?} element to RGBA",
                d
            )))
        }
    }

    if dst_is_linear {
        let lut = CodeLut::srgb_to_lin(spec.element.max_value);
        for px in dst.chunks_exact_mut(4) {
            for c in px[..3].iter_mut() {
                *c = lut.lookup(*c);
            }
        }
    }
    Ok(dst)
}

/// Converts RGBA input to the first element's sample layout.
///
/// Only RGB and RGBA elements can be written. With `src_is_linear` the
/// input is first encoded through the sRGB table.
pub(crate) fn rgba_to_element(
    spec: &ColorSpec,
    src: &[f32],
    src_is_linear: bool,
) -> IoResult<Vec<f32>> {
    let prepared;
    let src = if src_is_linear {
        let lut = CodeLut::lin_to_srgb(spec.element.max_value);
        let mut work = src.to_vec();
        for px in work.chunks_exact_mut(4) {
            for c in px[..3].iter_mut() {
                *c = lut.lookup(*c);
            }
        }
        prepared = work;
        &prepared[..]
    } else {
        src
    };

    let pixels = spec.pixel_count();
    match spec.element.descriptor {
        Descriptor::Rgb => {
            let mut dst = vec![0f32; pixels * 3];
            match rgb_luts(spec, false)? {
                None => {
                    for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
                        out.copy_from_slice(&px[..3]);
                    }
                }
                Some(lut) => {
                    for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
                        for (o, &v) in out.iter_mut().zip(px[..3].iter()) {
                            *o = lut.lookup(v);
                        }
                    }
                }
            }
            Ok(dst)
        }
        Descriptor::Rgba => {
            let mut dst = vec![0f32; pixels * 4];
            match rgb_luts(spec, false)? {
                None => dst.copy_from_slice(src),
                Some(lut) => {
                    for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                        for (o, &v) in out[..3].iter_mut().zip(px[..3].iter()) {
                            *o = lut.lookup(v);
                        }
                        out[3] = px[3];
                    }
                }
            }
            Ok(dst)
        }
        d => Err(IoError::UnsupportedFormat(format!(
            "cannot write {:?} elements",
            d
        ))),
    }
}

/// Returns the film LUT for the element's transfer, `None` when the
/// samples pass through unchanged.
fn rgb_luts(spec: &ColorSpec, element_is_source: bool) -> IoResult<Option<CodeLut>> {
    match spec.element.transfer {
        Transfer::Unspecified
        | Transfer::UserDefined
        | Transfer::Linear
        | Transfer::Logarithmic => Ok(None),
        Transfer::PrintingDensity => {
            let curve = spec.film_curve();
            Ok(Some(if element_is_source {
                CodeLut::log_to_lin(&curve)
            } else {
                CodeLut::lin_to_log(&curve)
            }))
        }
        t => Err(IoError::UnsupportedFormat(format!(
            "unknown transfer {:?} for RGB data",
            t
        ))),
    }
}

fn rgb_to_rgba(spec: &ColorSpec, src: &[f32], dst: &mut [f32]) -> IoResult<()> {
    let lut = rgb_luts(spec, true)?;
    for (px, out) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        match &lut {
            None => out[..3].copy_from_slice(px),
            Some(lut) => {
                for (o, &v) in out[..3].iter_mut().zip(px.iter()) {
                    *o = lut.lookup(v);
                }
            }
        }
        out[3] = 1.0;
    }
    Ok(())
}

fn rgba_to_rgba(spec: &ColorSpec, src: &[f32], dst: &mut [f32]) -> IoResult<()> {
    match rgb_luts(spec, true)? {
        None => dst.copy_from_slice(src),
        Some(lut) => {
            for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                for (o, &v) in out[..3].iter_mut().zip(px[..3].iter()) {
                    *o = lut.lookup(v);
                }
                out[3] = px[3];
            }
        }
    }
    Ok(())
}

fn abgr_to_rgba(spec: &ColorSpec, src: &[f32], dst: &mut [f32]) -> IoResult<()> {
    let lut = rgb_luts(spec, true)?;
    for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let reversed = [px[3], px[2], px[1], px[0]];
        match &lut {
            None => out.copy_from_slice(&reversed),
            Some(lut) => {
                for (o, &v) in out[..3].iter_mut().zip(reversed[..3].iter()) {
                    *o = lut.lookup(v);
                }
                out[3] = reversed[3];
            }
        }
    }
    Ok(())
}

/// Y'CbCr to RGB conversion matrix, rows scaled by the element's
/// reference range. Laid out row-major as [R; G; B] rows of
/// (Y, Cb, Cr) coefficients.
fn ycbcr_matrix(element: &Element) -> IoResult<[f32; 9]> {
    if element.ref_high_data == element.ref_low_data {
        return Err(IoError::UnsupportedFormat(
            "Y'CbCr element with equal reference levels".to_string(),
        ));
    }
    let max = element.max_value as f32;
    let ref_high = element.ref_high_data as f32 / max;
    let ref_low = element.ref_low_data as f32 / max;
    let scale_y = 1.0 / (ref_high - ref_low);
    // Chroma excursion is 876/896 of the luma excursion.
    let scale_cbcr = scale_y * ((940.0 - 64.0) / (960.0 - 64.0));

    let mut m: [f32; 9] = match element.transfer {
        Transfer::Linear => [1.0; 9],
        Transfer::Smpte240m => [
            1.0, 0.0, 1.5756, //
            1.0, -0.2253, -0.5000, //
            1.0, 1.8270, 0.0,
        ],
        Transfer::Ccir709 => [
            1.0, 0.0, 1.574800, //
            1.0, -0.187324, -0.468124, //
            1.0, 1.855600, 0.0,
        ],
        Transfer::Ccir601 | Transfer::Ccir601Ntsc => [
            1.0, 0.0, 1.402000, //
            1.0, -0.344136, -0.714136, //
            1.0, 1.772000, 0.0,
        ],
        t => {
            return Err(IoError::UnsupportedFormat(format!(
                "unknown transfer {:?} for Y'CbCr data",
                t
            )))
        }
    };

    for row in m.chunks_exact_mut(3) {
        row[0] *= scale_y;
        row[1] *= scale_cbcr;
        row[2] *= scale_cbcr;
    }
    Ok(m)
}

#[inline]
fn matrix_rgb(m: &[f32; 9], y: f32, cb: f32, cr: f32) -> [f32; 3] {
    [
        (y * m[0] + cb * m[1] + cr * m[2]).clamp(0.0, 1.0),
        (y * m[3] + cb * m[4] + cr * m[5]).clamp(0.0, 1.0),
        (y * m[6] + cb * m[7] + cr * m[8]).clamp(0.0, 1.0),
    ]
}

fn cbycr_to_rgba(
    spec: &ColorSpec,
    src: &[f32],
    dst: &mut [f32],
    with_alpha: bool,
) -> IoResult<()> {
    let m = ycbcr_matrix(spec.element)?;
    let ref_low = spec.ref_low();
    let stride = if with_alpha { 4 } else { 3 };

    for (px, out) in src.chunks_exact(stride).zip(dst.chunks_exact_mut(4)) {
        let cb = px[0] - 0.5;
        let y = px[1] - ref_low;
        let cr = px[2] - 0.5;
        out[..3].copy_from_slice(&matrix_rgb(&m, y, cb, cr));
        out[3] = if with_alpha { px[3] } else { 1.0 };
    }
    Ok(())
}

/// 4:2:2 layouts: one Cb,Cr pair shared by two lumas, producing two
/// output pixels per group.
fn cbycry_to_rgba(
    spec: &ColorSpec,
    src: &[f32],
    dst: &mut [f32],
    with_alpha: bool,
) -> IoResult<()> {
    let m = ycbcr_matrix(spec.element)?;
    let ref_low = spec.ref_low();
    let stride = if with_alpha { 6 } else { 4 };

    for (group, out) in src.chunks_exact(stride).zip(dst.chunks_exact_mut(8)) {
        let (cb, y1, a1, cr, y2, a2) = if with_alpha {
            (group[0], group[1], group[2], group[3], group[4], group[5])
        } else {
            (group[0], group[1], 1.0, group[2], group[3], 1.0)
        };
        let cb = cb - 0.5;
        let cr = cr - 0.5;

        out[..3].copy_from_slice(&matrix_rgb(&m, y1 - ref_low, cb, cr));
        out[3] = a1;
        out[4..7].copy_from_slice(&matrix_rgb(&m, y2 - ref_low, cb, cr));
        out[7] = a2;
    }
    Ok(())
}

fn luma_to_rgba(
    spec: &ColorSpec,
    src: &[f32],
    dst: &mut [f32],
    with_alpha: bool,
) -> IoResult<()> {
    let m = ycbcr_matrix(spec.element)?;
    let ref_low = spec.ref_low();
    let stride = if with_alpha { 2 } else { 1 };

    for (px, out) in src.chunks_exact(stride).zip(dst.chunks_exact_mut(4)) {
        let value = ((px[0] - ref_low) * m[0]).clamp(0.0, 1.0);
        out[0] = value;
        out[1] = value;
        out[2] = value;
        out[3] = if with_alpha { px[1] } else { 1.0 };
    }
    Ok(())
}
