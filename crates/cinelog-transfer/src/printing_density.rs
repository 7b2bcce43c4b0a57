//! Printing-density transfer function.
//!
//! Film scanners record the density of the developed negative: each
//! code value is a fixed step of optical density, so code and exposure
//! are related logarithmically. The curve below is the Kodak Cineon
//! model, parameterized by the code values assigned to reference black
//! and reference white, a display gamma, and the density range covered
//! by the full code scale.
//!
//! # Range
//!
//! - Encoded: integer code values [0, max_value]
//! - Decoded: [0, 1] display-referred light
//!
//! # Reference
//!
//! Kodak Cineon 4.5 specification; SMPTE 268M annex on printing density

/// Gamma of camera negative film stock.
const NEGATIVE_FILM_GAMMA: f32 = 0.6;

/// Softness of the highlight roll-off, in code values. Zero disables
/// the knee entirely: the curve runs straight to reference white.
const SOFT_CLIP: f32 = 0.0;

/// The film printing-density characteristic curve.
///
/// Maps integer density codes to display light and back. The constants
/// derived at construction pin the curve so that `reference_black`
/// decodes to 0.0 and `reference_white` decodes to 1.0.
///
/// # Example
///
/// ```rust
/// use cinelog_transfer::FilmCurve;
///
/// // Standard 10-bit film curve
/// let curve = FilmCurve::new(95.0, 685.0, 1.7, 2.048, 1023);
/// assert!(curve.decode_code(95.0) < 1e-6);
/// assert!((curve.decode_code(685.0) - 1.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FilmCurve {
    reference_black: f32,
    reference_white: f32,
    gamma: f32,
    max_value: u32,
    /// Density increment per code value.
    step: f32,
    gain: f32,
    offset: f32,
    break_point: f32,
    knee_offset: f32,
    knee_gain: f32,
}

impl FilmCurve {
    /// Builds a curve from reference code values and density range.
    ///
    /// # Arguments
    ///
    /// * `reference_black` - Code value decoding to 0.0
    /// * `reference_white` - Code value decoding to 1.0
    /// * `gamma` - Display gamma (1.7 reproduces the curve unscaled)
    /// * `density_range` - Optical density spanned by the full code
    ///   scale (2.048 for Cineon/DPX)
    /// * `max_value` - Largest code value, `(1 << bits) - 1`
    pub fn new(
        reference_black: f32,
        reference_white: f32,
        gamma: f32,
        density_range: f32,
        max_value: u32,
    ) -> Self {
        let max = max_value as f32;
        let step = density_range / max;
        let break_point = reference_white - SOFT_CLIP;
        let gain = max
            / (1.0
                - 10f32.powf(
                    (reference_black - reference_white) * step / NEGATIVE_FILM_GAMMA * gamma / 1.7,
                ));
        let offset = gain - max;
        let knee_offset = 10f32
            .powf((break_point - reference_white) * step / NEGATIVE_FILM_GAMMA * gamma / 1.7)
            * gain
            - offset;
        // 0^0 is taken as 1 so a zero soft clip leaves the knee inert.
        let knee_gain = (max - knee_offset) / (5.0 * SOFT_CLIP).powf(SOFT_CLIP / 100.0);

        Self {
            reference_black,
            reference_white,
            gamma,
            max_value,
            step,
            gain,
            offset,
            break_point,
            knee_offset,
            knee_gain,
        }
    }

    /// Largest code value of the curve's code scale.
    #[inline]
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Decodes a density code to display light in [0, 1].
    ///
    /// Codes below reference black clip to 0.0; codes above the knee
    /// break point follow the soft-clip roll-off.
    pub fn decode_code(&self, code: f32) -> f32 {
        let max = self.max_value as f32;
        if code < self.reference_black {
            0.0
        } else if code > self.break_point {
            ((code - self.break_point).powf(SOFT_CLIP / 100.0) * self.knee_gain + self.knee_offset)
                / max
        } else {
            (10f32.powf(
                (code - self.reference_white) * self.step / NEGATIVE_FILM_GAMMA * self.gamma / 1.7,
            ) * self.gain
                - self.offset)
                / max
        }
    }

    /// Encodes a display-light code back to a density value.
    ///
    /// The input is a light level expressed on the code scale (so
    /// `code / max_value` is the [0, 1] light value); the output is the
    /// density value on the same scale, normalized to [0, 1].
    pub fn encode_code(&self, code: f32) -> f32 {
        let max = self.max_value as f32;
        (self.reference_white
            + ((code + self.offset) / self.gain)
                .powf(1.7 / self.gamma)
                .log10()
                / (self.step / NEGATIVE_FILM_GAMMA))
            / max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_curve() -> FilmCurve {
        FilmCurve::new(95.0, 685.0, 1.7, 2.048, 1023)
    }

    #[test]
    fn test_reference_points() {
        let curve = standard_curve();
        assert_eq!(curve.decode_code(0.0), 0.0);
        assert_eq!(curve.decode_code(94.0), 0.0);
        assert!(curve.decode_code(95.0).abs() < 1e-5);
        assert!((curve.decode_code(685.0) - 1.0).abs() < 1e-4);
        // Codes above reference white clip to full scale.
        assert!((curve.decode_code(686.0) - 1.0).abs() < 1e-4);
        assert!((curve.decode_code(1023.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_reference_black_any_gamma() {
        // The black point pins to zero independent of display gamma.
        let curve = FilmCurve::new(95.0, 685.0, 1.0, 2.048, 1023);
        assert!(curve.decode_code(95.0).abs() < 1e-5);
    }

    #[test]
    fn test_monotonic() {
        let curve = standard_curve();
        let mut prev = curve.decode_code(0.0);
        for i in 1..=1023 {
            let v = curve.decode_code(i as f32);
            assert!(v >= prev, "decreasing at code {}", i);
            prev = v;
        }
    }

    #[test]
    fn test_roundtrip() {
        let curve = standard_curve();
        // Between the reference points the curve is invertible.
        for i in 96..=685 {
            let light = curve.decode_code(i as f32) * 1023.0;
            let density = curve.encode_code(light) * 1023.0;
            assert!(
                (density - i as f32).abs() < 0.01,
                "code {} came back as {}",
                i,
                density
            );
        }
    }

    #[test]
    fn test_sixteen_bit_scale() {
        let curve = FilmCurve::new(6085.0, 43885.0, 1.7, 2.048, 65535);
        assert!(curve.decode_code(6085.0).abs() < 1e-5);
        assert!((curve.decode_code(43885.0) - 1.0).abs() < 1e-3);
    }
}
