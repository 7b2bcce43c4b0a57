//! # cinelog-transfer
//!
//! Transfer functions and code-indexed lookup tables for film log
//! image formats (Cineon, DPX).
//!
//! Film scans store printing density: the logarithm of the negative's
//! transmittance, quantized to integer code values. Converting between
//! density codes and linear (or sRGB) light requires the film
//! characteristic curve plus the display transfer, and because the
//! code space is small (at most 16 bits) both directions are applied
//! through precomputed per-code tables.
//!
//! # Supported Transfer Functions
//!
//! | Function | Use Case | Range |
//! |----------|----------|-------|
//! | [`srgb`] | Display encoding of decoded scans | [0, 1] |
//! | [`printing_density`] | Cineon/DPX film characteristic curve | code values |
//!
//! # Usage
//!
//! ```rust
//! use cinelog_transfer::{srgb, CodeLut, FilmCurve};
//!
//! // Decode sRGB to linear
//! let linear = srgb::eotf(0.5);
//!
//! // Standard 10-bit film curve (black 95, white 685, gamma 1.7)
//! let curve = FilmCurve::new(95.0, 685.0, 1.7, 2.048, 1023);
//! let lut = CodeLut::log_to_lin(&curve);
//! let light = lut.lookup(685.0 / 1023.0);
//! assert!((light - 1.0).abs() < 1e-4);
//! ```
//!
//! # Used By
//!
//! - `cinelog-io` - Cineon/DPX file encoding and decoding

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod lut;
pub mod printing_density;
pub mod srgb;

// Re-export common types
pub use lut::{float_to_code, CodeLut};
pub use printing_density::FilmCurve;
pub use srgb::{eotf as srgb_eotf, oetf as srgb_oetf};
