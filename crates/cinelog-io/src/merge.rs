//! Planar element assembly.
//!
//! Files may split their channels across up to eight planar elements
//! (a red plane, a green plane, an alpha plane, ...). Before color
//! conversion these are merged into a single interleaved element: each
//! contributing element is assigned a channel slot, a combined
//! descriptor is synthesized, and samples are interleaved in slot
//! order so the output channel order matches the descriptor no matter
//! how the file ordered its planes.

use crate::element::{Descriptor, Element};
use crate::{IoError, IoResult};

/// Merges planar elements into one interleaved element.
///
/// `planes[i]` holds the decoded samples of `elements[i]`, or `None`
/// for auxiliary planes (depth, composite) which never participate.
/// The merged element inherits its bit depth, transfer and reference
/// values from the first element.
pub(crate) fn merge_elements(
    width: u32,
    height: u32,
    total_depth: u32,
    elements: &[Element],
    planes: &[Option<Vec<f32>>],
) -> IoResult<(Element, Vec<f32>)> {
    let has_alpha = elements
        .iter()
        .any(|e| e.descriptor == Descriptor::Alpha);

    let mut descriptor: Option<Descriptor> = None;
    let mut slots: [Option<usize>; 8] = [None; 8];

    for (i, e) in elements.iter().enumerate() {
        match e.descriptor {
            Descriptor::Red | Descriptor::Rgb => {
                descriptor = Some(if has_alpha {
                    Descriptor::Rgba
                } else {
                    Descriptor::Rgb
                });
                slots[0] = Some(i);
            }
            Descriptor::Green => {
                descriptor = Some(if has_alpha {
                    Descriptor::Rgba
                } else {
                    Descriptor::Rgb
                });
                slots[1] = Some(i);
            }
            Descriptor::Blue => {
                descriptor = Some(if has_alpha {
                    Descriptor::Rgba
                } else {
                    Descriptor::Rgb
                });
                slots[2] = Some(i);
            }
            Descriptor::Alpha => {
                // Alpha is always the last channel.
                slots[total_depth as usize - 1] = Some(i);
            }
            Descriptor::Luminance => {
                match descriptor {
                    None => {
                        descriptor = Some(if has_alpha {
                            Descriptor::Ya
                        } else {
                            Descriptor::Luminance
                        });
                    }
                    Some(Descriptor::Chrominance) => {
                        descriptor = chroma_descriptor(total_depth, has_alpha);
                    }
                    _ => {}
                }

                // Y sits in slot 1 except when alone or paired with alpha.
                if total_depth == 1 || (total_depth == 2 && has_alpha) {
                    slots[0] = Some(i);
                } else {
                    slots[1] = Some(i);
                }
            }
            Descriptor::Chrominance => {
                match descriptor {
                    None => descriptor = Some(Descriptor::Chrominance),
                    Some(Descriptor::Luminance) => {
                        descriptor = chroma_descriptor(total_depth, has_alpha);
                    }
                    _ => {}
                }

                // Cb then Cr, in slots 0 and 2.
                if slots[0].is_none() {
                    slots[0] = Some(i);
                } else {
                    slots[2] = Some(i);
                }
            }
            Descriptor::CbYCr => {
                descriptor = Some(if has_alpha {
                    Descriptor::CbYCrA
                } else {
                    Descriptor::CbYCr
                });
                slots[0] = Some(i);
            }
            Descriptor::Rgba
            | Descriptor::Abgr
            | Descriptor::CbYACrYA
            | Descriptor::CbYCrY
            | Descriptor::CbYCrA => {
                descriptor = Some(e.descriptor);
                slots[0] = Some(i);
            }
            Descriptor::Depth | Descriptor::Composite => {
                tracing::debug!("skipping {:?} element {}", e.descriptor, i);
            }
            // Never read from a file.
            Descriptor::Ya => {}
        }
    }

    let descriptor = descriptor.ok_or_else(|| {
        IoError::UnsupportedFormat("no imageable elements to assemble".to_string())
    })?;

    let active: Vec<usize> = slots.iter().filter_map(|s| *s).collect();
    let slot_depth: u32 = active.iter().map(|&i| elements[i].depth).sum();
    if slot_depth != total_depth {
        return Err(IoError::DecodeError(format!(
            "element depths sum to {} but image depth is {}",
            slot_depth, total_depth
        )));
    }

    let mut merged = elements[0].clone();
    merged.descriptor = descriptor;
    merged.depth = total_depth;

    let mut data = vec![0f32; (width * height * total_depth) as usize];
    let mut cursors = [0usize; 8];
    let mut sample = 0usize;
    while sample < data.len() {
        for &i in &active {
            let plane = planes[i].as_ref().ok_or_else(|| {
                IoError::DecodeError(format!("element {} has no decoded samples", i))
            })?;
            for _ in 0..elements[i].depth {
                data[sample] = plane[cursors[i]];
                cursors[i] += 1;
                sample += 1;
            }
        }
    }

    Ok((merged, data))
}

fn chroma_descriptor(total_depth: u32, has_alpha: bool) -> Option<Descriptor> {
    match total_depth {
        2 => Some(Descriptor::CbYCrY),
        3 => Some(if has_alpha {
            Descriptor::CbYACrYA
        } else {
            Descriptor::CbYCr
        }),
        4 => Some(Descriptor::CbYCrA),
        _ => Some(Descriptor::Chrominance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Packing, Transfer};

    fn plane_element(descriptor: Descriptor) -> Element {
        Element {
            descriptor,
            transfer: Transfer::PrintingDensity,
            depth: descriptor.channels(),
            bits_per_sample: 10,
            packing: Packing::FilledLsb,
            data_offset: 0,
            ref_low_data: 0,
            ref_high_data: 1023,
            ref_low_quantity: 0.0,
            ref_high_quantity: 2.048,
            max_value: 1023,
        }
    }

    fn constant_plane(value: f32, samples: usize) -> Option<Vec<f32>> {
        Some(vec![value; samples])
    }

    #[test]
    fn test_rgb_planes() {
        let elements = [
            plane_element(Descriptor::Red),
            plane_element(Descriptor::Green),
            plane_element(Descriptor::Blue),
        ];
        let planes = [
            constant_plane(0.1, 4),
            constant_plane(0.5, 4),
            constant_plane(0.9, 4),
        ];
        let (merged, data) = merge_elements(2, 2, 3, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::Rgb);
        assert_eq!(merged.depth, 3);
        assert_eq!(data.len(), 12);
        for px in data.chunks_exact(3) {
            assert_eq!(px, [0.1, 0.5, 0.9]);
        }
    }

    #[test]
    fn test_rgb_planes_scrambled_file_order() {
        // Slot order wins over file order: a B,G,R file still merges
        // into R,G,B interleaving.
        let elements = [
            plane_element(Descriptor::Blue),
            plane_element(Descriptor::Green),
            plane_element(Descriptor::Red),
        ];
        let planes = [
            constant_plane(0.9, 4),
            constant_plane(0.5, 4),
            constant_plane(0.1, 4),
        ];
        let (merged, data) = merge_elements(2, 2, 3, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::Rgb);
        for px in data.chunks_exact(3) {
            assert_eq!(px, [0.1, 0.5, 0.9]);
        }
    }

    #[test]
    fn test_rgba_planes() {
        let elements = [
            plane_element(Descriptor::Red),
            plane_element(Descriptor::Green),
            plane_element(Descriptor::Blue),
            plane_element(Descriptor::Alpha),
        ];
        let planes = [
            constant_plane(0.1, 1),
            constant_plane(0.5, 1),
            constant_plane(0.9, 1),
            constant_plane(1.0, 1),
        ];
        let (merged, data) = merge_elements(1, 1, 4, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::Rgba);
        assert_eq!(data, vec![0.1, 0.5, 0.9, 1.0]);
    }

    #[test]
    fn test_ycbcr_planes() {
        let elements = [
            plane_element(Descriptor::Luminance),
            plane_element(Descriptor::Chrominance),
            plane_element(Descriptor::Chrominance),
        ];
        let planes = [
            constant_plane(0.6, 1),
            constant_plane(0.4, 1),
            constant_plane(0.5, 1),
        ];
        let (merged, data) = merge_elements(1, 1, 3, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::CbYCr);
        // Cb, Y, Cr
        assert_eq!(data, vec![0.4, 0.6, 0.5]);
    }

    #[test]
    fn test_luma_alpha_planes() {
        let elements = [
            plane_element(Descriptor::Luminance),
            plane_element(Descriptor::Alpha),
        ];
        let planes = [constant_plane(0.6, 1), constant_plane(0.25, 1)];
        let (merged, data) = merge_elements(1, 1, 2, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::Ya);
        assert_eq!(data, vec![0.6, 0.25]);
    }

    #[test]
    fn test_auxiliary_plane_skipped() {
        let elements = [
            plane_element(Descriptor::Rgb),
            plane_element(Descriptor::Depth),
        ];
        let planes = [constant_plane(0.5, 3), None];
        let (merged, data) = merge_elements(1, 1, 3, &elements, &planes).unwrap();
        assert_eq!(merged.descriptor, Descriptor::Rgb);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_depth_mismatch_rejected() {
        let elements = [plane_element(Descriptor::Red)];
        let planes = [constant_plane(0.5, 1)];
        assert!(merge_elements(1, 1, 3, &elements, &planes).is_err());
    }
}
