use crate::scale_space_extrema::Extremum;
use crate::{Akaze, EvolutionStep};
use bitarray::BitArray;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Side lengths of the M-LDB grids relative to the pattern, coarse to fine.
const GRID_SIZES: [f32; 3] = [1.0, 2.0 / 3.0, 1.0 / 2.0];

impl Akaze {
    /// Computes a descriptor for every extremum whose pattern lies inside its evolution.
    ///
    /// Extrema without a descriptor are dropped, so both returned vectors have the same length.
    pub(crate) fn extract_descriptors(
        &self,
        evolutions: &[EvolutionStep],
        extrema: &[Extremum],
    ) -> (Vec<Extremum>, Vec<BitArray<64>>) {
        let describe = |&extremum: &Extremum| {
            Some((extremum, self.mldb_descriptor(&extremum, evolutions)?))
        };
        #[cfg(not(feature = "rayon"))]
        {
            extrema.iter().filter_map(describe).unzip()
        }
        #[cfg(feature = "rayon")]
        {
            extrema.par_iter().filter_map(describe).unzip()
        }
    }

    /// The rotation invariant M-LDB binary descriptor.
    ///
    /// The rotated pattern is divided into 2x2, 3x3 and 4x4 grids. Every cell is summarized by its
    /// mean intensity and mean rotated gradient, and every pair of cells of a grid contributes one
    /// bit per channel. With three channels this fills 486 of the 512 bits.
    fn mldb_descriptor(
        &self,
        extremum: &Extremum,
        evolutions: &[EvolutionStep],
    ) -> Option<BitArray<64>> {
        let mut output = BitArray::zeros();
        let channels = self.descriptor_channels;
        let mut values = vec![0f32; 16 * channels];
        let ratio = (1u32 << extremum.octave) as f32;
        let sampling = Sampling {
            evolution: evolutions.get(extremum.level)?,
            x: extremum.point.0 / ratio,
            y: extremum.point.1 / ratio,
            cos: extremum.angle.cos(),
            sin: extremum.angle.sin(),
            scale: (0.5 * extremum.size / ratio).round(),
        };
        let pattern_size = self.descriptor_pattern_size as f32;
        let mut bit = 0usize;
        for (grid, &multiplier) in GRID_SIZES.iter().enumerate() {
            let cells = (grid + 2) * (grid + 2);
            let sample_step = (pattern_size * multiplier).ceil() as usize;
            self.fill_cells(&mut values, sample_step, &sampling)?;
            binary_comparisons(
                &values[..cells * channels],
                output.bytes_mut(),
                channels,
                &mut bit,
            );
        }
        Some(output)
    }

    /// Averages every channel over the cells of one grid, row by row.
    ///
    /// Returns `None` if any sample falls outside the evolution.
    fn fill_cells(
        &self,
        values: &mut [f32],
        sample_step: usize,
        sampling: &Sampling,
    ) -> Option<()> {
        let pattern_size = self.descriptor_pattern_size as i32;
        let channels = self.descriptor_channels;
        let Sampling {
            evolution,
            x,
            y,
            cos,
            sin,
            scale,
        } = *sampling;
        let (width, height) = (evolution.lt.width() as isize, evolution.lt.height() as isize);
        let mut cells = values.chunks_exact_mut(channels);
        for i in (-pattern_size..pattern_size).step_by(sample_step) {
            for j in (-pattern_size..pattern_size).step_by(sample_step) {
                let (mut di, mut dx, mut dy) = (0f32, 0f32, 0f32);
                let mut count = 0usize;
                for k in i..i + sample_step as i32 {
                    for l in j..j + sample_step as i32 {
                        let (k, l) = (k as f32, l as f32);
                        let sample_y = y + (l * cos * scale + k * sin * scale);
                        let sample_x = x + (-l * sin * scale + k * cos * scale);
                        let (sx, sy) = (sample_x.round() as isize, sample_y.round() as isize);
                        if !(0..width).contains(&sx) || !(0..height).contains(&sy) {
                            return None;
                        }
                        let (sx, sy) = (sx as usize, sy as usize);
                        di += evolution.lt.get(sx, sy);
                        if channels > 1 {
                            let rx = evolution.lx.get(sx, sy);
                            let ry = evolution.ly.get(sx, sy);
                            if channels == 2 {
                                dx += rx.hypot(ry);
                            } else {
                                dx += -rx * sin + ry * cos;
                                dy += rx * cos + ry * sin;
                            }
                        }
                        count += 1;
                    }
                }
                let cell = cells.next()?;
                let count = count as f32;
                cell[0] = di / count;
                if channels > 1 {
                    cell[1] = dx / count;
                }
                if channels > 2 {
                    cell[2] = dy / count;
                }
            }
        }
        Some(())
    }
}

#[derive(Clone, Copy)]
struct Sampling<'a> {
    evolution: &'a EvolutionStep,
    x: f32,
    y: f32,
    cos: f32,
    sin: f32,
    scale: f32,
}

/// Appends one bit per channel and pair of cells, set when the first cell is larger.
fn binary_comparisons(values: &[f32], descriptor: &mut [u8], channels: usize, bit: &mut usize) {
    let cells = values.len() / channels;
    for channel in 0..channels {
        for i in 0..cells {
            let first = values[channels * i + channel];
            for j in i + 1..cells {
                if first > values[channels * j + channel] {
                    descriptor[*bit >> 3] |= 1 << (*bit & 7);
                }
                *bit += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_channels_fill_486_bits() {
        let mut descriptor = [0u8; 64];
        let mut bit = 0;
        for cells in [4, 9, 16] {
            // Strictly decreasing values set every bit.
            let values: Vec<f32> = (0..cells * 3).rev().map(|v| v as f32).collect();
            binary_comparisons(&values, &mut descriptor, 3, &mut bit);
        }
        assert_eq!(bit, 486);
        let ones: u32 = descriptor.iter().map(|b| b.count_ones()).sum();
        assert_eq!(ones, 486);
    }

    #[test]
    fn equal_cells_set_no_bits() {
        let mut descriptor = [0u8; 64];
        let mut bit = 0;
        binary_comparisons(&[0.5; 12], &mut descriptor, 3, &mut bit);
        assert_eq!(bit, 18);
        assert!(descriptor.iter().all(|&b| b == 0));
    }
}
