use crate::evolution::EvolutionStep;
use crate::Akaze;
use core::f32::consts::PI;
use log::*;

/// A detector response maximum, in full resolution coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Extremum {
    pub point: (f32, f32),
    pub response: f32,
    /// Diameter of the neighborhood, in full resolution pixels.
    pub size: f32,
    pub octave: u32,
    /// Index of the evolution the extremum was found in.
    pub level: usize,
    /// Dominant gradient orientation in `[0, 2 pi)`.
    pub angle: f32,
}

impl Extremum {
    fn ratio(&self) -> f32 {
        (1u32 << self.octave) as f32
    }
}

impl Akaze {
    /// Collects the maxima of the detector response over space and neighboring scales.
    fn find_scale_space_extrema(&self, evolutions: &[EvolutionStep]) -> Vec<Extremum> {
        let mut cache: Vec<Extremum> = vec![];
        // Radius of the descriptor pattern in units of the derivative sigma.
        let smax = 10.0f32 * 2.0f32.sqrt();
        let threshold = self.detector_threshold as f32;
        for (level, evolution) in evolutions.iter().enumerate() {
            let det = &evolution.det;
            let (w, h) = (det.width(), det.height());
            let ratio = evolution.ratio() as f32;
            let size = (evolution.esigma * self.derivative_factor) as f32;
            let sigma_size = (size / ratio).round();
            for y in 1..h.saturating_sub(1) {
                for x in 1..w.saturating_sub(1) {
                    let value = det.get(x, y);
                    if !(value > threshold
                        && value > det.get(x - 1, y)
                        && value > det.get(x + 1, y)
                        && value > det.get(x, y - 1)
                        && value > det.get(x, y + 1))
                    {
                        continue;
                    }
                    let candidate = Extremum {
                        point: (x as f32 * ratio, y as f32 * ratio),
                        response: value.abs(),
                        size,
                        octave: evolution.octave,
                        level,
                        angle: 0.0,
                    };
                    // Compare with the extrema of this and the previous evolution.
                    let mut replaces = None;
                    let mut is_extremum = true;
                    for (k, previous) in cache.iter().enumerate() {
                        if previous.level != level && previous.level + 1 != level {
                            continue;
                        }
                        let dx = candidate.point.0 - previous.point.0;
                        let dy = candidate.point.1 - previous.point.1;
                        if dx * dx + dy * dy <= size * size {
                            if candidate.response > previous.response {
                                replaces = Some(k);
                            } else {
                                is_extremum = false;
                            }
                            break;
                        }
                    }
                    if !is_extremum {
                        continue;
                    }
                    // The descriptor pattern has to fit inside the evolution.
                    let (xf, yf) = (x as f32, y as f32);
                    let reach = smax * sigma_size;
                    let is_out = (xf - reach).round() - 1.0 < 0.0
                        || (xf + reach).round() + 1.0 >= w as f32
                        || (yf - reach).round() - 1.0 < 0.0
                        || (yf + reach).round() + 1.0 >= h as f32;
                    if is_out {
                        continue;
                    }
                    match replaces {
                        Some(k) => cache[k] = candidate,
                        None => cache.push(candidate),
                    }
                }
            }
        }
        // Drop extrema that the next evolution also found.
        let extrema: Vec<Extremum> = cache
            .iter()
            .enumerate()
            .filter(|&(i, a)| {
                !cache[i..].iter().any(|b| {
                    let dx = a.point.0 - b.point.0;
                    let dy = a.point.1 - b.point.1;
                    a.level + 1 == b.level && dx * dx + dy * dy <= a.size * a.size
                })
            })
            .map(|(_, &extremum)| extremum)
            .collect();
        debug!("Extracted {} scale space extrema", extrema.len());
        extrema
    }

    /// Detects scale space extrema, refines them to sub-pixel accuracy and assigns each its
    /// dominant orientation.
    pub(crate) fn detect_keypoints(&self, evolutions: &[EvolutionStep]) -> Vec<Extremum> {
        let extrema = self.find_scale_space_extrema(evolutions);
        let mut refined: Vec<Extremum> = extrema
            .iter()
            .filter_map(|extremum| subpixel_refinement(extremum, evolutions))
            .collect();
        debug!(
            "{}/{} remain after subpixel refinement",
            refined.len(),
            extrema.len()
        );
        for extremum in &mut refined {
            extremum.angle = main_orientation(extremum, &evolutions[extremum.level]);
        }
        refined
    }
}

/// Fits a quadratic to the 3x3 detector response around the extremum.
///
/// Extrema whose peak lies more than a pixel away are unstable and dropped.
fn subpixel_refinement(extremum: &Extremum, evolutions: &[EvolutionStep]) -> Option<Extremum> {
    let det = &evolutions[extremum.level].det;
    let ratio = extremum.ratio();
    let x = (extremum.point.0 / ratio).round() as usize;
    let y = (extremum.point.1 / ratio).round() as usize;
    if x == 0 || y == 0 || x + 1 >= det.width() || y + 1 >= det.height() {
        return None;
    }
    let center = det.get(x, y);
    let (x_p, x_m) = (det.get(x + 1, y), det.get(x - 1, y));
    let (y_p, y_m) = (det.get(x, y + 1), det.get(x, y - 1));
    let d_x = 0.5 * (x_p - x_m);
    let d_y = 0.5 * (y_p - y_m);
    let d_xx = x_p + x_m - 2.0 * center;
    let d_yy = y_p + y_m - 2.0 * center;
    let d_xy = 0.25 * (det.get(x + 1, y + 1) + det.get(x - 1, y - 1))
        - 0.25 * (det.get(x + 1, y - 1) + det.get(x - 1, y + 1));
    let inv_det = (d_xx * d_yy - d_xy * d_xy).recip();
    let offset_x = -(d_x * d_yy - d_y * d_xy) * inv_det;
    let offset_y = -(d_y * d_xx - d_x * d_xy) * inv_det;
    if !(offset_x.abs() <= 1.0 && offset_y.abs() <= 1.0) {
        return None;
    }
    Some(Extremum {
        point: (
            (x as f32 + offset_x) * ratio + 0.5 * (ratio - 1.0),
            (y as f32 + offset_y) * ratio + 0.5 * (ratio - 1.0),
        ),
        ..*extremum
    })
}

/// A 7x7 Gaussian kernel with sigma 2.5, one quadrant.
#[allow(clippy::excessive_precision)]
static GAUSS25: [[f32; 7]; 7] = [
    [0.0254_6481, 0.0235_0698, 0.0184_9125, 0.0123_9505, 0.0070_8017, 0.0034_4629, 0.0014_2946],
    [0.0235_0698, 0.0216_9968, 0.0170_6957, 0.0114_4208, 0.0065_3582, 0.0031_8132, 0.0013_1956],
    [0.0184_9125, 0.0170_6957, 0.0134_2740, 0.0090_0066, 0.0051_4126, 0.0025_0252, 0.0010_3800],
    [0.0123_9505, 0.0114_4208, 0.0090_0066, 0.0060_3332, 0.0034_4629, 0.0016_7749, 0.0006_9579],
    [0.0070_8017, 0.0065_3582, 0.0051_4126, 0.0034_4629, 0.0019_6855, 0.0009_5820, 0.0003_9744],
    [0.0034_4629, 0.0031_8132, 0.0025_0252, 0.0016_7749, 0.0009_5820, 0.0004_6640, 0.0001_9346],
    [0.0014_2946, 0.0013_1956, 0.0010_3800, 0.0006_9579, 0.0003_9744, 0.0001_9346, 0.0000_8024],
];

/// Dominant orientation of the gradients in a disc of radius `6 * scale` around the extremum.
///
/// A pi/3 wide window slides around the circle in steps of 0.15 radians. The orientation is that
/// of the longest summed gradient over any window position.
fn main_orientation(extremum: &Extremum, evolution: &EvolutionStep) -> f32 {
    let ratio = extremum.ratio();
    let scale = (0.5 * extremum.size / ratio).round();
    let (xf, yf) = (extremum.point.0 / ratio, extremum.point.1 / ratio);
    let mut samples: Vec<(f32, f32, f32)> = Vec::with_capacity(109);
    for i in -6i32..=6 {
        for j in -6i32..=6 {
            if i * i + j * j >= 36 {
                continue;
            }
            let ix = (xf + i as f32 * scale).round() as isize;
            let iy = (yf + j as f32 * scale).round() as isize;
            let weight = GAUSS25[i.unsigned_abs() as usize][j.unsigned_abs() as usize];
            let gx = weight * evolution.lx.get_clamped(ix, iy);
            let gy = weight * evolution.ly.get_clamped(ix, iy);
            samples.push((gx, gy, full_turn(gy.atan2(gx))));
        }
    }

    let mut best = 0.0f32;
    let mut angle = 0.0f32;
    let mut start = 0.0f32;
    while start < 2.0 * PI {
        let end = (start + PI / 3.0).rem_euclid(2.0 * PI);
        let (sum_x, sum_y) = samples
            .iter()
            .filter(|&&(_, _, a)| {
                if start < end {
                    start < a && a < end
                } else {
                    a > start || a < end
                }
            })
            .fold((0.0, 0.0), |(sx, sy), &(gx, gy, _)| (sx + gx, sy + gy));
        let length = sum_x * sum_x + sum_y * sum_y;
        if length > best {
            best = length;
            angle = full_turn(sum_y.atan2(sum_x));
        }
        start += 0.15;
    }
    angle
}

/// Maps an angle into `[0, 2 pi)`.
fn full_turn(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}
