use crate::{pyramid::Level, Orb};
use float_ord::FloatOrd;
use image::{ImageBuffer, Luma};
use imageproc::{
    corners::corners_fast9,
    gradients::{horizontal_sobel, vertical_sobel},
};

/// Half the side length of the window Harris responses are summed over.
const HARRIS_RADIUS: i64 = 3;

type Gradient = ImageBuffer<Luma<i16>, Vec<i16>>;

/// A corner in the coordinates of its pyramid level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Corner {
    pub x: u32,
    pub y: u32,
    pub response: f64,
}

/// Splits the feature budget over the levels so each level gets a share proportional to its area.
pub(crate) fn level_quotas(orb: &Orb, levels: usize) -> Vec<usize> {
    if levels == 0 {
        return vec![];
    }
    let factor = 1.0 / orb.scale_factor;
    let first = orb.num_features as f64 * (1.0 - factor) / (1.0 - factor.powi(levels as i32));
    let mut remaining = orb.num_features;
    let mut quotas: Vec<usize> = (0..levels - 1)
        .map(|level| {
            let quota = ((first * factor.powi(level as i32)).round() as usize).min(remaining);
            remaining -= quota;
            quota
        })
        .collect();
    quotas.push(remaining);
    quotas
}

/// Harris corner measure over a square window around `(x, y)`.
fn harris(gx: &Gradient, gy: &Gradient, x: u32, y: u32, k: f64) -> f64 {
    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    for dy in -HARRIS_RADIUS..=HARRIS_RADIUS {
        for dx in -HARRIS_RADIUS..=HARRIS_RADIUS {
            let px = (x as i64 + dx) as u32;
            let py = (y as i64 + dy) as u32;
            let ix = gx.get_pixel(px, py)[0] as f64;
            let iy = gy.get_pixel(px, py)[0] as f64;
            a += ix * ix;
            b += iy * iy;
            c += ix * iy;
        }
    }
    // Normalizes Sobel responses of 8-bit images to unit gradients.
    let scale = 1.0 / (4.0 * (2 * HARRIS_RADIUS + 1) as f64 * 255.0);
    let scale = scale * scale * scale * scale;
    (a * b - c * c - k * (a + b) * (a + b)) * scale
}

/// Finds at most `quota` corners on one level, strongest first.
pub(crate) fn detect(orb: &Orb, level: &Level, quota: usize) -> Vec<Corner> {
    let (width, height) = level.image.dimensions();
    let margin = orb.edge_threshold;
    if quota == 0 || width <= 2 * margin || height <= 2 * margin {
        return vec![];
    }

    let fast: Vec<_> = corners_fast9(&level.image, orb.fast_threshold)
        .into_iter()
        .filter(|c| {
            (margin..width - margin).contains(&c.x) && (margin..height - margin).contains(&c.y)
        })
        .collect();
    if fast.is_empty() {
        return vec![];
    }

    let gx = horizontal_sobel(&level.image);
    let gy = vertical_sobel(&level.image);
    let mut corners: Vec<Corner> = fast
        .iter()
        .map(|c| Corner {
            x: c.x,
            y: c.y,
            response: harris(&gx, &gy, c.x, c.y, orb.harris_k),
        })
        .collect();
    corners.sort_by(|a, b| {
        FloatOrd(b.response)
            .cmp(&FloatOrd(a.response))
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    suppress(corners, width, height, orb.nms_radius, quota)
}

/// Greedy non-maximum suppression over corners sorted strongest first.
fn suppress(
    corners: Vec<Corner>,
    width: u32,
    height: u32,
    radius: u32,
    quota: usize,
) -> Vec<Corner> {
    let mut taken = vec![false; width as usize * height as usize];
    let radius = radius as i64;
    let mut kept = Vec::with_capacity(quota.min(corners.len()));
    for corner in corners {
        if kept.len() == quota {
            break;
        }
        let (cx, cy) = (corner.x as i64, corner.y as i64);
        let crowded = (-radius..=radius).any(|dy| {
            (-radius..=radius).any(|dx| {
                let (x, y) = (cx + dx, cy + dy);
                dx * dx + dy * dy <= radius * radius
                    && x >= 0
                    && y >= 0
                    && x < width as i64
                    && y < height as i64
                    && taken[y as usize * width as usize + x as usize]
            })
        });
        if !crowded {
            taken[cy as usize * width as usize + cx as usize] = true;
            kept.push(corner);
        }
    }
    kept
}
