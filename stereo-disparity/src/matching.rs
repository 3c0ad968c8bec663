use crate::{BlockMatching, GrayFloatImage};
use log::*;
use stereo_core::{DisparityMap, Result};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Costs of one image row for every candidate disparity.
///
/// `costs[i * width + x]` is the windowed SAD of left pixel `x` against right pixel
/// `x - (min_disparity + i)`. Candidates that would sample left of the right image are infinite.
struct RowCosts {
    width: usize,
    min_disparity: usize,
    costs: Vec<f32>,
}

impl RowCosts {
    fn cost(&self, x: usize, disparity: usize) -> f32 {
        self.costs[(disparity - self.min_disparity) * self.width + x]
    }

    fn candidates(&self) -> usize {
        self.costs.len() / self.width
    }
}

pub(crate) fn compute(
    config: &BlockMatching,
    left: &GrayFloatImage,
    right: &GrayFloatImage,
) -> Result<DisparityMap> {
    let width = left.width();
    let height = left.height();
    let mut data = vec![DisparityMap::INVALID; width * height];
    // Candidates past `width - 1` never sample inside the right image.
    let top = (width as u32).saturating_sub(1);
    if width == 0 || config.min_disparity > top {
        debug!("Disparity range starts beyond a {} pixel wide image", width);
        return DisparityMap::from_raw(width as u32, height as u32, data);
    }
    let config = &BlockMatching {
        max_disparity: config.max_disparity.min(top),
        ..*config
    };

    let process_row = |(y, row): (usize, &mut [f32])| {
        let costs = row_costs(config, left, right, y);
        let texture = (config.texture_threshold > 0.0).then(|| row_texture(config, left, y));
        for (x, out) in row.iter_mut().enumerate() {
            if let Some(disparity) = select(config, &costs, texture.as_deref(), x) {
                *out = disparity;
            }
        }
        trace!("matched row {}", y);
    };

    #[cfg(not(feature = "rayon"))]
    data.chunks_mut(width).enumerate().for_each(process_row);
    #[cfg(feature = "rayon")]
    data.par_chunks_mut(width).enumerate().for_each(process_row);

    DisparityMap::from_raw(width as u32, height as u32, data)
}

/// Sums over a window of `2 * half + 1` columns centered on every column, replicating the edge.
fn box_filter(values: &[f64], half: usize) -> Vec<f32> {
    let width = values.len();
    let mut prefix = Vec::with_capacity(width + 2 * half + 1);
    prefix.push(0.0);
    let mut sum = 0.0;
    for i in 0..width + 2 * half {
        sum += values[i.saturating_sub(half).min(width - 1)];
        prefix.push(sum);
    }
    (0..width)
        .map(|x| (prefix[x + 2 * half + 1] - prefix[x]) as f32)
        .collect()
}

/// Row indices covered by the window centered on row `y`, replicating the edge rows.
fn window_rows(config: &BlockMatching, y: usize, height: usize) -> Vec<usize> {
    let half = (config.window_size / 2) as usize;
    (0..config.window_size as usize)
        .map(|dy| (y + dy).saturating_sub(half).min(height - 1))
        .collect()
}

fn row_costs(
    config: &BlockMatching,
    left: &GrayFloatImage,
    right: &GrayFloatImage,
    y: usize,
) -> RowCosts {
    let width = left.width();
    let height = left.height();
    let half = (config.window_size / 2) as usize;
    let rows = window_rows(config, y, height);

    let min_disparity = config.min_disparity as usize;
    let max_disparity = config.max_disparity as usize;
    let mut costs = Vec::with_capacity((max_disparity - min_disparity + 1) * width);
    let mut columns = vec![0.0f64; width];
    for disparity in min_disparity..=max_disparity {
        for (x, column) in columns.iter_mut().enumerate() {
            let rx = x.saturating_sub(disparity);
            *column = rows
                .iter()
                .map(|&r| (left.row(r)[x] - right.row(r)[rx]).abs() as f64)
                .sum();
        }
        let windowed = box_filter(&columns, half);
        costs.extend(
            windowed
                .into_iter()
                .enumerate()
                .map(|(x, cost)| if x >= disparity { cost } else { f32::INFINITY }),
        );
    }
    RowCosts {
        width,
        min_disparity,
        costs,
    }
}

/// Mean absolute horizontal gradient inside the window around every pixel of row `y`.
fn row_texture(config: &BlockMatching, left: &GrayFloatImage, y: usize) -> Vec<f32> {
    let width = left.width();
    let height = left.height();
    let half = (config.window_size / 2) as usize;
    let columns: Vec<f64> = (0..width)
        .map(|x| {
            window_rows(config, y, height)
                .into_iter()
                .map(|r| {
                    let row = left.row(r);
                    (row[(x + 1).min(width - 1)] - row[x]).abs() as f64
                })
                .sum()
        })
        .collect();
    let area = f64::from(config.window_size).powi(2);
    box_filter(&columns, half)
        .into_iter()
        .map(|sum| (f64::from(sum) / area) as f32)
        .collect()
}

fn select(
    config: &BlockMatching,
    costs: &RowCosts,
    texture: Option<&[f32]>,
    x: usize,
) -> Option<f32> {
    let min_disparity = costs.min_disparity;
    let last = min_disparity + costs.candidates() - 1;
    if x < min_disparity {
        return None;
    }
    let last = last.min(x);

    if let Some(texture) = texture {
        if texture[x] < config.texture_threshold {
            return None;
        }
    }

    // Lowest cost wins, ties go to the smaller disparity.
    let (best, best_cost) = (min_disparity..=last)
        .map(|d| (d, costs.cost(x, d)))
        .fold((min_disparity, f32::INFINITY), |acc, candidate| {
            if candidate.1 < acc.1 {
                candidate
            } else {
                acc
            }
        });
    if !best_cost.is_finite() {
        return None;
    }

    let bound = best_cost * (1.0 + config.uniqueness_ratio / 100.0);
    let ambiguous = (min_disparity..=last)
        .filter(|&d| d + 1 < best || d > best + 1)
        .any(|d| costs.cost(x, d) <= bound);
    if ambiguous {
        return None;
    }

    if let Some(max_diff) = config.left_right_max_diff {
        let right_best = right_to_left(costs, x - best);
        if right_best.abs_diff(best) > max_diff as usize {
            return None;
        }
    }

    let mut disparity = best as f32;
    if config.subpixel && best > min_disparity && best < last {
        let before = costs.cost(x, best - 1);
        let after = costs.cost(x, best + 1);
        let denominator = before - 2.0 * best_cost + after;
        if denominator > 0.0 {
            disparity += ((before - after) / (2.0 * denominator)).clamp(-0.5, 0.5);
        }
    }
    Some(disparity)
}

/// Best disparity of right pixel `rx` found by scanning the left row costs that sample it.
fn right_to_left(costs: &RowCosts, rx: usize) -> usize {
    let top = costs.min_disparity + costs.candidates() - 1;
    (costs.min_disparity..=top)
        .filter(|&d| rx + d < costs.width)
        .map(|d| (d, costs.cost(rx + d, d)))
        .fold((costs.min_disparity, f32::INFINITY), |acc, candidate| {
            if candidate.1 < acc.1 {
                candidate
            } else {
                acc
            }
        })
        .0
}
