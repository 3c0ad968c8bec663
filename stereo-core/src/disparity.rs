use crate::{Error, Result};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A dense map of the horizontal pixel shift between the left and right views.
///
/// The map is row-major and has the size of the left image. Pixels that could
/// not be matched hold a negative value (see [`DisparityMap::INVALID`]), which
/// downstream consumers treat as "unknown distance".
///
/// Deserialization goes through [`DisparityMap::from_raw`], so a buffer that does not match the
/// dimensions is rejected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(try_from = "DisparityRecord"))]
pub struct DisparityMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

#[cfg(feature = "serde-serialize")]
#[derive(Deserialize)]
struct DisparityRecord {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

#[cfg(feature = "serde-serialize")]
impl TryFrom<DisparityRecord> for DisparityMap {
    type Error = Error;

    fn try_from(record: DisparityRecord) -> Result<Self> {
        Self::from_raw(record.width, record.height, record.data)
    }
}

impl DisparityMap {
    /// The sentinel written to unmatched pixels.
    pub const INVALID: f32 = -1.0;

    /// Creates a map where every pixel is invalid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Self::INVALID; width as usize * height as usize],
        }
    }

    /// Wraps a row-major buffer of `width * height` disparities.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::InvalidInput(format!(
                "disparity buffer has {} values, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Whether a stored value is a real disparity rather than the sentinel.
    ///
    /// Zero is valid here even though it places the point at infinity.
    pub fn is_valid(value: f32) -> bool {
        value >= 0.0 && value.is_finite()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    /// The stored value, sentinel included. `None` outside the map.
    pub fn raw(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.data[self.index(x, y)])
        } else {
            None
        }
    }

    /// The disparity at a pixel, or `None` if it is outside the map or invalid.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.raw(x, y).filter(|&value| Self::is_valid(value))
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    /// Whether `point` lies within `[0, width) x [0, height)`.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        (0.0..self.width as f64).contains(&point.x) && (0.0..self.height as f64).contains(&point.y)
    }

    /// Number of pixels holding a valid disparity.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&value| Self::is_valid(value)).count()
    }

    /// The largest valid disparity, if any pixel is valid.
    pub fn max_valid(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|&value| Self::is_valid(value))
            .fold(None, |max, value| Some(max.map_or(value, |m: f32| m.max(value))))
    }

    /// Bilinearly interpolates the disparity at a sub-pixel location.
    ///
    /// Only neighbors with a non-zero weight take part, so integer coordinates
    /// read exactly one pixel. Fails with [`Error::InvalidInput`] outside the
    /// map and with [`Error::InsufficientDisparityData`] if a participating
    /// neighbor is invalid.
    pub fn interpolate(&self, point: Point2<f64>) -> Result<f64> {
        if !self.contains(point) {
            return Err(Error::InvalidInput(format!(
                "point ({}, {}) is outside the {}x{} disparity map",
                point.x, point.y, self.width, self.height
            )));
        }
        let x0 = point.x.floor();
        let y0 = point.y.floor();
        let fx = point.x - x0;
        let fy = point.y - y0;
        let x0 = x0 as u32;
        let y0 = y0 as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let neighbors = [
            (x0, y0, (1.0 - fx) * (1.0 - fy)),
            (x1, y0, fx * (1.0 - fy)),
            (x0, y1, (1.0 - fx) * fy),
            (x1, y1, fx * fy),
        ];
        let mut value = 0.0;
        for (x, y, weight) in neighbors {
            if weight <= 0.0 {
                continue;
            }
            let disparity = self
                .get(x, y)
                .ok_or(Error::InsufficientDisparityData {
                    x: point.x,
                    y: point.y,
                })?;
            value += weight * f64::from(disparity);
        }
        Ok(value)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
