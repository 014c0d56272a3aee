// src/device/map_mode.rs

//! Logical coordinate systems and their mapping onto device pixels.

use crate::image::geom::{Fraction, Point, rescale_wide};
use crate::utils::error::Result;

/// Unit of logical coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapUnit {
    /// Device pixels; the device resolution is not involved.
    #[default]
    Pixel,
    /// 1/100 millimetre.
    Mm100,
    /// 1/1440 inch.
    Twip,
    /// 1/72 inch.
    Point,
    Inch,
}

impl MapUnit {
    /// Logical units per inch, or `None` for device pixels.
    pub fn units_per_inch(self) -> Option<i64> {
        match self {
            MapUnit::Pixel => None,
            MapUnit::Mm100 => Some(2540),
            MapUnit::Twip => Some(1440),
            MapUnit::Point => Some(72),
            MapUnit::Inch => Some(1),
        }
    }
}

/// A logical coordinate system: unit, origin offset and per-axis scale.
///
/// A logical coordinate `n` maps to the device pixel
/// `(n + origin) * scale * dpi / units_per_inch`, rounded half away from zero.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct MapMode {
    unit: MapUnit,
    origin: Point,
    scale_x: Fraction,
    scale_y: Fraction,
}

impl MapMode {
    pub fn new(unit: MapUnit) -> Self {
        MapMode {
            unit,
            ..Self::default()
        }
    }

    /// Identity mapping onto device pixels.
    pub fn pixel() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the scale as `x_num/x_den` and `y_num/y_den`.
    pub fn with_scale(mut self, x_num: i64, x_den: i64, y_num: i64, y_den: i64) -> Result<Self> {
        self.scale_x = Fraction::new(x_num, x_den)?;
        self.scale_y = Fraction::new(y_num, y_den)?;
        Ok(self)
    }

    pub fn unit(&self) -> MapUnit {
        self.unit
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// The (numerator, denominator) turning a logical x offset into pixels.
    fn resolution(&self, scale: Fraction, dpi: u32) -> (i128, i128) {
        let (num, den) = (i128::from(scale.num()), i128::from(scale.den()));
        match self.unit.units_per_inch() {
            None => (num, den),
            Some(per_inch) => (num * i128::from(dpi), den * i128::from(per_inch)),
        }
    }

    pub fn logic_to_pixel_x(&self, x: i32, dpi_x: u32) -> i64 {
        let (num, den) = self.resolution(self.scale_x, dpi_x);
        rescale_wide(i128::from(x) + i128::from(self.origin.x), num, den)
    }

    pub fn logic_to_pixel_y(&self, y: i32, dpi_y: u32) -> i64 {
        let (num, den) = self.resolution(self.scale_y, dpi_y);
        rescale_wide(i128::from(y) + i128::from(self.origin.y), num, den)
    }

    /// Converts a logical length (no origin) to pixels along x.
    pub fn logic_to_pixel_width(&self, w: u32, dpi_x: u32) -> i64 {
        let (num, den) = self.resolution(self.scale_x, dpi_x);
        rescale_wide(i128::from(w), num, den)
    }

    pub fn pixel_to_logic_x(&self, px: i32, dpi_x: u32) -> i64 {
        let (num, den) = self.resolution(self.scale_x, dpi_x);
        rescale_wide(i128::from(px), den, num).saturating_sub(i64::from(self.origin.x))
    }

    pub fn pixel_to_logic_y(&self, py: i32, dpi_y: u32) -> i64 {
        let (num, den) = self.resolution(self.scale_y, dpi_y);
        rescale_wide(i128::from(py), den, num).saturating_sub(i64::from(self.origin.y))
    }
}
