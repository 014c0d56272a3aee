// src/reduce/config.rs

//! Options controlling transparency reduction.

use crate::image::image_formats::Color;

/// Configuration for one reduction call.
///
/// All options are explicit; nothing is read from global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionConfig {
    /// Reduce transparency instead of rasterizing it.
    pub reduce_transparency: bool,

    /// Decide per region whether rasterizing is worth it; with
    /// `reduce_transparency` this leaves large regions as vector output.
    pub transparency_auto_mode: bool,

    /// Downsample rasterized regions to `max_bitmap_dpi`.
    pub downsample_bitmaps: bool,

    /// Upper resolution (x, y) for rasterized regions when downsampling.
    pub max_bitmap_dpi: (u32, u32),

    /// Known page background. `Color::TRANSPARENT` means none is known and
    /// the background must be derived from the program itself.
    pub background: Color,

    /// Fraction of the output area above which auto mode stops
    /// rasterizing a region. Values outside 0.0..=1.0 are clamped.
    pub min_area_fraction: f64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            reduce_transparency: false,
            transparency_auto_mode: true,
            downsample_bitmaps: false,
            max_bitmap_dpi: (200, 200),
            background: Color::TRANSPARENT,
            min_area_fraction: Self::DEFAULT_MIN_AREA,
        }
    }
}

impl ReductionConfig {
    pub const DEFAULT_MIN_AREA: f64 = 0.75;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reduce_transparency(mut self, enabled: bool) -> Self {
        self.reduce_transparency = enabled;
        self
    }

    pub fn with_auto_mode(mut self, enabled: bool) -> Self {
        self.transparency_auto_mode = enabled;
        self
    }

    pub fn with_downsampling(mut self, max_dpi_x: u32, max_dpi_y: u32) -> Self {
        self.downsample_bitmaps = true;
        self.max_bitmap_dpi = (max_dpi_x, max_dpi_y);
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_min_area_fraction(mut self, fraction: f64) -> Self {
        self.min_area_fraction = fraction;
        self
    }

    /// The area cutoff clamped into `0.0..=1.0`, warning on bad values.
    pub fn effective_min_area(&self) -> f64 {
        let value = self.min_area_fraction;
        if value.is_nan() {
            log::warn!(
                "min_area_fraction is NaN, using {}",
                Self::DEFAULT_MIN_AREA
            );
            return Self::DEFAULT_MIN_AREA;
        }
        if value > 1.0 {
            log::warn!("min_area_fraction {value} is too high, clamping to 1.0");
        } else if value < 0.0 {
            log::warn!("min_area_fraction {value} is too low, clamping to 0.0");
        }
        value.clamp(0.0, 1.0)
    }

    /// Whether the program must be scanned for transparency at all.
    ///
    /// Explicit reduction without auto mode skips the analysis entirely.
    pub fn analyzes_transparency(&self) -> bool {
        !self.reduce_transparency || self.transparency_auto_mode
    }

    /// Whether auto mode may leave a region of `area` pixels unrasterized.
    pub fn skips_large_region(&self, area: u64, output_area: u64) -> bool {
        self.reduce_transparency
            && self.transparency_auto_mode
            && area as f64 > self.effective_min_area() * output_area as f64
    }
}
