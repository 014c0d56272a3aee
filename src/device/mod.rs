//! Target device description, replay state and off-screen rasterization.

pub mod map_mode;
pub mod state;
pub mod surface;

pub use map_mode::{MapMode, MapUnit};
pub use state::DeviceState;
pub use surface::{Surface, render_program};

use crate::image::geom::{Point, Rect, Size};
use crate::utils::error::{FlattenError, Result};

/// Properties of the output device a program is being prepared for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    dpi_x: u32,
    dpi_y: u32,
    /// Paintable area in device pixels.
    output_rect: Rect,
    /// Largest off-screen surface rasterized at once; `None` renders each
    /// region in one piece.
    tile_size: Option<Size>,
    /// Upper bound on pixels per off-screen surface. Larger requests fail
    /// the same way an exhausted graphics backend would.
    max_surface_pixels: Option<u64>,
}

impl DeviceInfo {
    /// Tile limit used for printers.
    pub const PRINTER_TILE: Size = Size {
        width: 1024,
        height: 1024,
    };

    /// A device that renders regions in one piece (e.g. a PDF writer).
    pub fn new(dpi_x: u32, dpi_y: u32, output_rect: Rect) -> Result<Self> {
        if dpi_x == 0 || dpi_y == 0 {
            return Err(FlattenError::InvalidResolution { x: dpi_x, y: dpi_y });
        }
        Ok(DeviceInfo {
            dpi_x,
            dpi_y,
            output_rect,
            tile_size: None,
            max_surface_pixels: None,
        })
    }

    /// A printer whose paper starts `page_offset` pixels before the
    /// printable origin. Printers rasterize in tiles.
    pub fn printer(dpi_x: u32, dpi_y: u32, paper: Size, page_offset: Point) -> Result<Self> {
        let output_rect = Rect::new(-page_offset.x, -page_offset.y, paper.width, paper.height);
        Ok(DeviceInfo::new(dpi_x, dpi_y, output_rect)?.with_tiling(Self::PRINTER_TILE)?)
    }

    pub fn with_tiling(mut self, tile: Size) -> Result<Self> {
        if tile.is_empty() {
            return Err(FlattenError::InvalidArg(format!(
                "tile size must be non-zero, got {}x{}",
                tile.width, tile.height
            )));
        }
        self.tile_size = Some(tile);
        Ok(self)
    }

    pub fn with_max_surface_pixels(mut self, pixels: u64) -> Self {
        self.max_surface_pixels = Some(pixels);
        self
    }

    pub fn dpi_x(&self) -> u32 {
        self.dpi_x
    }

    pub fn dpi_y(&self) -> u32 {
        self.dpi_y
    }

    pub fn output_rect(&self) -> Rect {
        self.output_rect
    }

    pub fn tile_size(&self) -> Option<Size> {
        self.tile_size
    }

    pub fn max_surface_pixels(&self) -> Option<u64> {
        self.max_surface_pixels
    }

    /// Area covered by the device background color when one is configured.
    pub fn background_bounds(&self) -> Rect {
        self.output_rect
    }
}
