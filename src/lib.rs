//! Transparency flattening for print output.
//!
//! Printers and many page description backends cannot composite alpha. This
//! crate takes a drawing program (a [`Metafile`]) and rewrites it so that it
//! paints the same page without any transparency: regions where transparent
//! content overlaps other ink are rasterized into opaque bitmap tiles, and
//! everything else stays vector output.
//!
//! # Quick Start
//!
//! ```ignore
//! use print_flatten::{Action, Color, DeviceInfo, Metafile, Point, Rect, Size};
//! use print_flatten::{ReductionConfig, remove_transparencies};
//!
//! // A4 @ 300dpi printer, printable area starting 50px into the paper
//! let device = DeviceInfo::printer(300, 300, Size::new(2480, 3508), Point::new(50, 50))?;
//!
//! let page = Metafile::from_actions(vec![
//!     Action::FillColor(Color::rgb(200, 30, 30)),
//!     Action::Rect(Rect::new(100, 100, 800, 600)),
//!     // ... transparent content ...
//! ]);
//!
//! let reduction = remove_transparencies(&page, &device, &ReductionConfig::default());
//! if reduction.changed {
//!     send_to_printer(&reduction.metafile);
//! }
//! ```
//!
//! # Pipeline
//!
//! - **Background**: a leading run of opaque, mutually covering rectangles is
//!   copied through and provides the blend color
//! - **Components**: overlapping commands are merged into connected components
//! - **Flattening**: components mixing transparency with other ink are
//!   rasterized in device-sized tiles
//! - **Conversion**: transparency painted straight onto the background is
//!   pre-blended into opaque commands

pub mod device;
pub mod image;
pub mod meta;
pub mod reduce;
pub mod utils;

// Device description
pub use device::{DeviceInfo, MapMode, MapUnit, render_program};

// Drawing program
pub use meta::{Action, Gradient, LineInfo, Metafile, PolyPolygon, Polygon};

// Geometry and image types
pub use image::{AlphaMask, BitmapEx, Color, Point, Pixel, Pixmap, Rect, Size};

// Reduction API
pub use reduce::{Reduction, ReductionConfig, ReductionStats, TransparencyReducer, remove_transparencies};

// Error types
pub use utils::error::{FlattenError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_reduces_a_page() -> Result<()> {
        let device = DeviceInfo::printer(72, 72, Size::new(200, 200), Point::new(0, 0))?;
        let page = Metafile::from_actions(vec![Action::Transparent {
            polygons: PolyPolygon::from(Polygon::from_rect(Rect::new(10, 10, 20, 20))),
            percent: 50,
        }]);
        let reduction = TransparencyReducer::new(device).reduce(&page);
        assert!(reduction.changed);
        assert!(!reduction.metafile.has_transparent_actions());
        Ok(())
    }
}
