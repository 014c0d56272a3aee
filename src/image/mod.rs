//! Geometry and bitmap types shared by the replay and reduction stages.

pub mod geom;
pub mod image_formats;

pub use geom::{Fraction, Point, Rect, Size};
pub use image_formats::{AlphaMask, BitmapEx, Color, GrayPixel, Pixel, Pixmap};
