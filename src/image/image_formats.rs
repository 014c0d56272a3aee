// src/image/image_formats.rs

//! In-memory representations for colors and bitmaps.
//!
//! `Pixmap` is an opaque RGB image, `AlphaMask` an 8-bit coverage plane
//! (255 = opaque), and `BitmapEx` pairs the two the way alpha bitmaps are
//! carried inside a drawing program. Flattening an alpha bitmap onto a solid
//! color uses the same fixed-point stencil arithmetic as layer compositing.

use crate::image::geom::Rect;
use crate::utils::error::{FlattenError, Result};
use bytemuck::{Pod, Zeroable};
use std::io::Write;

// --- Color ---

/// An RGBA color with 8-bit components.
///
/// Alpha 0 doubles as the "no color" sentinel: a transparent line color
/// means no outline, a transparent fill color means no fill.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// The color as a non-compositing device paints it: fully transparent
    /// stays invisible, any other alpha is dropped.
    pub fn solid(&self) -> Color {
        if self.is_transparent() {
            *self
        } else {
            Color::rgb(self.r, self.g, self.b)
        }
    }

    /// Mixes `self` with `background` as if painted with `percent`
    /// transparency (0 = `self`, 100 = `background`). The result is opaque.
    pub fn blend_percent(&self, background: Color, percent: u16) -> Color {
        let t = u32::from(percent.min(100));
        let mix = |fg: u8, bg: u8| ((u32::from(bg) * t + u32::from(fg) * (100 - t)) / 100) as u8;
        Color::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }

    /// Perceived brightness in 0..=255.
    pub fn luminance(&self) -> u8 {
        ((u32::from(self.r) * 77 + u32::from(self.g) * 151 + u32::from(self.b) * 28) >> 8) as u8
    }
}

// --- Pixel Type Definitions ---

/// A single RGB pixel with 8-bit components.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Pixel { r, g, b }
    }

    pub fn black() -> Self {
        Pixel { r: 0, g: 0, b: 0 }
    }

    pub fn white() -> Self {
        Pixel {
            r: 255,
            g: 255,
            b: 255,
        }
    }
}

impl From<Color> for Pixel {
    fn from(c: Color) -> Self {
        Pixel::new(c.r, c.g, c.b)
    }
}

impl From<[u8; 3]> for Pixel {
    fn from(arr: [u8; 3]) -> Self {
        Pixel {
            r: arr[0],
            g: arr[1],
            b: arr[2],
        }
    }
}

/// A single 8-bit coverage value.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GrayPixel {
    pub y: u8,
}

impl GrayPixel {
    pub fn new(y: u8) -> Self {
        GrayPixel { y }
    }

    pub fn opaque() -> Self {
        GrayPixel { y: 255 }
    }
}

fn checked_len(width: u32, height: u32, actual: usize) -> Result<()> {
    let expected = width as usize * height as usize;
    if expected != actual {
        return Err(FlattenError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

// --- Pixmap Type (Color Image Buffer) ---

/// A 2D buffer of opaque color pixels, stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<Pixel>,
}

impl Pixmap {
    /// Creates a new pixmap with the given dimensions, initialized to black.
    pub fn new(width: u32, height: u32) -> Self {
        Pixmap::from_pixel(width, height, Pixel::black())
    }

    /// Creates a pixmap from a raw vector of pixels in row-major order.
    pub fn from_vec(width: u32, height: u32, data: Vec<Pixel>) -> Result<Self> {
        checked_len(width, height, data.len())?;
        Ok(Pixmap {
            width,
            height,
            data,
        })
    }

    /// Creates a pixmap filled with a single pixel value.
    pub fn from_pixel(width: u32, height: u32, pixel: Pixel) -> Self {
        Pixmap {
            width,
            height,
            data: vec![pixel; width as usize * height as usize],
        }
    }

    /// Creates a pixmap by calling a function for each pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> Pixel,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Pixmap {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the dimensions as a tuple (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        assert!(x < self.width && y < self.height);
        self.data[(y * self.width + x) as usize]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        assert!(x < self.width && y < self.height);
        self.data[(y * self.width + x) as usize] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.data
    }

    /// Returns raw pixel data as a byte slice.
    pub fn as_raw(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Copies out the part of the pixmap covered by `area`, clipped to the
    /// pixmap bounds.
    pub fn crop(&self, area: Rect) -> Pixmap {
        let clipped = area.intersection(&Rect::new(0, 0, self.width, self.height));
        Pixmap::from_fn(clipped.width, clipped.height, |x, y| {
            self.get_pixel(clipped.x as u32 + x, clipped.y as u32 + y)
        })
    }

    /// Box-filters the pixmap down to `width` x `height`.
    ///
    /// Sizes larger than the current ones are clamped; each target pixel
    /// averages the source pixels its footprint covers.
    pub fn downsample(&self, width: u32, height: u32) -> Pixmap {
        let width = width.clamp(1, self.width.max(1));
        let height = height.clamp(1, self.height.max(1));
        if (width, height) == self.dimensions() || self.data.is_empty() {
            return self.clone();
        }

        let (sw, sh) = (u64::from(self.width), u64::from(self.height));
        Pixmap::from_fn(width, height, |x, y| {
            let x0 = u64::from(x) * sw / u64::from(width);
            let x1 = ((u64::from(x) + 1) * sw / u64::from(width)).max(x0 + 1);
            let y0 = u64::from(y) * sh / u64::from(height);
            let y1 = ((u64::from(y) + 1) * sh / u64::from(height)).max(y0 + 1);

            let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let p = self.get_pixel(sx as u32, sy as u32);
                    r += u64::from(p.r);
                    g += u64::from(p.g);
                    b += u64::from(p.b);
                }
            }
            let n = (x1 - x0) * (y1 - y0);
            Pixel::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
        })
    }

    /// Writes the pixmap as a binary PPM (P6) image.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        out.write_all(self.as_raw())?;
        Ok(())
    }
}

// --- AlphaMask Type (coverage plane) ---

/// An 8-bit coverage plane; 255 is opaque, 0 fully transparent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    data: Vec<GrayPixel>,
}

impl AlphaMask {
    /// Creates a mask filled with a single coverage value.
    pub fn from_pixel(width: u32, height: u32, pixel: GrayPixel) -> Self {
        AlphaMask {
            width,
            height,
            data: vec![pixel; width as usize * height as usize],
        }
    }

    pub fn from_vec(width: u32, height: u32, data: Vec<GrayPixel>) -> Result<Self> {
        checked_len(width, height, data.len())?;
        Ok(AlphaMask {
            width,
            height,
            data,
        })
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

    pub fn get_pixel(&self, x: u32, y: u32) -> GrayPixel {
        assert!(x < self.width && y < self.height);
        self.data[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[GrayPixel] {
        &self.data
    }

    /// True when every entry is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.data.iter().all(|p| p.y == 255)
    }

    pub fn crop(&self, area: Rect) -> AlphaMask {
        let clipped = area.intersection(&Rect::new(0, 0, self.width, self.height));
        let mut data = Vec::with_capacity(clipped.area() as usize);
        for y in 0..clipped.height {
            for x in 0..clipped.width {
                data.push(self.get_pixel(clipped.x as u32 + x, clipped.y as u32 + y));
            }
        }
        AlphaMask {
            width: clipped.width,
            height: clipped.height,
            data,
        }
    }
}

// --- BitmapEx (color + optional alpha) ---

/// A color bitmap with an optional alpha plane of the same dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitmapEx {
    pixmap: Pixmap,
    alpha: Option<AlphaMask>,
}

impl BitmapEx {
    /// Wraps an opaque pixmap.
    pub fn new(pixmap: Pixmap) -> Self {
        BitmapEx {
            pixmap,
            alpha: None,
        }
    }

    /// Pairs a pixmap with an alpha plane; both must have the same size.
    pub fn with_alpha(pixmap: Pixmap, alpha: AlphaMask) -> Result<Self> {
        if pixmap.dimensions() != alpha.dimensions() {
            return Err(FlattenError::DimensionMismatch {
                expected: pixmap.pixels().len(),
                actual: alpha.pixels().len(),
            });
        }
        Ok(BitmapEx {
            pixmap,
            alpha: Some(alpha),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn alpha(&self) -> Option<&AlphaMask> {
        self.alpha.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixmap.dimensions()
    }

    /// True when the alpha plane makes any pixel less than opaque.
    pub fn has_transparency(&self) -> bool {
        self.alpha.as_ref().is_some_and(|a| !a.is_opaque())
    }

    pub fn crop(&self, area: Rect) -> BitmapEx {
        BitmapEx {
            pixmap: self.pixmap.crop(area),
            alpha: self.alpha.as_ref().map(|a| a.crop(area)),
        }
    }

    /// Composites the bitmap over a solid `background`, producing an
    /// opaque pixmap.
    ///
    /// New Color = `Background * (1 - Alpha) + Foreground * Alpha`.
    pub fn blend(&self, background: Color) -> Pixmap {
        let Some(alpha) = &self.alpha else {
            return self.pixmap.clone();
        };

        let multipliers: Vec<i32> = (0..=255).map(|i| 0x10000 * i / 255).collect();
        let bg = Pixel::from(background);
        let data = self
            .pixmap
            .pixels()
            .iter()
            .zip(alpha.pixels())
            .map(|(fg, a)| match a.y {
                0 => bg,
                255 => *fg,
                level => {
                    let level = multipliers[level as usize];
                    let mix = |b: u8, f: u8| {
                        let (b, f) = (i32::from(b), i32::from(f));
                        (b - (((b - f) * level) >> 16)) as u8
                    };
                    Pixel::new(mix(bg.r, fg.r), mix(bg.g, fg.g), mix(bg.b, fg.b))
                }
            })
            .collect();
        Pixmap {
            width: self.pixmap.width,
            height: self.pixmap.height,
            data,
        }
    }
}

impl From<Pixmap> for BitmapEx {
    fn from(pixmap: Pixmap) -> Self {
        BitmapEx::new(pixmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_percent() {
        let red = Color::rgb(255, 0, 0);
        assert_eq!(red.blend_percent(Color::WHITE, 0), red);
        assert_eq!(red.blend_percent(Color::WHITE, 100), Color::WHITE);
        assert_eq!(red.blend_percent(Color::WHITE, 50), Color::rgb(255, 127, 127));
    }

    #[test]
    fn test_solid_drops_partial_alpha() {
        assert_eq!(Color::rgba(10, 20, 30, 128).solid(), Color::rgb(10, 20, 30));
        assert_eq!(Color::rgba(10, 20, 30, 1).solid(), Color::rgb(10, 20, 30));
        assert!(Color::TRANSPARENT.solid().is_transparent());
        assert_eq!(Color::WHITE.solid(), Color::WHITE);
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = Pixmap::from_vec(2, 2, vec![Pixel::white(); 3]);
        assert!(matches!(
            err,
            Err(FlattenError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_blend_against_background() -> Result<()> {
        let fg = Pixmap::from_pixel(3, 1, Pixel::black());
        let alpha = AlphaMask::from_vec(
            3,
            1,
            vec![GrayPixel::new(0), GrayPixel::new(255), GrayPixel::new(128)],
        )?;
        let bmp = BitmapEx::with_alpha(fg, alpha)?;
        assert!(bmp.has_transparency());

        let flat = bmp.blend(Color::rgb(200, 100, 0));
        assert_eq!(flat.get_pixel(0, 0), Pixel::new(200, 100, 0));
        assert_eq!(flat.get_pixel(1, 0), Pixel::black());
        let mid = flat.get_pixel(2, 0);
        assert!(mid.r > 90 && mid.r < 110, "half coverage, got {mid:?}");
        Ok(())
    }

    #[test]
    fn test_opaque_alpha_is_not_transparency() -> Result<()> {
        let bmp = BitmapEx::with_alpha(
            Pixmap::new(2, 2),
            AlphaMask::from_pixel(2, 2, GrayPixel::opaque()),
        )?;
        assert!(!bmp.has_transparency());
        Ok(())
    }

    #[test]
    fn test_downsample_averages_blocks() {
        let src = Pixmap::from_fn(4, 2, |x, _| {
            if x % 2 == 0 { Pixel::black() } else { Pixel::white() }
        });
        let small = src.downsample(2, 1);
        assert_eq!(small.dimensions(), (2, 1));
        assert_eq!(small.get_pixel(0, 0), Pixel::new(127, 127, 127));
        assert_eq!(src.downsample(8, 8).dimensions(), (4, 2));
    }

    #[test]
    fn test_crop_is_clipped() {
        let src = Pixmap::from_fn(4, 4, |x, y| Pixel::new(x as u8, y as u8, 0));
        let part = src.crop(Rect::new(2, 3, 5, 5));
        assert_eq!(part.dimensions(), (2, 1));
        assert_eq!(part.get_pixel(1, 0), Pixel::new(3, 3, 0));
    }

    #[test]
    fn test_write_ppm_header() -> Result<()> {
        let mut out = Vec::new();
        Pixmap::from_pixel(2, 1, Pixel::white()).write_ppm(&mut out)?;
        assert!(out.starts_with(b"P6\n2 1\n255\n"));
        assert_eq!(out.len(), 11 + 6);
        Ok(())
    }
}
