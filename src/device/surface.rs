// src/device/surface.rs

//! Off-screen raster surfaces.
//!
//! A `Surface` covers a rectangle of device pixels and paints commands
//! replayed against a `DeviceState`. Output can be switched off per
//! command so a full program replay keeps the graphics state correct
//! while only selected commands leave ink. The backing pixel buffer is
//! owned by the surface and released when it is dropped.

use crate::device::DeviceInfo;
use crate::device::state::DeviceState;
use crate::image::geom::{Point, Rect, Size};
use crate::image::image_formats::{AlphaMask, Color, Pixel, Pixmap};
use crate::meta::action::{Action, Gradient, PolyPolygon};
use crate::meta::metafile::Metafile;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, PixmapPaint,
    PremultipliedColorU8, Stroke, Transform,
};

/// An off-screen paint target anchored at a device-pixel rectangle.
pub struct Surface {
    canvas: tiny_skia::Pixmap,
    area: Rect,
    output_enabled: bool,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("area", &self.area)
            .field("output_enabled", &self.output_enabled)
            .finish()
    }
}

impl Surface {
    /// Allocates an opaque surface over `area` filled with `background`.
    ///
    /// Returns `None` when the area is empty, exceeds `max_pixels`, or the
    /// pixel buffer cannot be allocated.
    pub fn new(area: Rect, background: Color, max_pixels: Option<u64>) -> Option<Self> {
        let mut surface = Self::allocate(area, max_pixels)?;
        let bg = if background.is_transparent() {
            Color::WHITE
        } else {
            background
        };
        surface
            .canvas
            .fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, 255));
        Some(surface)
    }

    /// A fully transparent surface, used as a compositing layer.
    fn allocate(area: Rect, max_pixels: Option<u64>) -> Option<Self> {
        if area.is_empty() || max_pixels.is_some_and(|limit| area.area() > limit) {
            return None;
        }
        let canvas = tiny_skia::Pixmap::new(area.width, area.height)?;
        Some(Surface {
            canvas,
            area,
            output_enabled: true,
        })
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn set_output_enabled(&mut self, enabled: bool) {
        self.output_enabled = enabled;
    }

    pub fn is_output_enabled(&self) -> bool {
        self.output_enabled
    }

    /// Paints `action` (if output is enabled) and applies it to `state`.
    pub fn play(&mut self, action: &Action, state: &mut DeviceState) {
        if self.output_enabled {
            self.draw(action, state);
        }
        state.execute(action);
    }

    /// Captures the surface as an opaque RGB pixmap.
    pub fn into_pixmap(self) -> Pixmap {
        let width = self.canvas.width();
        let pixels = self.canvas.pixels();
        Pixmap::from_fn(width, self.canvas.height(), |x, y| {
            let c = pixels[(y * width + x) as usize].demultiply();
            Pixel::new(c.red(), c.green(), c.blue())
        })
    }

    fn transform(&self) -> Transform {
        Transform::from_translate(-self.area.x as f32, -self.area.y as f32)
    }

    fn draw(&mut self, action: &Action, state: &DeviceState) {
        let mask = match state.clip() {
            None => None,
            Some(clip) => {
                let local = clip.intersection(&self.area);
                if local.is_empty() {
                    return;
                }
                if local == self.area {
                    None
                } else {
                    match self.clip_mask(local) {
                        Some(mask) => Some(mask),
                        None => return,
                    }
                }
            }
        };
        let mask = mask.as_ref();

        match action {
            Action::Pixel { point, color } => {
                let p = state.logic_to_pixel(*point);
                self.fill_rect(Rect::new(p.x, p.y, 1, 1), color.solid(), mask);
            }
            Action::Line { start, end, info } => {
                if state.has_line() {
                    let a = state.logic_to_pixel(*start);
                    let b = state.logic_to_pixel(*end);
                    let width = state.logic_to_pixel_width(info.width);
                    self.stroke(&[vec![a, b]], false, width, state.line_color(), mask);
                }
            }
            Action::Rect(rect) => {
                let px = state.logic_to_pixel_rect(*rect);
                self.paint_rect(px, state.fill_color(), state.line_color(), mask);
            }
            Action::Polygon(polygon) => {
                let outlines = pixel_outlines(&PolyPolygon::from(polygon.clone()), state);
                self.paint_outlines(&outlines, state.fill_color(), state.line_color(), mask);
            }
            Action::PolyPolygon(polygons) => {
                let outlines = pixel_outlines(polygons, state);
                self.paint_outlines(&outlines, state.fill_color(), state.line_color(), mask);
            }
            Action::Bmp { point, bitmap } => {
                let dest = Rect::from_point_size(state.logic_to_pixel(*point), pixel_size(bitmap));
                self.draw_bitmap(bitmap, None, dest, mask);
            }
            Action::BmpScale {
                point,
                size,
                bitmap,
            } => {
                let dest = state.logic_to_pixel_rect(Rect::from_point_size(*point, *size));
                self.draw_bitmap(bitmap, None, dest, mask);
            }
            Action::BmpScalePart {
                dest_point,
                dest_size,
                src_point,
                src_size,
                bitmap,
            } => {
                let dest = state.logic_to_pixel_rect(Rect::from_point_size(*dest_point, *dest_size));
                let part = bitmap.crop(Rect::from_point_size(*src_point, *src_size));
                self.draw_bitmap(&part, None, dest, mask);
            }
            Action::BmpEx { point, bitmap } => {
                let dest =
                    Rect::from_point_size(state.logic_to_pixel(*point), pixel_size(bitmap.pixmap()));
                self.draw_bitmap(bitmap.pixmap(), bitmap.alpha(), dest, mask);
            }
            Action::BmpExScale {
                point,
                size,
                bitmap,
            } => {
                let dest = state.logic_to_pixel_rect(Rect::from_point_size(*point, *size));
                self.draw_bitmap(bitmap.pixmap(), bitmap.alpha(), dest, mask);
            }
            Action::BmpExScalePart {
                dest_point,
                dest_size,
                src_point,
                src_size,
                bitmap,
            } => {
                let dest = state.logic_to_pixel_rect(Rect::from_point_size(*dest_point, *dest_size));
                let part = bitmap.crop(Rect::from_point_size(*src_point, *src_size));
                self.draw_bitmap(part.pixmap(), part.alpha(), dest, mask);
            }
            Action::Wallpaper { rect, color } => {
                self.fill_rect(state.logic_to_pixel_rect(*rect), color.solid(), mask);
            }
            Action::Transparent { polygons, percent } => {
                let keep = 100 - u32::from((*percent).min(100));
                if keep > 0 {
                    let fade = |c: Color| Color {
                        a: (u32::from(c.a) * keep / 100) as u8,
                        ..c
                    };
                    let outlines = pixel_outlines(polygons, state);
                    self.paint_outlines(
                        &outlines,
                        fade(state.fill_color()),
                        fade(state.line_color()),
                        mask,
                    );
                }
            }
            Action::FloatTransparent {
                program,
                point,
                size,
                gradient,
            } => {
                let dest = state.logic_to_pixel_rect(Rect::from_point_size(*point, *size));
                self.draw_float_transparent(program, dest, gradient, state, mask);
            }
            Action::Push
            | Action::Pop
            | Action::MapMode(_)
            | Action::FillColor(_)
            | Action::LineColor(_)
            | Action::ClipRegion(_)
            | Action::IntersectClipRect(_)
            | Action::Comment { .. } => {}
        }
    }

    fn clip_mask(&self, local: Rect) -> Option<Mask> {
        let mut mask = Mask::new(self.canvas.width(), self.canvas.height())?;
        let rect = skia_rect(local)?;
        mask.fill_path(
            &PathBuilder::from_rect(rect),
            FillRule::Winding,
            false,
            self.transform(),
        );
        Some(mask)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, mask: Option<&Mask>) {
        if color.is_transparent() {
            return;
        }
        if let Some(r) = skia_rect(rect) {
            let transform = self.transform();
            self.canvas.fill_rect(r, &paint(color), transform, mask);
        }
    }

    /// Fills the rectangle and outlines it along its inner edge pixels.
    fn paint_rect(&mut self, rect: Rect, fill: Color, line: Color, mask: Option<&Mask>) {
        if rect.is_empty() {
            return;
        }
        self.fill_rect(rect, fill, mask);
        if !line.is_transparent() {
            let (r, b) = (rect.x_max() - 1, rect.y_max() - 1);
            let inner = vec![
                Point::new(rect.x, rect.y),
                Point::new(r, rect.y),
                Point::new(r, b),
                Point::new(rect.x, b),
            ];
            self.stroke(&[inner], true, 0, line, mask);
        }
    }

    fn paint_outlines(
        &mut self,
        outlines: &[Vec<Point>],
        fill: Color,
        line: Color,
        mask: Option<&Mask>,
    ) {
        if !fill.is_transparent() {
            if let Some(path) = build_path(outlines, 0.0, true) {
                let transform = self.transform();
                self.canvas
                    .fill_path(&path, &paint(fill), FillRule::EvenOdd, transform, mask);
            }
        }
        if !line.is_transparent() {
            self.stroke(outlines, true, 0, line, mask);
        }
    }

    /// Strokes through pixel centres; a width of 0 or 1 is a hairline.
    fn stroke(
        &mut self,
        outlines: &[Vec<Point>],
        close: bool,
        width: u32,
        color: Color,
        mask: Option<&Mask>,
    ) {
        let Some(path) = build_path(outlines, 0.5, close) else {
            return;
        };
        let stroke = Stroke {
            width: if width <= 1 { 0.0 } else { width as f32 },
            ..Stroke::default()
        };
        let transform = self.transform();
        self.canvas
            .stroke_path(&path, &paint(color), &stroke, transform, mask);
    }

    fn draw_bitmap(
        &mut self,
        pixmap: &Pixmap,
        alpha: Option<&AlphaMask>,
        dest: Rect,
        mask: Option<&Mask>,
    ) {
        let (sw, sh) = pixmap.dimensions();
        if dest.is_empty() || sw == 0 || sh == 0 {
            return;
        }
        let Some(src) = to_skia(pixmap, alpha) else {
            return;
        };
        let transform = Transform::from_translate(
            (dest.x - self.area.x) as f32,
            (dest.y - self.area.y) as f32,
        )
        .pre_scale(dest.width as f32 / sw as f32, dest.height as f32 / sh as f32);
        let paint = PixmapPaint {
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        self.canvas
            .draw_pixmap(0, 0, src.as_ref(), &paint, transform, mask);
    }

    /// Renders `program` into a layer, fades the layer through `gradient`
    /// inside `dest`, and composites it.
    fn draw_float_transparent(
        &mut self,
        program: &Metafile,
        dest: Rect,
        gradient: &Gradient,
        state: &DeviceState,
        mask: Option<&Mask>,
    ) {
        if dest.intersection(&self.area).is_empty() {
            return;
        }
        let Some(mut layer) = Surface::allocate(self.area, None) else {
            log::debug!("No layer for float transparency over {:?}", self.area);
            return;
        };

        let mut nested = state.clone();
        nested.clear_stack();
        for action in program {
            layer.play(action, &mut nested);
        }

        let width = layer.canvas.width();
        let origin = self.area.top_left();
        for (i, px) in layer.canvas.pixels_mut().iter_mut().enumerate() {
            let x = origin.x + (i as u32 % width) as i32;
            let y = origin.y + (i as u32 / width) as i32;
            if !dest.contains(x, y) {
                *px = PremultipliedColorU8::TRANSPARENT;
                continue;
            }
            let f = u32::from(gradient.opacity_at((y - dest.y) as u32, dest.height));
            let scale = |c: u8| (u32::from(c) * f / 255) as u8;
            *px = PremultipliedColorU8::from_rgba(
                scale(px.red()),
                scale(px.green()),
                scale(px.blue()),
                scale(px.alpha()),
            )
            .unwrap_or(PremultipliedColorU8::TRANSPARENT);
        }

        self.canvas.draw_pixmap(
            0,
            0,
            layer.canvas.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            mask,
        );
    }
}

/// Rasterizes a whole program over `background`, covering `area`.
///
/// Returns `None` if no surface of that size can be allocated.
pub fn render_program(
    program: &Metafile,
    device: &DeviceInfo,
    area: Rect,
    background: Color,
) -> Option<Pixmap> {
    let mut surface = Surface::new(area, background, device.max_surface_pixels())?;
    let mut state = DeviceState::new(device);
    for action in program {
        surface.play(action, &mut state);
    }
    Some(surface.into_pixmap())
}

fn pixel_size(pixmap: &Pixmap) -> Size {
    Size::new(pixmap.width(), pixmap.height())
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = false;
    paint
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )
}

fn pixel_outlines(polygons: &PolyPolygon, state: &DeviceState) -> Vec<Vec<Point>> {
    polygons
        .polygons()
        .iter()
        .map(|poly| {
            poly.points()
                .iter()
                .map(|p| state.logic_to_pixel(*p))
                .collect()
        })
        .collect()
}

fn build_path(outlines: &[Vec<Point>], offset: f32, close: bool) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for outline in outlines {
        let mut points = outline.iter();
        let Some(first) = points.next() else {
            continue;
        };
        pb.move_to(first.x as f32 + offset, first.y as f32 + offset);
        for p in points {
            pb.line_to(p.x as f32 + offset, p.y as f32 + offset);
        }
        if close {
            pb.close();
        }
    }
    pb.finish()
}

fn to_skia(pixmap: &Pixmap, alpha: Option<&AlphaMask>) -> Option<tiny_skia::Pixmap> {
    let mut out = tiny_skia::Pixmap::new(pixmap.width(), pixmap.height())?;
    let coverage = alpha.map(AlphaMask::pixels);
    for (i, (dst, src)) in out
        .pixels_mut()
        .iter_mut()
        .zip(pixmap.pixels())
        .enumerate()
    {
        let a = coverage.map_or(255, |c| c[i].y);
        *dst = ColorU8::from_rgba(src.r, src.g, src.b, a).premultiply();
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::image_formats::{BitmapEx, GrayPixel};
    use crate::meta::action::Polygon;

    fn device() -> DeviceInfo {
        DeviceInfo::new(96, 96, Rect::new(0, 0, 100, 100)).expect("valid device")
    }

    #[test]
    fn test_rect_fill_is_pixel_exact() {
        let program = Metafile::from_actions(vec![
            Action::LineColor(Color::TRANSPARENT),
            Action::FillColor(Color::rgb(255, 0, 0)),
            Action::Rect(Rect::new(2, 3, 4, 5)),
        ]);
        let img = render_program(&program, &device(), Rect::new(0, 0, 10, 10), Color::WHITE)
            .expect("surface");
        assert_eq!(img.get_pixel(2, 3), Pixel::new(255, 0, 0));
        assert_eq!(img.get_pixel(5, 7), Pixel::new(255, 0, 0));
        assert_eq!(img.get_pixel(6, 7), Pixel::white());
        assert_eq!(img.get_pixel(5, 8), Pixel::white());
        assert_eq!(img.get_pixel(1, 3), Pixel::white());
    }

    #[test]
    fn test_surface_area_is_offset() {
        let program = Metafile::from_actions(vec![
            Action::LineColor(Color::TRANSPARENT),
            Action::FillColor(Color::BLACK),
            Action::Rect(Rect::new(10, 10, 2, 2)),
        ]);
        let img = render_program(&program, &device(), Rect::new(10, 10, 4, 4), Color::WHITE)
            .expect("surface");
        assert_eq!(img.get_pixel(0, 0), Pixel::black());
        assert_eq!(img.get_pixel(1, 1), Pixel::black());
        assert_eq!(img.get_pixel(2, 2), Pixel::white());
    }

    #[test]
    fn test_output_gating_keeps_state() {
        let dev = device();
        let mut surface = Surface::new(Rect::new(0, 0, 8, 8), Color::WHITE, None).expect("surface");
        let mut state = DeviceState::new(&dev);
        surface.set_output_enabled(false);
        surface.play(&Action::LineColor(Color::TRANSPARENT), &mut state);
        surface.play(&Action::FillColor(Color::BLACK), &mut state);
        surface.play(&Action::Rect(Rect::new(0, 0, 4, 4)), &mut state);
        surface.set_output_enabled(true);
        surface.play(&Action::Rect(Rect::new(4, 4, 4, 4)), &mut state);

        let img = surface.into_pixmap();
        assert_eq!(img.get_pixel(0, 0), Pixel::white());
        assert_eq!(img.get_pixel(5, 5), Pixel::black());
    }

    #[test]
    fn test_clip_limits_painting() {
        let program = Metafile::from_actions(vec![
            Action::LineColor(Color::TRANSPARENT),
            Action::FillColor(Color::BLACK),
            Action::ClipRegion(Some(Rect::new(0, 0, 5, 10))),
            Action::Rect(Rect::new(0, 0, 10, 10)),
        ]);
        let img = render_program(&program, &device(), Rect::new(0, 0, 10, 10), Color::WHITE)
            .expect("surface");
        assert_eq!(img.get_pixel(4, 4), Pixel::black());
        assert_eq!(img.get_pixel(5, 4), Pixel::white());
    }

    #[test]
    fn test_transparent_polygon_blends() {
        let program = Metafile::from_actions(vec![
            Action::LineColor(Color::TRANSPARENT),
            Action::FillColor(Color::BLACK),
            Action::Transparent {
                polygons: PolyPolygon::from(Polygon::from_rect(Rect::new(0, 0, 4, 4))),
                percent: 50,
            },
        ]);
        let img = render_program(&program, &device(), Rect::new(0, 0, 4, 4), Color::WHITE)
            .expect("surface");
        let p = img.get_pixel(1, 1);
        assert!(p.r > 110 && p.r < 145, "expected mid grey, got {p:?}");
    }

    #[test]
    fn test_alpha_bitmap_composites() {
        let bitmap = BitmapEx::with_alpha(
            Pixmap::from_pixel(2, 1, Pixel::black()),
            AlphaMask::from_vec(2, 1, vec![GrayPixel::new(0), GrayPixel::new(255)])
                .expect("mask"),
        )
        .expect("bitmap");
        let program = Metafile::from_actions(vec![Action::BmpEx {
            point: Point::new(0, 0),
            bitmap,
        }]);
        let img = render_program(&program, &device(), Rect::new(0, 0, 2, 1), Color::WHITE)
            .expect("surface");
        assert_eq!(img.get_pixel(0, 0), Pixel::white());
        assert_eq!(img.get_pixel(1, 0), Pixel::black());
    }

    #[test]
    fn test_surface_budget() {
        assert!(Surface::new(Rect::new(0, 0, 10, 10), Color::WHITE, Some(99)).is_none());
        assert!(Surface::new(Rect::new(0, 0, 10, 10), Color::WHITE, Some(100)).is_some());
        assert!(Surface::new(Rect::empty(), Color::WHITE, None).is_none());
    }
}
