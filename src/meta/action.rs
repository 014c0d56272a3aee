// src/meta/action.rs

//! Drawing commands that make up a replayable program.
//!
//! `Action` is a closed sum type; every concern that depends on the kind of
//! command (bounds, ink, transparency, rendering) matches on it directly.

use crate::device::map_mode::MapMode;
use crate::image::geom::{Point, Rect, Size};
use crate::image::image_formats::{BitmapEx, Color, Pixmap};
use crate::meta::metafile::Metafile;

/// An open or closed outline in logic coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Polygon { points }
    }

    /// The closed outline of `rect`, clockwise from the top-left corner.
    pub fn from_rect(rect: Rect) -> Self {
        let (l, t, r, b) = (rect.x, rect.y, rect.x_max(), rect.y_max());
        Polygon::new(vec![
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest rectangle spanning all points.
    pub fn bound_rect(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::empty();
        };
        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }
        Rect::from_ltrb(l, t, r, b)
    }

    /// Checks whether the outline is an axis-aligned rectangle.
    ///
    /// A repeated closing point is ignored; what remains must be four
    /// corners joined by alternating horizontal and vertical edges.
    pub fn is_rectangle(&self) -> bool {
        let mut pts: &[Point] = &self.points;
        if pts.len() == 5 && pts[0] == pts[4] {
            pts = &pts[..4];
        }
        if pts.len() != 4 {
            return false;
        }

        let horizontal = |a: Point, b: Point| a.y == b.y && a.x != b.x;
        let vertical = |a: Point, b: Point| a.x == b.x && a.y != b.y;
        let edges: Vec<(Point, Point)> = (0..4).map(|i| (pts[i], pts[(i + 1) % 4])).collect();

        let starts_horizontal = edges
            .iter()
            .enumerate()
            .all(|(i, &(a, b))| if i % 2 == 0 { horizontal(a, b) } else { vertical(a, b) });
        let starts_vertical = edges
            .iter()
            .enumerate()
            .all(|(i, &(a, b))| if i % 2 == 0 { vertical(a, b) } else { horizontal(a, b) });
        starts_horizontal || starts_vertical
    }
}

/// A set of polygons filled together with the even-odd rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolyPolygon {
    polygons: Vec<Polygon>,
}

impl PolyPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        PolyPolygon { polygons }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn bound_rect(&self) -> Rect {
        self.polygons
            .iter()
            .map(Polygon::bound_rect)
            .fold(Rect::empty(), |acc, r| acc.union(&r))
    }
}

impl From<Polygon> for PolyPolygon {
    fn from(polygon: Polygon) -> Self {
        PolyPolygon::new(vec![polygon])
    }
}

/// Stroke attributes for lines. A width of 0 is a one-pixel hairline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineInfo {
    pub width: u32,
}

/// A vertical linear transparency gradient.
///
/// Luminance encodes transparency: white is fully transparent, black fully
/// opaque. `start` applies at the top edge, `end` at the bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gradient {
    pub start: Color,
    pub end: Color,
}

impl Gradient {
    pub fn new(start: Color, end: Color) -> Self {
        Gradient { start, end }
    }

    /// Opacity (0..=255) at `step` of `steps` rows from the top.
    pub fn opacity_at(&self, step: u32, steps: u32) -> u8 {
        let mix = |a: u8, b: u8| {
            if steps <= 1 {
                return a;
            }
            let (a, b) = (i64::from(a), i64::from(b));
            let t = i64::from(step.min(steps - 1));
            (a + (b - a) * t / i64::from(steps - 1)) as u8
        };
        let c = Color::rgb(
            mix(self.start.r, self.end.r),
            mix(self.start.g, self.end.g),
            mix(self.start.b, self.end.b),
        );
        255 - c.luminance()
    }
}

/// A single command of a drawing program.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Sets one pixel to `color`.
    Pixel { point: Point, color: Color },
    /// Draws a line in the current line color.
    Line {
        start: Point,
        end: Point,
        info: LineInfo,
    },
    /// Fills and outlines a rectangle with the current colors.
    Rect(Rect),
    Polygon(Polygon),
    PolyPolygon(PolyPolygon),
    /// Paints an opaque bitmap at its native pixel size.
    Bmp { point: Point, bitmap: Pixmap },
    BmpScale {
        point: Point,
        size: Size,
        bitmap: Pixmap,
    },
    BmpScalePart {
        dest_point: Point,
        dest_size: Size,
        src_point: Point,
        src_size: Size,
        bitmap: Pixmap,
    },
    /// Paints a bitmap that may carry an alpha plane.
    BmpEx { point: Point, bitmap: BitmapEx },
    BmpExScale {
        point: Point,
        size: Size,
        bitmap: BitmapEx,
    },
    BmpExScalePart {
        dest_point: Point,
        dest_size: Size,
        src_point: Point,
        src_size: Size,
        bitmap: BitmapEx,
    },
    /// Fills `rect` with a solid wallpaper color.
    Wallpaper { rect: Rect, color: Color },
    /// Paints a polygon set with the current colors at `percent`
    /// transparency (0 opaque, 100 invisible).
    Transparent { polygons: PolyPolygon, percent: u16 },
    /// Paints a nested program through a transparency gradient.
    FloatTransparent {
        program: Box<Metafile>,
        point: Point,
        size: Size,
        gradient: Gradient,
    },
    /// Saves the graphics state.
    Push,
    /// Restores the most recently saved graphics state.
    Pop,
    MapMode(MapMode),
    FillColor(Color),
    LineColor(Color),
    /// Replaces the clip rectangle; `None` removes clipping.
    ClipRegion(Option<Rect>),
    IntersectClipRect(Rect),
    Comment { text: String, value: i32 },
}

impl Action {
    /// Short, stable name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Pixel { .. } => "Pixel",
            Action::Line { .. } => "Line",
            Action::Rect(_) => "Rect",
            Action::Polygon(_) => "Polygon",
            Action::PolyPolygon(_) => "PolyPolygon",
            Action::Bmp { .. } => "Bmp",
            Action::BmpScale { .. } => "BmpScale",
            Action::BmpScalePart { .. } => "BmpScalePart",
            Action::BmpEx { .. } => "BmpEx",
            Action::BmpExScale { .. } => "BmpExScale",
            Action::BmpExScalePart { .. } => "BmpExScalePart",
            Action::Wallpaper { .. } => "Wallpaper",
            Action::Transparent { .. } => "Transparent",
            Action::FloatTransparent { .. } => "FloatTransparent",
            Action::Push => "Push",
            Action::Pop => "Pop",
            Action::MapMode(_) => "MapMode",
            Action::FillColor(_) => "FillColor",
            Action::LineColor(_) => "LineColor",
            Action::ClipRegion(_) => "ClipRegion",
            Action::IntersectClipRect(_) => "IntersectClipRect",
            Action::Comment { .. } => "Comment",
        }
    }

    /// True for commands that only change replay state and never paint.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Action::Push
                | Action::Pop
                | Action::MapMode(_)
                | Action::FillColor(_)
                | Action::LineColor(_)
                | Action::ClipRegion(_)
                | Action::IntersectClipRect(_)
                | Action::Comment { .. }
        )
    }

    /// Whether the command paints with partial transparency.
    pub fn is_transparent(&self) -> bool {
        match self {
            Action::Transparent { percent, .. } => *percent > 0,
            Action::FloatTransparent { .. } => true,
            Action::BmpEx { bitmap, .. }
            | Action::BmpExScale { bitmap, .. }
            | Action::BmpExScalePart { bitmap, .. } => bitmap.has_transparency(),
            _ => false,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Action::Comment {
            text: text.into(),
            value: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_detection() {
        let rect = Polygon::from_rect(Rect::new(0, 0, 10, 20));
        assert!(rect.is_rectangle());
        assert_eq!(rect.bound_rect(), Rect::new(0, 0, 10, 20));

        let mut closed = rect.points().to_vec();
        closed.push(closed[0]);
        assert!(Polygon::new(closed).is_rectangle());

        let vertical_first = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(0, 5),
            Point::new(5, 5),
            Point::new(5, 0),
        ]);
        assert!(vertical_first.is_rectangle());

        let diamond = Polygon::new(vec![
            Point::new(5, 0),
            Point::new(10, 5),
            Point::new(5, 10),
            Point::new(0, 5),
        ]);
        assert!(!diamond.is_rectangle());

        let triangle = Polygon::new(vec![Point::new(0, 0), Point::new(5, 0), Point::new(0, 5)]);
        assert!(!triangle.is_rectangle());
    }

    #[test]
    fn test_gradient_opacity() {
        let g = Gradient::new(Color::BLACK, Color::WHITE);
        assert_eq!(g.opacity_at(0, 11), 255);
        assert_eq!(g.opacity_at(10, 11), 0);
        assert_eq!(Gradient::new(Color::WHITE, Color::WHITE).opacity_at(3, 4), 0);
    }

    #[test]
    fn test_transparency_reporting() {
        let poly = PolyPolygon::from(Polygon::from_rect(Rect::new(0, 0, 4, 4)));
        assert!(
            Action::Transparent {
                polygons: poly.clone(),
                percent: 30
            }
            .is_transparent()
        );
        assert!(
            !Action::Transparent {
                polygons: poly,
                percent: 0
            }
            .is_transparent()
        );
        assert!(!Action::Rect(Rect::new(0, 0, 1, 1)).is_transparent());
        assert!(Action::Push.is_state_change());
        assert!(!Action::Rect(Rect::new(0, 0, 1, 1)).is_state_change());
    }
}
