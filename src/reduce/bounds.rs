// src/reduce/bounds.rs

//! Device-pixel footprint of drawing commands.

use crate::device::state::DeviceState;
use crate::image::geom::{Point, Rect, Size};
use crate::meta::action::{Action, PolyPolygon};

/// The device-pixel rectangle `action` can paint, limited to the active
/// clip. State-changing commands have empty bounds.
///
/// `state` must hold the graphics state in force when the command runs.
pub fn action_bounds(action: &Action, state: &DeviceState) -> Rect {
    let raw = footprint(action, state);
    match state.clip() {
        Some(clip) if !raw.is_empty() => raw.intersection(&clip),
        _ => raw,
    }
}

fn footprint(action: &Action, state: &DeviceState) -> Rect {
    match action {
        Action::Pixel { point, .. } => {
            Rect::from_point_size(state.logic_to_pixel(*point), Size::new(1, 1))
        }
        Action::Line { start, end, info } => {
            let a = state.logic_to_pixel(*start);
            let b = state.logic_to_pixel(*end);
            let line = Rect::from_ltrb(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x) + 1, a.y.max(b.y) + 1);
            let width = state.logic_to_pixel_width(info.width);
            if width > 1 {
                let half = width.div_ceil(2) as i32;
                line.inflate(half, half)
            } else {
                line
            }
        }
        Action::Rect(rect) => state.logic_to_pixel_rect(*rect),
        Action::Polygon(polygon) => {
            outline_bounds(&PolyPolygon::from(polygon.clone()), state)
        }
        Action::PolyPolygon(polygons) | Action::Transparent { polygons, .. } => {
            outline_bounds(polygons, state)
        }
        Action::Bmp { point, bitmap } => Rect::from_point_size(
            state.logic_to_pixel(*point),
            Size::new(bitmap.width(), bitmap.height()),
        ),
        Action::BmpEx { point, bitmap } => {
            let (w, h) = bitmap.dimensions();
            Rect::from_point_size(state.logic_to_pixel(*point), Size::new(w, h))
        }
        Action::BmpScale { point, size, .. }
        | Action::BmpExScale { point, size, .. }
        | Action::FloatTransparent { point, size, .. } => {
            state.logic_to_pixel_rect(Rect::from_point_size(*point, *size))
        }
        Action::BmpScalePart {
            dest_point,
            dest_size,
            ..
        }
        | Action::BmpExScalePart {
            dest_point,
            dest_size,
            ..
        } => state.logic_to_pixel_rect(Rect::from_point_size(*dest_point, *dest_size)),
        Action::Wallpaper { rect, .. } => state.logic_to_pixel_rect(*rect),
        Action::Push
        | Action::Pop
        | Action::MapMode(_)
        | Action::FillColor(_)
        | Action::LineColor(_)
        | Action::ClipRegion(_)
        | Action::IntersectClipRect(_)
        | Action::Comment { .. } => Rect::empty(),
    }
}

/// Bounds of the mapped outline points. Outlines are stroked through pixel
/// centres, which reaches one pixel past the right and bottom points.
fn outline_bounds(polygons: &PolyPolygon, state: &DeviceState) -> Rect {
    let mut points = polygons
        .polygons()
        .iter()
        .flat_map(|poly| poly.points())
        .map(|p| state.logic_to_pixel(*p));
    let Some(first) = points.next() else {
        return Rect::empty();
    };
    let (min, max) = points.fold((first, first), |(min, max), p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    let stroke = i32::from(state.has_line());
    Rect::from_ltrb(min.x, min.y, max.x + stroke, max.y + stroke)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::device::map_mode::{MapMode, MapUnit};
    use crate::image::image_formats::{Color, Pixmap};
    use crate::meta::action::{LineInfo, Polygon};

    fn state() -> DeviceState {
        DeviceState::new(&DeviceInfo::new(600, 600, Rect::new(0, 0, 5000, 7000)).expect("device"))
    }

    #[test]
    fn test_state_commands_have_no_bounds() {
        let st = state();
        assert!(action_bounds(&Action::Push, &st).is_empty());
        assert!(action_bounds(&Action::FillColor(Color::BLACK), &st).is_empty());
        assert!(action_bounds(&Action::comment("x"), &st).is_empty());
    }

    #[test]
    fn test_rect_bounds_follow_map_mode() {
        let mut st = state();
        st.execute(&Action::MapMode(MapMode::new(MapUnit::Inch)));
        let b = action_bounds(&Action::Rect(Rect::new(1, 1, 1, 2)), &st);
        assert_eq!(b, Rect::new(600, 600, 600, 1200));
    }

    #[test]
    fn test_bounds_are_clipped() {
        let mut st = state();
        st.execute(&Action::ClipRegion(Some(Rect::new(0, 0, 50, 50))));
        let b = action_bounds(&Action::Rect(Rect::new(25, 25, 100, 100)), &st);
        assert_eq!(b, Rect::new(25, 25, 25, 25));
    }

    #[test]
    fn test_line_bounds() {
        let st = state();
        let thin = Action::Line {
            start: Point::new(10, 5),
            end: Point::new(0, 5),
            info: LineInfo::default(),
        };
        assert_eq!(action_bounds(&thin, &st), Rect::new(0, 5, 11, 1));

        let wide = Action::Line {
            start: Point::new(0, 5),
            end: Point::new(10, 5),
            info: LineInfo { width: 4 },
        };
        assert_eq!(action_bounds(&wide, &st), Rect::new(-2, 3, 15, 5));
    }

    #[test]
    fn test_polygon_bounds_grow_with_outline() {
        let mut st = state();
        let poly = Action::Polygon(Polygon::from_rect(Rect::new(0, 0, 10, 10)));
        assert_eq!(action_bounds(&poly, &st), Rect::new(0, 0, 11, 11));
        st.execute(&Action::LineColor(Color::TRANSPARENT));
        assert_eq!(action_bounds(&poly, &st), Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_unscaled_bitmap_uses_pixel_size() {
        let mut st = state();
        st.execute(&Action::MapMode(MapMode::new(MapUnit::Inch)));
        let bmp = Action::Bmp {
            point: Point::new(1, 0),
            bitmap: Pixmap::new(7, 3),
        };
        assert_eq!(action_bounds(&bmp, &st), Rect::new(600, 0, 7, 3));
    }
}
