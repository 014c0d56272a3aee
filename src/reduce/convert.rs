// src/reduce/convert.rs

//! Rewrites self-compositing transparency into opaque commands.

use crate::device::state::DeviceState;
use crate::image::image_formats::Color;
use crate::meta::action::Action;
use crate::meta::metafile::Metafile;

/// Appends an opaque equivalent of `action` painted over `background`.
///
/// Percentage transparency becomes a polygon in pre-blended colors, alpha
/// bitmaps are composited onto the background. Anything else is copied.
pub fn convert_transparent_action(
    action: &Action,
    state: &DeviceState,
    background: Color,
    out: &mut Metafile,
) {
    match action {
        Action::Transparent { polygons, percent } => match *percent {
            0 => out.push(Action::PolyPolygon(polygons.clone())),
            p if p >= 100 => {}
            p => {
                let blend = |enabled: bool, color: Color| {
                    if enabled {
                        color.blend_percent(background, p)
                    } else {
                        Color::TRANSPARENT
                    }
                };
                out.push(Action::Push);
                out.push(Action::LineColor(blend(state.has_line(), state.line_color())));
                out.push(Action::FillColor(blend(state.has_fill(), state.fill_color())));
                out.push(Action::PolyPolygon(polygons.clone()));
                out.push(Action::Pop);
            }
        },
        Action::BmpEx { point, bitmap } => out.push(Action::Bmp {
            point: *point,
            bitmap: bitmap.blend(background),
        }),
        Action::BmpExScale {
            point,
            size,
            bitmap,
        } => out.push(Action::BmpScale {
            point: *point,
            size: *size,
            bitmap: bitmap.blend(background),
        }),
        Action::BmpExScalePart {
            dest_point,
            dest_size,
            src_point,
            src_size,
            bitmap,
        } => out.push(Action::BmpScalePart {
            dest_point: *dest_point,
            dest_size: *dest_size,
            src_point: *src_point,
            src_size: *src_size,
            bitmap: bitmap.blend(background),
        }),
        other => out.push(other.clone()),
    }
}
