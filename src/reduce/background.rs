// src/reduce/background.rs

//! Leading run of opaque shapes that paint the page background.

use crate::device::DeviceInfo;
use crate::device::state::DeviceState;
use crate::image::geom::Rect;
use crate::image::image_formats::Color;
use crate::meta::action::Action;
use crate::meta::metafile::Metafile;
use crate::reduce::config::ReductionConfig;
use crate::reduce::{bounds, classify};

/// The commands at the start of a program that only build up a solid
/// background.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRun {
    /// Covered area in device pixels.
    pub bounds: Rect,
    /// Background color. White when nothing established one.
    pub color: Color,
    /// Indices of the run's commands. Emptied when the run is merged into
    /// a component.
    pub members: Vec<usize>,
    /// Index of the last background shape.
    pub last_index: Option<usize>,
}

/// How a command may take part in the background run.
enum Candidate {
    /// An axis-aligned filled rectangle (logical coordinates) and its color.
    Shape(Rect, Color),
    /// A shape that can never be background.
    Rejected,
    /// Anything else; acceptable only while it paints nothing.
    Other,
}

impl Candidate {
    fn of(action: &Action, state: &DeviceState) -> Self {
        match action {
            Action::Rect(rect) => Candidate::Shape(*rect, state.fill_color()),
            Action::Polygon(poly) if poly.is_rectangle() => {
                Candidate::Shape(poly.bound_rect(), state.fill_color())
            }
            Action::PolyPolygon(polys)
                if polys.len() == 1 && polys.polygons()[0].is_rectangle() =>
            {
                Candidate::Shape(polys.bound_rect(), state.fill_color())
            }
            Action::Wallpaper { rect, color } => Candidate::Shape(*rect, color.solid()),
            Action::Polygon(_) | Action::PolyPolygon(_) => Candidate::Rejected,
            _ => Candidate::Other,
        }
    }
}

impl BackgroundRun {
    /// Scans `program` from the start for its background run.
    pub fn scan(program: &Metafile, device: &DeviceInfo, config: &ReductionConfig) -> Self {
        let mut run = BackgroundRun {
            bounds: Rect::empty(),
            color: Color::WHITE,
            members: Vec::new(),
            last_index: None,
        };
        if !config.background.is_transparent() {
            run.bounds = device.background_bounds();
            run.color = Color::rgb(config.background.r, config.background.g, config.background.b);
        }

        let mut state = DeviceState::new(device);
        for (index, action) in program.iter().enumerate() {
            let extends = match Candidate::of(action, &state) {
                Candidate::Shape(rect, color) => {
                    let px = state.logic_to_pixel_rect(rect);
                    let covers = color.is_opaque() && !px.is_empty() && px.contains_rect(&run.bounds);
                    if covers {
                        run.bounds = px;
                        run.color = color;
                        run.last_index = Some(index);
                    }
                    covers
                }
                Candidate::Rejected => false,
                Candidate::Other => {
                    let transparent = !classify::generates_ink(action, &state);
                    if transparent {
                        run.bounds = run.bounds.union(&bounds::action_bounds(action, &state));
                    }
                    transparent
                }
            };
            state.execute(action);
            if !extends {
                break;
            }
        }

        if let Some(last) = run.last_index {
            run.members = (0..=last).collect();
        }
        run
    }

    /// First index after the run.
    pub fn end(&self) -> usize {
        self.last_index.map_or(0, |last| last + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.last_index.is_none()
    }
}
