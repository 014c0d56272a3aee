// src/device/state.rs

//! Replay context: the graphics state a program accumulates as it runs.
//!
//! Executing a command here never paints. Only state-changing commands
//! (map mode, colors, clipping, push/pop) modify anything; drawing commands
//! pass through untouched. Analysis stages run the program against a
//! `DeviceState` so every bounds query sees the mapping in force at that
//! point of the program.

use crate::device::DeviceInfo;
use crate::device::map_mode::MapMode;
use crate::image::geom::{Point, Rect, clamp_coord};
use crate::image::image_formats::Color;
use crate::meta::action::Action;

#[derive(Clone, Debug, PartialEq)]
struct GraphicsState {
    map_mode: MapMode,
    line_color: Color,
    fill_color: Color,
    /// Clip rectangle in device pixels.
    clip: Option<Rect>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            map_mode: MapMode::pixel(),
            line_color: Color::BLACK,
            fill_color: Color::WHITE,
            clip: None,
        }
    }
}

/// Graphics state plus the push/pop stack of a replay.
#[derive(Clone, Debug)]
pub struct DeviceState {
    dpi_x: u32,
    dpi_y: u32,
    current: GraphicsState,
    stack: Vec<GraphicsState>,
}

impl DeviceState {
    pub fn new(device: &DeviceInfo) -> Self {
        DeviceState {
            dpi_x: device.dpi_x(),
            dpi_y: device.dpi_y(),
            current: GraphicsState::default(),
            stack: Vec::new(),
        }
    }

    /// Applies a command's effect on the graphics state.
    pub fn execute(&mut self, action: &Action) {
        match action {
            Action::Push => self.stack.push(self.current.clone()),
            Action::Pop => match self.stack.pop() {
                Some(saved) => self.current = saved,
                None => log::debug!("Pop without matching Push ignored"),
            },
            Action::MapMode(map_mode) => self.current.map_mode = map_mode.clone(),
            Action::FillColor(color) => self.current.fill_color = color.solid(),
            Action::LineColor(color) => self.current.line_color = color.solid(),
            Action::ClipRegion(rect) => {
                self.current.clip = rect.map(|r| self.logic_to_pixel_rect(r));
            }
            Action::IntersectClipRect(rect) => {
                let px = self.logic_to_pixel_rect(*rect);
                self.current.clip = Some(match self.current.clip {
                    Some(clip) => clip.intersection(&px),
                    None => px,
                });
            }
            _ => {}
        }
    }

    /// Drops all saved states, keeping the current one.
    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    pub fn map_mode(&self) -> &MapMode {
        &self.current.map_mode
    }

    pub fn line_color(&self) -> Color {
        self.current.line_color
    }

    pub fn fill_color(&self) -> Color {
        self.current.fill_color
    }

    pub fn has_line(&self) -> bool {
        !self.current.line_color.is_transparent()
    }

    pub fn has_fill(&self) -> bool {
        !self.current.fill_color.is_transparent()
    }

    /// The active clip rectangle in device pixels, if any.
    pub fn clip(&self) -> Option<Rect> {
        self.current.clip
    }

    pub fn dpi(&self) -> (u32, u32) {
        (self.dpi_x, self.dpi_y)
    }

    pub fn logic_to_pixel(&self, p: Point) -> Point {
        let mm = &self.current.map_mode;
        Point::new(
            clamp_coord(mm.logic_to_pixel_x(p.x, self.dpi_x)),
            clamp_coord(mm.logic_to_pixel_y(p.y, self.dpi_y)),
        )
    }

    /// Maps both edges of a logical rectangle and normalizes the result.
    pub fn logic_to_pixel_rect(&self, r: Rect) -> Rect {
        if r.is_empty() {
            return Rect::empty();
        }
        let tl = self.logic_to_pixel(r.top_left());
        let br = self.logic_to_pixel(Point::new(r.x_max(), r.y_max()));
        Rect::from_ltrb(tl.x, tl.y, br.x, br.y)
    }

    /// Converts a logical stroke width to whole pixels.
    pub fn logic_to_pixel_width(&self, w: u32) -> u32 {
        let px = self.current.map_mode.logic_to_pixel_width(w, self.dpi_x);
        px.unsigned_abs().min(u64::from(u32::MAX)) as u32
    }

    pub fn pixel_to_logic(&self, p: Point) -> Point {
        let mm = &self.current.map_mode;
        Point::new(
            clamp_coord(mm.pixel_to_logic_x(p.x, self.dpi_x)),
            clamp_coord(mm.pixel_to_logic_y(p.y, self.dpi_y)),
        )
    }
}
