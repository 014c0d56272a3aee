// src/reduce/flatten.rs

//! Rasterizes special components into opaque bitmap tiles.
//!
//! Each tile is rendered by replaying the whole program with output enabled
//! only for the component's own members, so transforms, clips and colors
//! set anywhere before them still apply.

use bitvec::prelude::*;

use crate::device::DeviceInfo;
use crate::device::map_mode::MapMode;
use crate::device::state::DeviceState;
use crate::device::surface::Surface;
use crate::image::geom::{Rect, Size};
use crate::image::image_formats::{Color, Pixmap};
use crate::meta::action::Action;
use crate::meta::metafile::Metafile;
use crate::reduce::components::{ComponentId, ComponentSet};
use crate::reduce::config::ReductionConfig;

/// Comment opening a flattened bitmap tile.
pub const TRANSPARENT_BITMAP_BEGIN: &str = "PRNSPOOL_TRANSPARENTBITMAP_BEGIN";
/// Comment closing a flattened bitmap tile.
pub const TRANSPARENT_BITMAP_END: &str = "PRNSPOOL_TRANSPARENTBITMAP_END";

/// Counters collected while flattening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenStats {
    /// Special components rasterized.
    pub flattened: usize,
    /// Special components left as vector output by auto mode.
    pub downgraded: usize,
    pub tiles_emitted: usize,
    /// Tiles whose surface could not be allocated.
    pub tiles_skipped: usize,
}

pub struct BitmapFlattener<'a> {
    program: &'a Metafile,
    device: &'a DeviceInfo,
    config: &'a ReductionConfig,
    background: Color,
    membership: &'a [Option<ComponentId>],
}

impl<'a> BitmapFlattener<'a> {
    pub fn new(
        program: &'a Metafile,
        device: &'a DeviceInfo,
        config: &'a ReductionConfig,
        background: Color,
        membership: &'a [Option<ComponentId>],
    ) -> Self {
        BitmapFlattener {
            program,
            device,
            config,
            background,
            membership,
        }
    }

    /// Flattens every special component of `set` into `out`.
    ///
    /// Components auto mode declines to rasterize lose their special flag.
    pub fn flatten_all(&self, set: &mut ComponentSet, out: &mut Metafile) -> FlattenStats {
        let output_rect = self.device.output_rect();
        let mut stats = FlattenStats::default();

        for id in set.ids() {
            let Some(component) = set.get_mut(id) else {
                continue;
            };
            if !component.special {
                continue;
            }
            let bound = component.bounds.intersection(&output_rect);
            if self.config.skips_large_region(bound.area(), output_rect.area()) {
                log::debug!(
                    "leaving {}x{} region at ({}, {}) unrasterized",
                    bound.width,
                    bound.height,
                    bound.x,
                    bound.y
                );
                component.special = false;
                stats.downgraded += 1;
                continue;
            }
            if bound.is_empty() {
                continue;
            }
            self.flatten_region(id, bound, out, &mut stats);
            stats.flattened += 1;
        }
        stats
    }

    /// Emits the bracketed tiles covering `bound` for component `id`.
    fn flatten_region(
        &self,
        id: ComponentId,
        bound: Rect,
        out: &mut Metafile,
        stats: &mut FlattenStats,
    ) {
        let gate = self.gate(id);

        out.push(Action::Push);
        out.push(Action::MapMode(MapMode::pixel()));
        out.push(Action::ClipRegion(None));
        for tile in tiles(bound, self.device.tile_size()) {
            let Some(bitmap) = self.rasterize(tile, &gate) else {
                log::debug!(
                    "skipping {}x{} tile at ({}, {}): no surface",
                    tile.width,
                    tile.height,
                    tile.x,
                    tile.y
                );
                stats.tiles_skipped += 1;
                continue;
            };
            out.push(Action::comment(TRANSPARENT_BITMAP_BEGIN));
            out.push(Action::BmpScale {
                point: tile.top_left(),
                size: tile.size(),
                bitmap: self.downsample(tile, bitmap),
            });
            out.push(Action::comment(TRANSPARENT_BITMAP_END));
            stats.tiles_emitted += 1;
        }
        out.push(Action::Pop);
    }

    /// One bit per program command: set for members of `id`.
    fn gate(&self, id: ComponentId) -> BitVec {
        let mut gate = bitvec![0; self.program.len()];
        for (index, owner) in self.membership.iter().enumerate().take(gate.len()) {
            if *owner == Some(id) {
                gate.set(index, true);
            }
        }
        gate
    }

    /// Renders `tile` with output enabled only where `gate` is set.
    pub fn rasterize(&self, tile: Rect, gate: &BitSlice) -> Option<Pixmap> {
        let mut surface = Surface::new(tile, self.background, self.device.max_surface_pixels())?;
        let mut state = DeviceState::new(self.device);
        for (index, action) in self.program.iter().enumerate() {
            surface.set_output_enabled(gate.get(index).is_some_and(|bit| *bit));
            surface.play(action, &mut state);
        }
        Some(surface.into_pixmap())
    }

    /// Box-filters `bitmap` down to the configured resolution limit for the
    /// physical size of `tile`.
    fn downsample(&self, tile: Rect, bitmap: Pixmap) -> Pixmap {
        if !self.config.downsample_bitmaps {
            return bitmap;
        }
        let (max_x, max_y) = self.config.max_bitmap_dpi;
        if max_x == 0 || max_y == 0 {
            return bitmap;
        }
        let limit = |pixels: u32, max_dpi: u32, dpi: u32| {
            let scaled = u64::from(pixels) * u64::from(max_dpi) / u64::from(dpi);
            scaled.clamp(1, u64::from(pixels)) as u32
        };
        let width = limit(tile.width, max_x, self.device.dpi_x());
        let height = limit(tile.height, max_y, self.device.dpi_y());
        if (width, height) == bitmap.dimensions() {
            return bitmap;
        }
        log::trace!(
            "downsampling tile from {}x{} to {width}x{height}",
            bitmap.width(),
            bitmap.height()
        );
        bitmap.downsample(width, height)
    }
}

/// Splits `bound` row by row into tiles of at most `tile` pixels. Without a
/// tile limit the whole bound is one tile.
pub fn tiles(bound: Rect, tile: Option<Size>) -> Vec<Rect> {
    if bound.is_empty() {
        return Vec::new();
    }
    let step = tile.unwrap_or(bound.size());
    let (step_w, step_h) = (step.width.max(1), step.height.max(1));

    let mut out = Vec::new();
    let mut y = bound.y;
    while y < bound.y_max() {
        let height = step_h.min(bound.y_max().abs_diff(y));
        let mut x = bound.x;
        while x < bound.x_max() {
            let width = step_w.min(bound.x_max().abs_diff(x));
            out.push(Rect::new(x, y, width, height));
            x = x.saturating_add_unsigned(width);
        }
        y = y.saturating_add_unsigned(height);
    }
    out
}
