// src/reduce/reducer.rs

//! Removes transparency from a drawing program for output on devices that
//! cannot composite.
//!
//! The program is processed in four passes:
//!
//! 1. The leading background run is found and copied through.
//! 2. The remaining commands are grouped into connected components of
//!    overlapping ink, and components that need a raster are marked special.
//! 3. Special components are rasterized into bracketed bitmap tiles.
//! 4. All other commands are copied in program order. Self-compositing
//!    transparency painted straight onto the background is rewritten into
//!    opaque commands on the way.

use crate::device::DeviceInfo;
use crate::device::state::DeviceState;
use crate::meta::metafile::Metafile;
use crate::reduce::background::BackgroundRun;
use crate::reduce::classify;
use crate::reduce::components::ComponentSet;
use crate::reduce::config::ReductionConfig;
use crate::reduce::convert::convert_transparent_action;
use crate::reduce::flatten::BitmapFlattener;

/// Counters describing one reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    /// Commands copied through as the page background.
    pub background_actions: usize,
    /// Live components after merging.
    pub components: usize,
    /// Components rasterized into bitmaps.
    pub special_components: usize,
    /// Special components auto mode left as vector output.
    pub downgraded_components: usize,
    pub tiles_emitted: usize,
    pub tiles_skipped: usize,
}

/// Output of [`remove_transparencies`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub metafile: Metafile,
    /// Whether the input contained transparency. When false, `metafile`
    /// equals the input.
    pub changed: bool,
    pub stats: ReductionStats,
}

/// Reusable reduction settings for one output device.
#[derive(Debug, Clone)]
pub struct TransparencyReducer {
    device: DeviceInfo,
    config: ReductionConfig,
}

impl TransparencyReducer {
    pub fn new(device: DeviceInfo) -> Self {
        Self::with_config(device, ReductionConfig::default())
    }

    pub fn with_config(device: DeviceInfo, config: ReductionConfig) -> Self {
        TransparencyReducer { device, config }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    pub fn reduce(&self, input: &Metafile) -> Reduction {
        remove_transparencies(input, &self.device, &self.config)
    }
}

/// Produces a program without transparency that paints like `input` on
/// `device`.
pub fn remove_transparencies(
    input: &Metafile,
    device: &DeviceInfo,
    config: &ReductionConfig,
) -> Reduction {
    if !(config.analyzes_transparency() && input.has_transparent_actions()) {
        return Reduction {
            metafile: input.clone(),
            changed: false,
            stats: ReductionStats::default(),
        };
    }

    let mut out = Metafile::new();
    let mut stats = ReductionStats::default();

    let mut background = BackgroundRun::scan(input, device, config);
    let background_color = background.color;
    stats.background_actions = background.members.len();

    let mut set = ComponentSet::build(input, device, &mut background);
    stats.components = set.len();
    let membership = set.membership(input.len());

    // whatever was not absorbed by a component is emitted as is
    for &index in &background.members {
        if let Some(action) = input.get(index) {
            out.push(action.clone());
        }
    }

    let flattener =
        BitmapFlattener::new(input, device, config, background_color, &membership);
    let flat = flattener.flatten_all(&mut set, &mut out);
    stats.special_components = flat.flattened;
    stats.downgraded_components = flat.downgraded;
    stats.tiles_emitted = flat.tiles_emitted;
    stats.tiles_skipped = flat.tiles_skipped;

    let mut state = DeviceState::new(device);
    for (index, action) in input.iter().enumerate() {
        let Some(component) = membership.get(index).copied().flatten().and_then(|id| set.get(id))
        else {
            state.execute(action);
            continue;
        };
        if component.special {
            // rasterized, or painting nothing on the page: only state survives
            if action.is_state_change() {
                out.push(action.clone());
            } else if component.bounds.is_empty() {
                log::trace!("dropping {} at {index}: clipped away", action.name());
            }
        } else if classify::handles_transparency(action) && component.members.first() == Some(&index) {
            convert_transparent_action(action, &state, background_color, &mut out);
        } else {
            out.push(action.clone());
        }
        state.execute(action);
    }

    out.copy_preferences(input);

    log::debug!(
        "transparency reduction: {} background, {} components, {} rasterized, {} downgraded, {} tiles ({} skipped)",
        stats.background_actions,
        stats.components,
        stats.special_components,
        stats.downgraded_components,
        stats.tiles_emitted,
        stats.tiles_skipped
    );

    Reduction {
        metafile: out,
        changed: true,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::geom::{Point, Rect, Size};
    use crate::image::image_formats::Color;
    use crate::meta::action::{Action, Gradient, PolyPolygon, Polygon};
    use crate::reduce::flatten::{TRANSPARENT_BITMAP_BEGIN, TRANSPARENT_BITMAP_END};

    fn device() -> DeviceInfo {
        DeviceInfo::new(72, 72, Rect::new(0, 0, 200, 200)).expect("device")
    }

    fn transparent(rect: Rect, percent: u16) -> Action {
        Action::Transparent {
            polygons: PolyPolygon::from(Polygon::from_rect(rect)),
            percent,
        }
    }

    fn triangle() -> Action {
        Action::Polygon(Polygon::new(vec![
            Point::new(10, 10),
            Point::new(60, 10),
            Point::new(10, 60),
        ]))
    }

    #[test]
    fn test_opaque_program_is_untouched() {
        let input = Metafile::from_actions(vec![
            Action::FillColor(Color::rgb(255, 0, 0)),
            Action::Rect(Rect::new(0, 0, 10, 10)),
        ])
        .with_pref_size(Size::new(200, 200));
        let reduction = remove_transparencies(&input, &device(), &ReductionConfig::default());
        assert!(!reduction.changed);
        assert_eq!(reduction.metafile, input);
    }

    #[test]
    fn test_explicit_reduction_without_auto_mode_passes_through() {
        let input = Metafile::from_actions(vec![triangle(), transparent(Rect::new(20, 20, 50, 50), 50)]);
        let config = ReductionConfig::default()
            .with_reduce_transparency(true)
            .with_auto_mode(false);
        let reduction = remove_transparencies(&input, &device(), &config);
        assert!(!reduction.changed);
        assert_eq!(reduction.metafile, input);
    }

    #[test]
    fn test_special_region_is_bracketed() {
        let input = Metafile::from_actions(vec![triangle(), transparent(Rect::new(20, 20, 50, 50), 50)]);
        let reduction = remove_transparencies(&input, &device(), &ReductionConfig::default());
        assert!(reduction.changed);
        assert_eq!(reduction.stats.special_components, 1);
        assert_eq!(reduction.stats.tiles_emitted, 1);

        let names: Vec<&str> = reduction.metafile.iter().map(Action::name).collect();
        assert_eq!(
            names,
            vec!["Push", "MapMode", "ClipRegion", "Comment", "BmpScale", "Comment", "Pop"]
        );
        let actions = reduction.metafile.actions();
        assert_eq!(actions[3], Action::comment(TRANSPARENT_BITMAP_BEGIN));
        assert_eq!(actions[5], Action::comment(TRANSPARENT_BITMAP_END));
        let Action::BmpScale { point, size, .. } = &actions[4] else {
            panic!("expected BmpScale");
        };
        assert_eq!(*point, Point::new(10, 10));
        assert_eq!(*size, Size::new(61, 61));
    }

    #[test]
    fn test_state_commands_of_special_regions_are_kept() {
        let blue = Color::rgb(0, 0, 255);
        let input = Metafile::from_actions(vec![
            Action::FillColor(blue),
            Action::Rect(Rect::new(0, 0, 200, 200)),
            Action::MapMode(crate::device::MapMode::pixel().with_origin(Point::new(5, 5))),
            transparent(Rect::new(150, 150, 100, 100), 30),
        ]);
        let reduction = remove_transparencies(&input, &device(), &ReductionConfig::default());
        assert_eq!(reduction.stats.background_actions, 2);
        assert_eq!(reduction.stats.special_components, 1);
        assert_eq!(reduction.stats.tiles_emitted, 1);

        // the background was absorbed into the raster, its fill color was not
        let out = reduction.metafile.actions();
        let bitmap = out
            .iter()
            .position(|a| matches!(a, Action::BmpScale { .. }))
            .expect("bitmap");
        let fill = out
            .iter()
            .position(|a| a == &Action::FillColor(blue))
            .expect("fill color kept");
        assert!(bitmap < fill);
        assert!(out.contains(&input.actions()[2]));
        assert!(!out.iter().any(|a| matches!(a, Action::Rect(_) | Action::Transparent { .. })));
    }

    #[test]
    fn test_clipped_away_gradient_is_dropped() {
        let input = Metafile::from_actions(vec![
            Action::ClipRegion(Some(Rect::new(0, 0, 5, 5))),
            Action::FloatTransparent {
                program: Box::new(Metafile::from_actions(vec![triangle()])),
                point: Point::new(50, 50),
                size: Size::new(10, 10),
                gradient: Gradient::new(Color::BLACK, Color::WHITE),
            },
        ]);
        let reduction = remove_transparencies(&input, &device(), &ReductionConfig::default());
        assert!(reduction.changed);
        assert_eq!(reduction.stats.tiles_emitted, 0);
        assert_eq!(reduction.metafile.actions(), &input.actions()[..1]);
        assert!(!reduction.metafile.has_transparent_actions());
    }

    #[test]
    fn test_preferences_are_copied() {
        let input = Metafile::from_actions(vec![transparent(Rect::new(0, 0, 10, 10), 50)])
            .with_pref_size(Size::new(210, 297));
        let reduction = remove_transparencies(&input, &device(), &ReductionConfig::default());
        assert_eq!(reduction.metafile.pref_size(), Size::new(210, 297));
    }

    #[test]
    fn test_reducer_matches_free_function() {
        let input = Metafile::from_actions(vec![triangle(), transparent(Rect::new(20, 20, 50, 50), 50)]);
        let reducer = TransparencyReducer::new(device());
        assert_eq!(
            reducer.reduce(&input),
            remove_transparencies(&input, &device(), &ReductionConfig::default())
        );
    }
}
