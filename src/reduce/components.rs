// src/reduce/components.rs

//! Connected components of overlapping ink in a drawing program.
//!
//! Every command after the background run is fed, in program order, into a
//! [`ComponentSet`]. A command whose device-pixel bounds overlap existing
//! components swallows all of them: their member lists are spliced into the
//! new component and their bounds unioned in. Because the grown bounds can
//! reach components that were skipped earlier in the same pass, the scan
//! repeats until a whole pass merges nothing. Afterwards the live components
//! are pairwise disjoint.
//!
//! Components live in an arena addressed by [`ComponentId`]. Merged
//! components leave a tombstone behind, so handles held elsewhere (the
//! per-command membership map) never dangle and iteration never has to cope
//! with a vector shifting underneath it.
//!
//! Commands with empty bounds (state changes) and commands that paint
//! nothing stay in solitary components and never take part in a merge.

use crate::device::DeviceInfo;
use crate::device::state::DeviceState;
use crate::image::geom::Rect;
use crate::meta::action::Action;
use crate::meta::metafile::Metafile;
use crate::reduce::background::BackgroundRun;
use crate::reduce::bounds;
use crate::reduce::classify::{self, TransparencyClass};

// ─── Component ──────────────────────────────────────────────────────────────

/// Stable handle of a component inside a [`ComponentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A region of mutually overlapping ink and the commands painting it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    /// Union of the members' device-pixel bounds.
    pub bounds: Rect,
    /// Program indices, in merge order.
    pub members: Vec<usize>,
    /// The region must be rasterized.
    pub special: bool,
    /// The single member paints nothing.
    pub fully_transparent: bool,
}

impl Component {
    /// Whether an incoming command with `bounds` has to absorb this one.
    fn overlaps(&self, bounds: &Rect) -> bool {
        !self.fully_transparent && !self.bounds.is_empty() && self.bounds.overlaps(bounds)
    }
}

// ─── ComponentSet ───────────────────────────────────────────────────────────

/// Arena of components; merged components are tombstoned.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    slots: Vec<Option<Component>>,
    live: usize,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every command after `background` through the merger.
    ///
    /// State commands are executed before their bounds are taken, drawing
    /// commands after, so each drawing command sees the state in force when
    /// it paints.
    pub fn build(program: &Metafile, device: &DeviceInfo, background: &mut BackgroundRun) -> Self {
        let start = background.end();
        let mut state = DeviceState::new(device);
        for action in &program.actions()[..start.min(program.len())] {
            state.execute(action);
        }

        let mut set = ComponentSet::new();
        for (index, action) in program.iter().enumerate().skip(start) {
            let (bounds, class) = if action.is_state_change() {
                state.execute(action);
                (
                    bounds::action_bounds(action, &state),
                    TransparencyClass::of(action, &state),
                )
            } else {
                let measured = (
                    bounds::action_bounds(action, &state),
                    TransparencyClass::of(action, &state),
                );
                state.execute(action);
                measured
            };
            set.add_action(index, action, bounds, class, background);
        }
        set
    }

    /// Adds the command at `index` with the given footprint and class,
    /// merging every component it overlaps, and returns the handle of the
    /// result.
    ///
    /// If the command reaches outside `background`, the background run is
    /// absorbed as ordinary ink and its member list is left empty.
    pub fn add_action(
        &mut self,
        index: usize,
        action: &Action,
        bounds: Rect,
        class: TransparencyClass,
        background: &mut BackgroundRun,
    ) -> ComponentId {
        let fully_transparent = class == TransparencyClass::FullyTransparent;
        let mut incoming = Component {
            bounds,
            members: Vec::new(),
            special: false,
            fully_transparent,
        };
        let mut absorbed_special = false;

        if !bounds.is_empty() && !fully_transparent {
            if !background.members.is_empty() && !background.bounds.contains_rect(&incoming.bounds) {
                log::trace!(
                    "{} at {index} leaves the background, absorbing {} background commands",
                    action.name(),
                    background.members.len()
                );
                incoming.bounds = incoming.bounds.union(&background.bounds);
                incoming.members.append(&mut background.members);
            }

            loop {
                let mut merged_any = false;
                for slot in self.slots.iter_mut() {
                    let Some(mut other) = slot.take_if(|c| c.overlaps(&incoming.bounds)) else {
                        continue;
                    };
                    log::trace!(
                        "{} at {index} absorbs component with {} members",
                        action.name(),
                        other.members.len()
                    );
                    incoming.bounds = incoming.bounds.union(&other.bounds);
                    incoming.members.append(&mut other.members);
                    absorbed_special |= other.special;
                    self.live -= 1;
                    merged_any = true;
                }
                if !merged_any {
                    break;
                }
            }
        }

        incoming.special =
            classify::mark_special(absorbed_special, class, !incoming.members.is_empty());
        incoming.members.push(index);
        check_component(&incoming, action, index);
        self.insert(incoming)
    }

    fn insert(&mut self, component: Component) -> ComponentId {
        self.slots.push(Some(component));
        self.live += 1;
        ComponentId(self.slots.len() - 1)
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live components in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (ComponentId(i), c)))
    }

    pub fn ids(&self) -> Vec<ComponentId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn special_count(&self) -> usize {
        self.iter().filter(|(_, c)| c.special).count()
    }

    /// Owner of each of the first `len` program indices. Indices not in any
    /// component (the background run) map to `None`.
    pub fn membership(&self, len: usize) -> Vec<Option<ComponentId>> {
        let mut map = vec![None; len];
        for (id, component) in self.iter() {
            for &member in &component.members {
                if let Some(entry) = map.get_mut(member) {
                    *entry = Some(id);
                }
            }
        }
        map
    }
}

/// Reports components that break the solitary-member rules.
fn check_component(component: &Component, action: &Action, index: usize) {
    if component.bounds.is_empty() && component.members.len() != 1 {
        log::warn!(
            "{} at {index}: component without bounds has {} members",
            action.name(),
            component.members.len()
        );
        debug_assert!(false, "component without bounds must be solitary");
    }
    if component.fully_transparent && component.members.len() != 1 {
        log::warn!(
            "{} at {index}: invisible component has {} members",
            action.name(),
            component.members.len()
        );
        debug_assert!(false, "invisible component must be solitary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::geom::Point;
    use crate::image::image_formats::Color;
    use crate::meta::action::{PolyPolygon, Polygon};
    use crate::reduce::config::ReductionConfig;

    fn device() -> DeviceInfo {
        DeviceInfo::new(72, 72, Rect::new(0, 0, 300, 300)).expect("device")
    }

    fn no_background() -> BackgroundRun {
        BackgroundRun {
            bounds: Rect::empty(),
            color: Color::WHITE,
            members: Vec::new(),
            last_index: None,
        }
    }

    fn triangle(x: i32, y: i32, side: i32) -> Action {
        Action::Polygon(Polygon::new(vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x, y + side),
        ]))
    }

    fn transparent(rect: Rect) -> Action {
        Action::Transparent {
            polygons: PolyPolygon::from(Polygon::from_rect(rect)),
            percent: 50,
        }
    }

    fn assert_disjoint(set: &ComponentSet) {
        let comps: Vec<&Component> = set.iter().map(|(_, c)| c).collect();
        for (i, a) in comps.iter().enumerate() {
            for b in &comps[i + 1..] {
                assert!(!a.bounds.overlaps(&b.bounds), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_overlapping_rects_merge() {
        let a = Rect::new(0, 0, 20, 20);
        let b = Rect::new(10, 10, 20, 20);
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        set.add_action(0, &Action::Rect(a), a, TransparencyClass::Opaque, &mut bg);
        let id = set.add_action(1, &Action::Rect(b), b, TransparencyClass::Opaque, &mut bg);
        assert_eq!(set.len(), 1);
        let c = set.get(id).expect("live");
        assert_eq!(c.bounds, a.union(&b));
        assert_eq!(c.members, vec![0, 1]);
        assert!(!c.special);
    }

    #[test]
    fn test_bridge_merges_transitively() {
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        let rects = [
            Rect::new(0, 0, 10, 10),
            Rect::new(50, 0, 10, 10),
            Rect::new(100, 0, 10, 10),
        ];
        for (i, r) in rects.iter().enumerate() {
            set.add_action(i, &Action::Rect(*r), *r, TransparencyClass::Opaque, &mut bg);
        }
        assert_eq!(set.len(), 3);

        // touches its two left neighbours
        let bridge = Rect::new(5, 5, 50, 2);
        let id = set.add_action(3, &Action::Rect(bridge), bridge, TransparencyClass::Opaque, &mut bg);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(id).expect("live").members, vec![0, 1, 3]);
        assert_disjoint(&set);
    }

    #[test]
    fn test_late_growth_reaches_earlier_slots() {
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        let first = Rect::new(30, 0, 10, 10);
        let second = Rect::new(0, 20, 40, 10);
        set.add_action(0, &Action::Rect(first), first, TransparencyClass::Opaque, &mut bg);
        set.add_action(1, &Action::Rect(second), second, TransparencyClass::Opaque, &mut bg);
        assert_eq!(set.len(), 2);

        // only touches `second`; the union then reaches `first`
        let incoming = Rect::new(0, 5, 5, 20);
        let id = set.add_action(2, &Action::Rect(incoming), incoming, TransparencyClass::Opaque, &mut bg);
        assert_eq!(set.len(), 1);
        let c = set.get(id).expect("live");
        assert_eq!(c.members, vec![1, 0, 2]);
        assert_eq!(c.bounds, Rect::new(0, 0, 40, 30));
    }

    #[test]
    fn test_state_and_invisible_commands_stay_solitary() {
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        let r = Rect::new(0, 0, 10, 10);
        set.add_action(0, &Action::Rect(r), r, TransparencyClass::Opaque, &mut bg);
        set.add_action(1, &Action::Push, Rect::empty(), TransparencyClass::FullyTransparent, &mut bg);
        let hidden = Action::Transparent {
            polygons: PolyPolygon::from(Polygon::from_rect(r)),
            percent: 100,
        };
        set.add_action(2, &hidden, r, TransparencyClass::FullyTransparent, &mut bg);
        let id = set.add_action(3, &Action::Rect(r), r, TransparencyClass::Opaque, &mut bg);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(id).expect("live").members, vec![0, 3]);
    }

    #[test]
    fn test_transparency_over_ink_is_special() {
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        let a = Rect::new(0, 0, 20, 20);
        let b = Rect::new(10, 10, 20, 20);
        set.add_action(0, &triangle(0, 0, 20), a, TransparencyClass::Opaque, &mut bg);
        let id = set.add_action(1, &transparent(b), b, TransparencyClass::SelfCompositing, &mut bg);
        assert!(set.get(id).expect("live").special);

        // special is contagious to later opaque ink
        let c = Rect::new(25, 25, 10, 10);
        let id = set.add_action(2, &Action::Rect(c), c, TransparencyClass::Opaque, &mut bg);
        assert!(set.get(id).expect("live").special);
        assert_eq!(set.special_count(), 1);
    }

    #[test]
    fn test_transparency_on_blank_page_is_not_special() {
        let mut bg = no_background();
        let mut set = ComponentSet::new();
        let b = Rect::new(10, 10, 20, 20);
        let id = set.add_action(0, &transparent(b), b, TransparencyClass::SelfCompositing, &mut bg);
        assert!(!set.get(id).expect("live").special);
    }

    #[test]
    fn test_background_absorbed_when_left() {
        let mut actions = vec![
            Action::FillColor(Color::rgb(200, 0, 0)),
            Action::Rect(Rect::new(0, 0, 100, 100)),
            transparent(Rect::new(10, 10, 20, 20)),
        ];
        let device = device();

        // inside the background: alone and self-compositing
        let program = Metafile::from_actions(actions.clone());
        let mut bg = BackgroundRun::scan(&program, &device, &ReductionConfig::default());
        assert_eq!(bg.members, vec![0, 1]);
        let set = ComponentSet::build(&program, &device, &mut bg);
        assert_eq!(bg.members, vec![0, 1]);
        let map = set.membership(program.len());
        let inside = map[2].and_then(|id| set.get(id)).expect("owned");
        assert_eq!(inside.members, vec![2]);
        assert!(!inside.special);

        // crossing the edge pulls the background in and needs a raster
        actions.push(transparent(Rect::new(90, 90, 20, 20)));
        let program = Metafile::from_actions(actions);
        let mut bg = BackgroundRun::scan(&program, &device, &ReductionConfig::default());
        let set = ComponentSet::build(&program, &device, &mut bg);
        assert!(bg.members.is_empty());
        assert_eq!(set.len(), 1);
        let map = set.membership(program.len());
        let crossing = map[3].and_then(|id| set.get(id)).expect("owned");
        assert_eq!(crossing.members, vec![0, 1, 2, 3]);
        assert!(crossing.special);
        assert_eq!(map[0], map[3]);
    }

    #[test]
    fn test_membership_leaves_background_unowned() {
        let program = Metafile::from_actions(vec![
            Action::Rect(Rect::new(0, 0, 100, 100)),
            Action::FillColor(Color::BLACK),
            Action::Rect(Rect::new(10, 10, 5, 5)),
        ]);
        let device = device();
        let mut bg = BackgroundRun::scan(&program, &device, &ReductionConfig::default());
        let set = ComponentSet::build(&program, &device, &mut bg);
        let map = set.membership(program.len());
        assert_eq!(map[0], None);
        assert!(map[1].is_some());
        assert!(map[2].is_some());
        assert_ne!(map[1], map[2]);
    }
}
