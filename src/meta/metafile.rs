// src/meta/metafile.rs

//! An ordered, replayable drawing program.

use crate::device::map_mode::MapMode;
use crate::image::geom::Size;
use crate::meta::action::Action;

/// A drawing program: commands in paint order plus the preferred size and
/// map mode the producer recorded it with.
///
/// The index of a command is its identity during reduction; commands are
/// never mutated once recorded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metafile {
    actions: Vec<Action>,
    pref_size: Size,
    pref_map_mode: MapMode,
}

impl Metafile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: Vec<Action>) -> Self {
        Metafile {
            actions,
            ..Self::default()
        }
    }

    pub fn with_pref_size(mut self, size: Size) -> Self {
        self.pref_size = size;
        self
    }

    pub fn with_pref_map_mode(mut self, map_mode: MapMode) -> Self {
        self.pref_map_mode = map_mode;
        self
    }

    /// Appends a command to the end of the program.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn pref_size(&self) -> Size {
        self.pref_size
    }

    pub fn pref_map_mode(&self) -> &MapMode {
        &self.pref_map_mode
    }

    /// Copies the preferred size and map mode from `other`.
    pub fn copy_preferences(&mut self, other: &Metafile) {
        self.pref_size = other.pref_size;
        self.pref_map_mode = other.pref_map_mode.clone();
    }

    /// True if any top-level command paints with partial transparency.
    pub fn has_transparent_actions(&self) -> bool {
        self.actions.iter().any(Action::is_transparent)
    }
}

impl<'a> IntoIterator for &'a Metafile {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl FromIterator<Action> for Metafile {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Metafile::from_actions(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::geom::Rect;
    use crate::meta::action::{PolyPolygon, Polygon};

    #[test]
    fn test_has_transparent_actions() {
        let mut mtf = Metafile::new();
        mtf.push(Action::Rect(Rect::new(0, 0, 10, 10)));
        assert!(!mtf.has_transparent_actions());

        mtf.push(Action::Transparent {
            polygons: PolyPolygon::from(Polygon::from_rect(Rect::new(0, 0, 5, 5))),
            percent: 50,
        });
        assert!(mtf.has_transparent_actions());
        assert_eq!(mtf.len(), 2);
    }

    #[test]
    fn test_copy_preferences() {
        let src = Metafile::new().with_pref_size(Size::new(210, 297));
        let mut dst = Metafile::new();
        dst.copy_preferences(&src);
        assert_eq!(dst.pref_size(), Size::new(210, 297));
    }
}
