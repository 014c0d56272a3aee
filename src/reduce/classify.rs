// src/reduce/classify.rs

//! Transparency classification of single commands.

use crate::device::state::DeviceState;
use crate::meta::action::Action;

/// How a command interacts with transparency on a non-compositing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransparencyClass {
    /// Paints nothing visible; never merged with anything.
    FullyTransparent,
    /// Paints opaque ink.
    Opaque,
    /// Transparent, but blends correctly against a solid background.
    SelfCompositing,
    /// Transparent and only representable by rasterizing its region.
    NeedsRaster,
}

impl TransparencyClass {
    pub fn of(action: &Action, state: &DeviceState) -> Self {
        if !generates_ink(action, state) {
            TransparencyClass::FullyTransparent
        } else if !action.is_transparent() {
            TransparencyClass::Opaque
        } else if handles_transparency(action) {
            TransparencyClass::SelfCompositing
        } else {
            TransparencyClass::NeedsRaster
        }
    }
}

/// Whether `action` leaves visible ink with the colors in `state`.
pub fn generates_ink(action: &Action, state: &DeviceState) -> bool {
    match action {
        Action::Pixel { .. } => true,
        Action::Line { .. } => state.has_line(),
        Action::Rect(_) | Action::Polygon(_) | Action::PolyPolygon(_) => {
            state.has_line() || state.has_fill()
        }
        Action::Bmp { .. }
        | Action::BmpScale { .. }
        | Action::BmpScalePart { .. }
        | Action::BmpEx { .. }
        | Action::BmpExScale { .. }
        | Action::BmpExScalePart { .. }
        | Action::Wallpaper { .. }
        | Action::FloatTransparent { .. } => true,
        Action::Transparent { percent, .. } => *percent < 100,
        Action::Push
        | Action::Pop
        | Action::MapMode(_)
        | Action::FillColor(_)
        | Action::LineColor(_)
        | Action::ClipRegion(_)
        | Action::IntersectClipRect(_)
        | Action::Comment { .. } => false,
    }
}

/// Commands that blend correctly against a solid background on their own.
pub fn handles_transparency(action: &Action) -> bool {
    matches!(
        action,
        Action::Transparent { .. }
            | Action::BmpEx { .. }
            | Action::BmpExScale { .. }
            | Action::BmpExScalePart { .. }
    )
}

/// Decides whether the component a command of `class` is about to join
/// must be rasterized.
///
/// `absorbed_special` is set when any component merged into it was already
/// special; `has_prior_members` when ink precedes the command in it.
pub fn mark_special(
    absorbed_special: bool,
    class: TransparencyClass,
    has_prior_members: bool,
) -> bool {
    if absorbed_special {
        return true;
    }
    match class {
        TransparencyClass::FullyTransparent | TransparencyClass::Opaque => false,
        TransparencyClass::SelfCompositing => has_prior_members,
        TransparencyClass::NeedsRaster => true,
    }
}
