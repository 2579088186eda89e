//! Items lying in rooms that characters can be positioned against or drag.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use somatic_types::{ItemId, Perceivable, PositionModifier, PositionState, RoomId, RoomLayer, Size};

/// A physical object in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Display name ("a wooden bench").
    pub name: String,
    /// Room the item is in.
    pub room: RoomId,
    /// Layer the item rests on.
    pub layer: RoomLayer,
    /// Weight in kilograms.
    pub weight: f64,
    /// Size class.
    pub size: Size,
    /// Modifiers a character may use against this item.
    pub accepts: BTreeSet<PositionModifier>,
    /// Postures a character may hold against this item; empty means any.
    pub postures: BTreeSet<PositionState>,
    /// How the item itself is positioned against something else.
    pub modifier: PositionModifier,
    /// What the item is positioned against, if anything.
    pub target: Option<Perceivable>,
}

impl Item {
    /// Create an item that accepts no positioning.
    pub fn new(name: impl Into<String>, room: RoomId, layer: RoomLayer) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            room,
            layer,
            weight: 1.0,
            size: Size::Small,
            accepts: BTreeSet::new(),
            postures: BTreeSet::new(),
            modifier: PositionModifier::None,
            target: None,
        }
    }

    /// Set weight and size.
    #[must_use]
    pub const fn with_bulk(mut self, weight: f64, size: Size) -> Self {
        self.weight = weight;
        self.size = size;
        self
    }

    /// Allow characters to position themselves against the item with
    /// the given modifiers.
    #[must_use]
    pub fn accepting(mut self, modifiers: impl IntoIterator<Item = PositionModifier>) -> Self {
        self.accepts.extend(modifiers);
        self
    }

    /// Restrict which postures may be held against the item.
    #[must_use]
    pub fn only_postures(mut self, postures: impl IntoIterator<Item = PositionState>) -> Self {
        self.postures.extend(postures);
        self
    }

    /// Whether a character may adopt `state` with `modifier` against this
    /// item. Being merely near something is always allowed.
    pub fn can_be_positioned_against(
        &self,
        state: PositionState,
        modifier: PositionModifier,
    ) -> bool {
        if modifier == PositionModifier::None {
            return true;
        }
        self.accepts.contains(&modifier)
            && (self.postures.is_empty() || self.postures.contains(&state))
    }

    /// Rest the item against `target`.
    pub const fn place(&mut self, modifier: PositionModifier, target: Perceivable) {
        self.modifier = modifier;
        self.target = Some(target);
    }

    /// Clear the item's positioning.
    pub const fn clear_position(&mut self) {
        self.modifier = PositionModifier::None;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_accepts_sitting_on() {
        let bench = Item::new("a bench", RoomId::new(), RoomLayer::GroundLevel)
            .accepting([PositionModifier::On, PositionModifier::Behind])
            .only_postures([PositionState::Sitting, PositionState::Lounging]);
        assert!(bench.can_be_positioned_against(PositionState::Sitting, PositionModifier::On));
        assert!(!bench.can_be_positioned_against(PositionState::Standing, PositionModifier::On));
        assert!(!bench.can_be_positioned_against(PositionState::Sitting, PositionModifier::In));
        assert!(bench.can_be_positioned_against(PositionState::Standing, PositionModifier::None));
    }

    #[test]
    fn placement_can_be_cleared() {
        let mut crate_item = Item::new("a crate", RoomId::new(), RoomLayer::GroundLevel);
        let under = Perceivable::Item(ItemId::new());
        crate_item.place(PositionModifier::On, under);
        assert_eq!(crate_item.target, Some(under));
        crate_item.clear_position();
        assert_eq!(crate_item.modifier, PositionModifier::None);
        assert!(crate_item.target.is_none());
    }
}
