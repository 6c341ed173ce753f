//! The closed `StateValue` sum type and the entity-reference types it composes with.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ident::{AttributeId, Direction, FlagId, ItemId, LocationId, Pronoun};

/// Target of a [`crate::change::StateChange`] or overlay lookup.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EntityId {
    /// An item.
    Item(ItemId),
    /// A location.
    Location(LocationId),
    /// The player record.
    Player,
    /// A fuse's admin state.
    Fuse(crate::ident::FuseId),
    /// A daemon's admin state.
    Daemon(crate::ident::DaemonId),
    /// The global key/value bag, keyed separately by `GlobalId`.
    Global(crate::ident::GlobalId),
}

/// Where an item currently resides. Dereferencing this chain must always
/// terminate at a location, the player, or nowhere.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ParentEntity {
    /// Directly in a location.
    Location(LocationId),
    /// Inside or on another item (a container or supporter).
    Item(ItemId),
    /// Carried or worn by the player.
    Player,
    /// Not part of the reachable world (removed from play).
    Nowhere,
}

/// A single exit from a location.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Exit {
    /// Leads to another location.
    To(LocationId),
    /// Always refused, with the message to show.
    Blocked(String),
    /// Leads to another location only if a condition holds; otherwise shows the message.
    Conditional {
        /// Destination when the condition holds.
        to: LocationId,
        /// Flag that must be set for the exit to be usable.
        required_flag: FlagId,
        /// Message shown when the flag is not set.
        barred_message: String,
    },
}

/// The closed set of shapes a value may take anywhere in the engine:
/// overlays, static definitions, change records, and global-bag entries.
///
/// No other shapes are legal. Cross-type reads (e.g. asking for a `Bool` where
/// a `String` is stored) return `None` from [`StateValue`] accessor methods
/// rather than panicking.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum StateValue {
    /// A boolean value.
    Bool(bool),
    /// A signed integer value.
    Int(i64),
    /// A string value.
    Str(String),
    /// A reference to a single item.
    ItemRef(ItemId),
    /// A reference to a set of items.
    ItemSet(BTreeSet<ItemId>),
    /// A reference to a location.
    LocationRef(LocationId),
    /// A set of flags on an item.
    ItemFlagSet(BTreeSet<FlagId>),
    /// A set of flags on a location.
    LocationFlagSet(BTreeSet<FlagId>),
    /// A location's exit table.
    Exits(BTreeMap<Direction, Exit>),
    /// A parent reference (location, item, player, or nowhere).
    Parent(ParentEntity),
    /// A set of strings (e.g. synonyms, adjectives).
    StringSet(BTreeSet<String>),
}

impl StateValue {
    /// Returns the boolean value, or `None` if this is not a [`StateValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer value, or `None` if this is not a [`StateValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, or `None` if this is not a [`StateValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the item reference, or `None` if this is not a [`StateValue::ItemRef`].
    pub fn as_item_ref(&self) -> Option<&ItemId> {
        match self {
            StateValue::ItemRef(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the item set, or `None` if this is not a [`StateValue::ItemSet`].
    pub fn as_item_set(&self) -> Option<&BTreeSet<ItemId>> {
        match self {
            StateValue::ItemSet(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the location reference, or `None` if this is not a [`StateValue::LocationRef`].
    pub fn as_location_ref(&self) -> Option<&LocationId> {
        match self {
            StateValue::LocationRef(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the parent reference, or `None` if this is not a [`StateValue::Parent`].
    pub fn as_parent(&self) -> Option<&ParentEntity> {
        match self {
            StateValue::Parent(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the flag set (item or location), or `None` otherwise.
    pub fn as_flag_set(&self) -> Option<&BTreeSet<FlagId>> {
        match self {
            StateValue::ItemFlagSet(v) | StateValue::LocationFlagSet(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the exit table, or `None` if this is not a [`StateValue::Exits`].
    pub fn as_exits(&self) -> Option<&BTreeMap<Direction, Exit>> {
        match self {
            StateValue::Exits(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string set, or `None` if this is not a [`StateValue::StringSet`].
    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            StateValue::StringSet(v) => Some(v),
            _ => None,
        }
    }
}

/// An opaque, typed blob attached to a fuse or daemon, the Rust analogue of a
/// type-erased `Codable` payload: a type tag plus a JSON value.
/// Retrieval with the wrong tag returns `None` rather than erroring.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TypedPayload {
    tag: String,
    value: serde_json::Value,
}

impl TypedPayload {
    /// Packs a serializable value under the given type tag.
    pub fn pack<T: Serialize>(tag: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            tag: tag.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// Unpacks the payload as `T` if the stored tag matches `expected_tag`.
    /// Returns `None` on tag mismatch, never an error.
    pub fn unpack<T: for<'de> Deserialize<'de>>(&self, expected_tag: &str) -> Option<T> {
        if self.tag != expected_tag {
            return None;
        }
        serde_json::from_value(self.value.clone()).ok()
    }

    /// The payload's type tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// A fixed, pre-categorized always-present abstract referent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UniversalGroup {
    /// Sky, sun, stars.
    Celestial,
    /// Ground, floor.
    Ground,
    /// Walls, ceiling.
    Structure,
    /// Water, air.
    Element,
}

/// Pairs a [`crate::ident::UniversalId`] with the vocabulary words that name it and its group.
#[derive(Clone, Debug)]
pub struct Universal {
    /// The stable identifier used in `ObjectRef::Universal`.
    pub id: crate::ident::UniversalId,
    /// Names this universal answers to ("sky", "the sky", ...).
    pub names: Vec<&'static str>,
    /// Which semantic group it belongs to.
    pub group: UniversalGroup,
}

/// The fixed set of universals every game world implicitly contains.
pub fn default_universals() -> Vec<Universal> {
    use UniversalGroup::{Celestial, Element, Ground, Structure};
    vec![
        Universal { id: "sky".into(), names: vec!["sky"], group: Celestial },
        Universal { id: "sun".into(), names: vec!["sun"], group: Celestial },
        Universal { id: "ground".into(), names: vec!["ground"], group: Ground },
        Universal { id: "floor".into(), names: vec!["floor"], group: Ground },
        Universal { id: "walls".into(), names: vec!["wall", "walls"], group: Structure },
        Universal { id: "ceiling".into(), names: vec!["ceiling"], group: Structure },
        Universal { id: "water".into(), names: vec!["water"], group: Element },
        Universal { id: "air".into(), names: vec!["air"], group: Element },
    ]
}

/// Opaque per-game attribute key used by [`crate::change::AttributeKey::ItemAttribute`]
/// and `LocationAttribute` variants.
pub type GameAttribute = AttributeId;

/// Convenience re-export so callers constructing pronoun bindings don't need
/// the `ident` module in scope.
pub type PronounWord = Pronoun;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_type_accessor_returns_none_not_panic() {
        let v = StateValue::Bool(true);
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_bool(), Some(true));
    }

    #[test]
    fn json_round_trip_preserves_variant() {
        let values = vec![
            StateValue::Bool(true),
            StateValue::Int(-7),
            StateValue::Str("lamp".into()),
            StateValue::ItemRef("lamp".into()),
            StateValue::Parent(ParentEntity::Player),
        ];
        for v in values {
            let json = serde_json::to_string(&v).expect("serialize");
            let back: StateValue = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(v, back);
        }
    }

    #[test]
    fn typed_payload_wrong_tag_is_absent_not_error() {
        let payload = TypedPayload::pack("fuse/candle", &3u32).expect("pack");
        assert_eq!(payload.unpack::<u32>("fuse/candle"), Some(3));
        assert_eq!(payload.unpack::<u32>("fuse/other"), None);
    }

    #[test]
    fn default_universals_cover_fixed_categories() {
        let universals = default_universals();
        assert!(universals.iter().any(|u| u.id.as_str() == "sky"));
        assert!(universals.iter().any(|u| u.id.as_str() == "floor"));
    }
}
