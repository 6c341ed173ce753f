//! Property resolver / proxy layer: presents every entity as if it had every
//! property, merging compute handlers, overlays, and statics, and computes
//! the rollups (lighting, visibility, reachability, load).
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::change::AttributeKey;
use crate::ident::{Direction, FlagId, ItemId, LocationId};
use crate::store::WorldStore;
use crate::value::{EntityId, Exit, ParentEntity, StateValue};

/// A pure function producing an attribute's value at read time.
///
/// Must not mutate `store`; it only observes the current snapshot.
pub type ComputeFn = fn(&WorldStore, &EntityId) -> Option<StateValue>;

/// Registry of compute handlers, keyed specifically first, then by attribute
/// alone as a fallback (mirrors the validator registry's precedence).
#[derive(Default)]
pub struct ComputeRegistry {
    specific: HashMap<(EntityId, AttributeKey), ComputeFn>,
    fallback: HashMap<AttributeKey, ComputeFn>,
}

impl ComputeRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compute handler for one specific entity and attribute.
    pub fn register(&mut self, entity: EntityId, attribute: AttributeKey, handler: ComputeFn) {
        self.specific.insert((entity, attribute), handler);
    }

    /// Registers a compute handler that applies to every entity for one attribute.
    pub fn register_fallback(&mut self, attribute: AttributeKey, handler: ComputeFn) {
        self.fallback.insert(attribute, handler);
    }

    fn lookup(&self, entity: &EntityId, attribute: &AttributeKey) -> Option<ComputeFn> {
        self.specific
            .get(&(entity.clone(), attribute.clone()))
            .or_else(|| self.fallback.get(attribute))
            .copied()
    }
}

fn apply_flag_overlay(flags: &mut BTreeSet<FlagId>, attribute: &AttributeKey, _value: &StateValue) {
    match attribute {
        AttributeKey::SetFlag(flag) => {
            flags.insert(flag.clone());
        }
        AttributeKey::ClearFlag(flag) => {
            flags.remove(flag);
        }
        _ => {}
    }
}

/// Read-only facade over a [`WorldStore`] plus a [`ComputeRegistry`].
///
/// Routes every property read through resolution order: compute handler →
/// overlay → static → default. Never exposes a mutable reference to the
/// underlying store.
pub struct Resolver<'a> {
    store: &'a WorldStore,
    compute: &'a ComputeRegistry,
}

impl<'a> Resolver<'a> {
    /// Builds a resolver over the given store and compute-handler registry.
    pub fn new(store: &'a WorldStore, compute: &'a ComputeRegistry) -> Self {
        Self { store, compute }
    }

    /// Resolves the effective value of `attribute` on `entity`.
    pub fn resolve(&self, entity: &EntityId, attribute: &AttributeKey) -> Option<StateValue> {
        if let Some(handler) = self.compute.lookup(entity, attribute) {
            if let Some(value) = handler(self.store, entity) {
                return Some(value);
            }
        }
        if let Some(value) = self.store.get_overlay(entity, attribute) {
            return Some(value);
        }
        self.static_value(entity, attribute)
    }

    fn static_value(&self, entity: &EntityId, attribute: &AttributeKey) -> Option<StateValue> {
        match entity {
            EntityId::Item(id) => self.item_static_value(id, attribute),
            EntityId::Location(id) => self.location_static_value(id, attribute),
            _ => None,
        }
    }

    fn item_static_value(&self, id: &ItemId, attribute: &AttributeKey) -> Option<StateValue> {
        let item = self.store.get_item_static(id).ok()?;
        match attribute {
            AttributeKey::ItemName => Some(StateValue::Str(item.name.clone())),
            AttributeKey::ItemAdjectives => Some(StateValue::StringSet(item.adjectives.clone())),
            AttributeKey::ItemSynonyms => Some(StateValue::StringSet(item.synonyms.clone())),
            AttributeKey::ItemSize => item.size.map(StateValue::Int),
            AttributeKey::ItemCapacity => item.capacity.map(StateValue::Int),
            AttributeKey::ItemDescription => item.description.clone().map(StateValue::Str),
            AttributeKey::ItemParent => Some(StateValue::Parent(item.initial_parent.clone())),
            _ => None,
        }
    }

    fn location_static_value(&self, id: &LocationId, attribute: &AttributeKey) -> Option<StateValue> {
        let location = self.store.get_location_static(id).ok()?;
        match attribute {
            AttributeKey::LocationName => Some(StateValue::Str(location.name.clone())),
            AttributeKey::LocationDescription => location.description.clone().map(StateValue::Str),
            AttributeKey::LocationExits => Some(StateValue::Exits(location.exits.clone())),
            _ => None,
        }
    }

    /// Effective flag set for an item: static flags with every `SetFlag`/
    /// `ClearFlag` overlay entry applied on top, in recorded order.
    pub fn item_flags(&self, id: &ItemId) -> BTreeSet<FlagId> {
        let mut flags = self
            .store
            .get_item_static(id)
            .map(|item| item.flags.clone())
            .unwrap_or_default();
        for (attribute, value) in self.store.item_overlay_entries(id) {
            apply_flag_overlay(&mut flags, attribute, value);
        }
        flags
    }

    /// Effective flag set for a location, static flags plus overlay entries.
    pub fn location_flags(&self, id: &LocationId) -> BTreeSet<FlagId> {
        let mut flags = self
            .store
            .get_location_static(id)
            .map(|location| location.flags.clone())
            .unwrap_or_default();
        for (attribute, value) in self.store.location_overlay_entries(id) {
            apply_flag_overlay(&mut flags, attribute, value);
        }
        flags
    }

    fn item_has_flag(&self, id: &ItemId, flag: &str) -> bool {
        self.item_flags(id).iter().any(|f| f.as_str() == flag)
    }

    fn location_has_flag(&self, id: &LocationId, flag: &str) -> bool {
        self.location_flags(id).iter().any(|f| f.as_str() == flag)
    }

    /// Whether a location is currently lit: inherently lit, or some light
    /// source is lit within it (through open/transparent containers and worn
    /// items), or the player's own inventory carries one.
    pub fn is_lit(&self, location: &LocationId) -> bool {
        if self.location_has_flag(location, "inherently-lit") {
            return true;
        }
        let direct = self.store.children_of(&ParentEntity::Location(location.clone()));
        if direct.iter().any(|id| self.is_providing_light(id)) {
            return true;
        }
        if self.store.player().location == *location {
            let carried = self.store.children_of(&ParentEntity::Player);
            if carried.iter().any(|id| self.is_providing_light(id)) {
                return true;
            }
        }
        false
    }

    /// Whether `item`'s enclosing chain up to its location is fully visible:
    /// every container ancestor is open or transparent, and the containing
    /// location is lit.
    pub fn is_visible(&self, item: &ItemId) -> bool {
        let Some(location) = self.enclosing_location(item) else {
            return false;
        };
        if !self.is_lit(&location) {
            return false;
        }
        self.ancestors(item)
            .iter()
            .all(|ancestor| self.item_has_flag(ancestor, "open") || self.item_has_flag(ancestor, "transparent"))
    }

    /// Whether `item` is visible **and** no closed, non-transparent container
    /// blocks the chain other than the player's own inventory.
    pub fn is_reachable(&self, item: &ItemId) -> bool {
        if !self.is_visible(item) {
            return false;
        }
        if matches!(self.store.effective_parent(item), ParentEntity::Player) {
            return true;
        }
        self.ancestors(item)
            .iter()
            .all(|ancestor| self.item_has_flag(ancestor, "open") || self.item_has_flag(ancestor, "transparent"))
    }

    /// Whether the item is a lit light source and currently visible.
    pub fn is_providing_light(&self, item: &ItemId) -> bool {
        self.item_has_flag(item, "light-source") && self.item_has_flag(item, "lit") && self.is_visible(item)
    }

    /// Sum of the sizes of `container`'s direct children (the
    /// engine counts direct children only).
    pub fn current_load(&self, container: &ItemId) -> i64 {
        self.store
            .children_of(&ParentEntity::Item(container.clone()))
            .iter()
            .filter_map(|child| self.store.get_item_static(child).ok())
            .filter_map(|child| child.size)
            .sum()
    }

    /// Stable-ordered direct contents of an entity that can contain items.
    pub fn contents(&self, parent: &ParentEntity) -> &[ItemId] {
        self.store.children_of(parent)
    }

    /// Stable-ordered exit table for a location.
    pub fn exits(&self, location: &LocationId) -> Option<BTreeMap<Direction, Exit>> {
        self.resolve(&EntityId::Location(location.clone()), &AttributeKey::LocationExits)
            .and_then(|value| value.as_exits().cloned())
    }

    /// Walks an item's parent chain up to the location it is ultimately within,
    /// or `None` if the chain terminates at `Nowhere` without one.
    fn enclosing_location(&self, item: &ItemId) -> Option<LocationId> {
        let mut current = self.store.effective_parent(item);
        for _ in 0..self.store.item_ids().count() + 1 {
            match current {
                ParentEntity::Location(loc) => return Some(loc),
                ParentEntity::Player => return Some(self.store.player().location.clone()),
                ParentEntity::Item(parent_id) => current = self.store.effective_parent(&parent_id),
                ParentEntity::Nowhere => return None,
            }
        }
        None
    }

    /// Ordered chain of container-item ancestors between `item` and its
    /// enclosing location or the player, nearest first.
    fn ancestors(&self, item: &ItemId) -> Vec<ItemId> {
        let mut chain = Vec::new();
        let mut current = self.store.effective_parent(item);
        for _ in 0..self.store.item_ids().count() + 1 {
            match current {
                ParentEntity::Item(parent_id) => {
                    chain.push(parent_id.clone());
                    current = self.store.effective_parent(&parent_id);
                }
                ParentEntity::Location(_) | ParentEntity::Player | ParentEntity::Nowhere => break,
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::FlagId;
    use crate::store::{ItemStatic, LocationStatic};
    use std::collections::BTreeMap as Map;

    fn flags(names: &[&str]) -> BTreeSet<FlagId> {
        names.iter().map(|n| FlagId::new(*n)).collect()
    }

    fn lit_room_with_lamp() -> WorldStore {
        let mut items = Map::new();
        items.insert(
            ItemId::new("lamp"),
            ItemStatic {
                id: "lamp".into(),
                name: "brass lamp".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("room".into()),
                flags: flags(&["takable", "light-source", "lit"]),
                size: Some(2),
                capacity: None,
                description: None,
            },
        );
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("room"),
            LocationStatic {
                id: "room".into(),
                name: "Room".into(),
                description: None,
                exits: Map::new(),
                flags: BTreeSet::new(),
            },
        );
        WorldStore::new(items, locations, "room".into())
    }

    #[test]
    fn room_is_lit_by_a_lit_carried_or_present_lamp() {
        let store = lit_room_with_lamp();
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        assert!(resolver.is_lit(&"room".into()));
        assert!(resolver.is_visible(&"lamp".into()));
        assert!(resolver.is_providing_light(&"lamp".into()));
    }

    #[test]
    fn dark_room_without_light_source_is_not_lit() {
        let mut items = Map::new();
        items.insert(
            ItemId::new("rock"),
            ItemStatic {
                id: "rock".into(),
                name: "rock".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("cave".into()),
                flags: BTreeSet::new(),
                size: Some(1),
                capacity: None,
                description: None,
            },
        );
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("cave"),
            LocationStatic {
                id: "cave".into(),
                name: "Cave".into(),
                description: None,
                exits: Map::new(),
                flags: BTreeSet::new(),
            },
        );
        let store = WorldStore::new(items, locations, "cave".into());
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        assert!(!resolver.is_lit(&"cave".into()));
        assert!(!resolver.is_visible(&"rock".into()));
    }

    #[test]
    fn current_load_sums_direct_children_sizes_only() {
        let mut items = Map::new();
        items.insert(
            ItemId::new("chest"),
            ItemStatic {
                id: "chest".into(),
                name: "chest".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("room".into()),
                flags: flags(&["container", "open"]),
                size: Some(10),
                capacity: Some(5),
                description: None,
            },
        );
        items.insert(
            ItemId::new("coin"),
            ItemStatic {
                id: "coin".into(),
                name: "coin".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Item("chest".into()),
                flags: flags(&["takable"]),
                size: Some(1),
                capacity: None,
                description: None,
            },
        );
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("room"),
            LocationStatic {
                id: "room".into(),
                name: "Room".into(),
                description: None,
                exits: Map::new(),
                flags: flags(&["inherently-lit"]),
            },
        );
        let store = WorldStore::new(items, locations, "room".into());
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        assert_eq!(resolver.current_load(&"chest".into()), 1);
        assert!(resolver.is_reachable(&"coin".into()));
    }
}
