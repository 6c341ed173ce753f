//! The world store: authoritative, indexed storage for every entity's
//! immutable static definition plus its mutable overlay.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::change::{AttributeKey, StateChange};
use crate::error::EngineError;
use crate::ident::{DaemonId, Direction, FlagId, FuseId, GlobalId, ItemId, LocationId, Pronoun};
use crate::value::{EntityId, Exit, ParentEntity, StateValue, TypedPayload};

/// Immutable, blueprint-supplied definition of an item.
#[derive(Clone, Debug)]
pub struct ItemStatic {
    /// The item's stable id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Adjectives the parser accepts before this item's name.
    pub adjectives: BTreeSet<String>,
    /// Additional nouns that also refer to this item.
    pub synonyms: BTreeSet<String>,
    /// Where the item starts: a location, a container item, the player, or nowhere.
    pub initial_parent: ParentEntity,
    /// Capability flags set at load time (takable, container, openable, ...).
    pub flags: BTreeSet<FlagId>,
    /// Size, used against a container's capacity.
    pub size: Option<i64>,
    /// Capacity, for items that can contain other items.
    pub capacity: Option<i64>,
    /// Default description, shown absent an overlay override.
    pub description: Option<String>,
}

/// Immutable, blueprint-supplied definition of a location.
#[derive(Clone, Debug)]
pub struct LocationStatic {
    /// The location's stable id.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Default description, shown absent an overlay override.
    pub description: Option<String>,
    /// Direction → exit table.
    pub exits: BTreeMap<Direction, Exit>,
    /// Capability flags (inherently-lit, outdoors, ...).
    pub flags: BTreeSet<FlagId>,
}

/// The player record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current location.
    pub location: LocationId,
    /// Score accumulated so far.
    pub score: i64,
    /// Number of moves taken so far.
    pub moves: i64,
    /// Maximum total size the player's inventory may hold.
    pub inventory_limit: Option<i64>,
    /// Health, if the game tracks it.
    pub health: Option<i64>,
}

/// Pronoun → referent-set bindings.
pub type PronounTable = BTreeMap<Pronoun, BTreeSet<ItemId>>;

/// Admin state for one active fuse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuseState {
    /// Turns remaining before the fuse fires (always ≥ 1 while active).
    pub turns: i64,
    /// Opaque typed payload, if the fuse carries one.
    pub payload: Option<TypedPayload>,
    /// The turn it was started on; the time system does not decrement it
    /// again during that same tick.
    pub created_turn: u64,
}

/// Admin state for one active daemon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonState {
    /// How many times this daemon has fired so far.
    pub execution_count: i64,
    /// The turn index it last fired on, or `-1` if never.
    pub last_execution_turn: i64,
    /// Opaque typed payload, if the daemon carries one.
    pub payload: Option<TypedPayload>,
    /// The turn it was started/activated on; skipped for due-now checks
    /// during that same tick.
    pub created_turn: u64,
}

/// The mutable portion of the world, the part a [`crate::snapshot::Snapshot`] captures.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Overlays {
    items: HashMap<ItemId, HashMap<AttributeKey, StateValue>>,
    locations: HashMap<LocationId, HashMap<AttributeKey, StateValue>>,
}

/// Everything a snapshot captures verbatim: every field of [`WorldStore`]
/// except the shared, immutable static item/location definitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct MutableState {
    overlays: Overlays,
    player: PlayerState,
    globals: HashMap<GlobalId, StateValue>,
    pronouns: PronounTable,
    change_log: Vec<StateChange>,
    children: HashMap<ParentEntity, Vec<ItemId>>,
    active_fuses: HashMap<FuseId, FuseState>,
    fuse_order: Vec<FuseId>,
    active_daemons: HashMap<DaemonId, DaemonState>,
    daemon_order: Vec<DaemonId>,
}

/// A `SetFlag(f)` overlay entry and a `ClearFlag(f)` overlay entry for the
/// same flag must never coexist (their relative insertion order would
/// otherwise be unrecoverable from an unordered map); writing one evicts the
/// other.
fn remove_opposite_flag_toggle(map: &mut HashMap<AttributeKey, StateValue>, attribute: &AttributeKey) {
    match attribute {
        AttributeKey::SetFlag(flag) => {
            map.remove(&AttributeKey::ClearFlag(flag.clone()));
        }
        AttributeKey::ClearFlag(flag) => {
            map.remove(&AttributeKey::SetFlag(flag.clone()));
        }
        _ => {}
    }
}

/// Authoritative storage of the world's static definitions plus mutable state.
///
/// Static definitions (`items`, `locations`) are loaded once and shared via
/// `Rc` so that [`WorldStore::snapshot`]/[`WorldStore::restore`] never copy
/// them; only the overlay, player, globals, pronoun bindings, and change log
/// are deep-copied.
pub struct WorldStore {
    items: Rc<BTreeMap<ItemId, ItemStatic>>,
    locations: Rc<BTreeMap<LocationId, LocationStatic>>,
    overlays: Overlays,
    player: PlayerState,
    globals: HashMap<crate::ident::GlobalId, StateValue>,
    pronouns: PronounTable,
    change_log: Vec<StateChange>,
    /// Reverse index: parent → ordered children. Order is insertion order so
    /// that descriptions enumerate contents deterministically.
    children: HashMap<ParentEntity, Vec<ItemId>>,
    active_fuses: HashMap<FuseId, FuseState>,
    /// Insertion order of active fuses (processing order is stable).
    fuse_order: Vec<FuseId>,
    active_daemons: HashMap<DaemonId, DaemonState>,
    /// Insertion order of active daemons.
    daemon_order: Vec<DaemonId>,
}

impl WorldStore {
    /// Builds a fresh store from blueprint-supplied static definitions and an
    /// initial player location.
    pub fn new(
        items: BTreeMap<ItemId, ItemStatic>,
        locations: BTreeMap<LocationId, LocationStatic>,
        player_start: LocationId,
    ) -> Self {
        let mut children: HashMap<ParentEntity, Vec<ItemId>> = HashMap::new();
        for item in items.values() {
            children
                .entry(item.initial_parent.clone())
                .or_default()
                .push(item.id.clone());
        }
        Self {
            items: Rc::new(items),
            locations: Rc::new(locations),
            overlays: Overlays::default(),
            player: PlayerState {
                location: player_start,
                score: 0,
                moves: 0,
                inventory_limit: None,
                health: None,
            },
            globals: HashMap::new(),
            pronouns: PronounTable::new(),
            change_log: Vec::new(),
            children,
            active_fuses: HashMap::new(),
            fuse_order: Vec::new(),
            active_daemons: HashMap::new(),
            daemon_order: Vec::new(),
        }
    }

    /// Returns the static definition for `id`, or a `NotFound` error.
    pub fn get_item_static(&self, id: &ItemId) -> Result<&ItemStatic, EngineError> {
        self.items
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("item {id}")))
    }

    /// Returns the static definition for `id`, or a `NotFound` error.
    pub fn get_location_static(&self, id: &LocationId) -> Result<&LocationStatic, EngineError> {
        self.locations
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("location {id}")))
    }

    /// Lists every declared item id, in static iteration (sorted) order.
    pub fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.keys()
    }

    /// Lists every declared location id, in static iteration (sorted) order.
    pub fn location_ids(&self) -> impl Iterator<Item = &LocationId> {
        self.locations.keys()
    }

    /// Reads the current overlay value for `(entity, attribute)`, if one was ever set.
    ///
    /// For `EntityId::Player`, the player's concrete fields are projected
    /// back into a `StateValue` on the fly rather than stored redundantly.
    pub fn get_overlay(&self, entity: &EntityId, attribute: &AttributeKey) -> Option<StateValue> {
        match entity {
            EntityId::Item(id) => self.overlays.items.get(id)?.get(attribute).cloned(),
            EntityId::Location(id) => self.overlays.locations.get(id)?.get(attribute).cloned(),
            EntityId::Player => self.player_attribute(attribute),
            EntityId::Global(_) | EntityId::Fuse(_) | EntityId::Daemon(_) => None,
        }
    }

    fn player_attribute(&self, attribute: &AttributeKey) -> Option<StateValue> {
        match attribute {
            AttributeKey::PlayerScore => Some(StateValue::Int(self.player.score)),
            AttributeKey::PlayerMoves => Some(StateValue::Int(self.player.moves)),
            AttributeKey::PlayerLocation => {
                Some(StateValue::LocationRef(self.player.location.clone()))
            }
            AttributeKey::PlayerInventoryLimit => self.player.inventory_limit.map(StateValue::Int),
            AttributeKey::PlayerHealth => self.player.health.map(StateValue::Int),
            _ => None,
        }
    }

    /// Writes an overlay value. Package-private: only
    /// [`crate::engine::StateChangeEngine::apply`] may call this.
    pub(crate) fn set_overlay(&mut self, entity: &EntityId, attribute: AttributeKey, value: StateValue) {
        if attribute == AttributeKey::ItemParent {
            if let (EntityId::Item(id), StateValue::Parent(new_parent)) = (entity, &value) {
                self.reparent(id, new_parent.clone());
            }
        }
        match entity {
            EntityId::Item(id) => {
                let map = self.overlays.items.entry(id.clone()).or_default();
                remove_opposite_flag_toggle(map, &attribute);
                map.insert(attribute, value);
            }
            EntityId::Location(id) => {
                let map = self.overlays.locations.entry(id.clone()).or_default();
                remove_opposite_flag_toggle(map, &attribute);
                map.insert(attribute, value);
            }
            EntityId::Player => {
                if let AttributeKey::PronounBind(pronoun) = &attribute {
                    if let Some(referents) = value.as_item_set() {
                        self.bind_pronoun(*pronoun, referents.clone());
                    }
                    return;
                }
                self.set_player_attribute(&attribute, &value)
            }
            EntityId::Global(id) => self.set_global(id.clone(), value),
            EntityId::Fuse(_) | EntityId::Daemon(_) => {}
        }
    }

    fn set_player_attribute(&mut self, attribute: &AttributeKey, value: &StateValue) {
        match attribute {
            AttributeKey::PlayerScore => {
                if let Some(v) = value.as_int() {
                    self.player.score = v;
                }
            }
            AttributeKey::PlayerMoves => {
                if let Some(v) = value.as_int() {
                    self.player.moves = v;
                }
            }
            AttributeKey::PlayerLocation => {
                if let Some(loc) = value.as_location_ref() {
                    self.player.location = loc.clone();
                }
            }
            AttributeKey::PlayerInventoryLimit => self.player.inventory_limit = value.as_int(),
            AttributeKey::PlayerHealth => self.player.health = value.as_int(),
            _ => {}
        }
    }

    fn reparent(&mut self, id: &ItemId, new_parent: ParentEntity) {
        let old_parent = self.effective_parent(id);
        if let Some(siblings) = self.children.get_mut(&old_parent) {
            siblings.retain(|child| child != id);
        }
        self.children.entry(new_parent).or_default().push(id.clone());
    }

    /// The item's current parent: overlay if set, else the static initial parent.
    pub fn effective_parent(&self, id: &ItemId) -> ParentEntity {
        if let Some(value) = self.get_overlay(&EntityId::Item(id.clone()), &AttributeKey::ItemParent) {
            if let Some(parent) = value.as_parent() {
                return parent.clone();
            }
        }
        self.items
            .get(id)
            .map(|item| item.initial_parent.clone())
            .unwrap_or(ParentEntity::Nowhere)
    }

    /// Ordered children of `parent` (insertion-order stable).
    pub fn children_of(&self, parent: &ParentEntity) -> &[ItemId] {
        self.children.get(parent).map_or(&[], Vec::as_slice)
    }

    /// Read-only access to the player record.
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Writes the player record. Package-private.
    pub(crate) fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    /// Reads a global bag entry.
    pub fn get_global(&self, id: &crate::ident::GlobalId) -> Option<&StateValue> {
        self.globals.get(id)
    }

    /// Writes a global bag entry. Package-private.
    pub(crate) fn set_global(&mut self, id: crate::ident::GlobalId, value: StateValue) {
        self.globals.insert(id, value);
    }

    /// Iterates the overlay entries recorded for a single item, for flag
    /// resolution (`SetFlag`/`ClearFlag` are stored as individual keys rather
    /// than a single flag-set blob).
    pub(crate) fn item_overlay_entries(
        &self,
        id: &ItemId,
    ) -> impl Iterator<Item = (&AttributeKey, &StateValue)> {
        self.overlays.items.get(id).into_iter().flatten()
    }

    /// Iterates the overlay entries recorded for a single location.
    pub(crate) fn location_overlay_entries(
        &self,
        id: &LocationId,
    ) -> impl Iterator<Item = (&AttributeKey, &StateValue)> {
        self.overlays.locations.get(id).into_iter().flatten()
    }

    /// Current pronoun bindings.
    pub fn pronouns(&self) -> &PronounTable {
        &self.pronouns
    }

    /// Binds a pronoun to a referent set. Package-private.
    pub(crate) fn bind_pronoun(&mut self, pronoun: Pronoun, referents: BTreeSet<ItemId>) {
        self.pronouns.insert(pronoun, referents);
    }

    /// Appends a change record to the append-only log. Package-private.
    pub(crate) fn push_change_log(&mut self, change: StateChange) {
        self.change_log.push(change);
    }

    /// Registers a fuse as active. Package-private; `turns` must be ≥ 1,
    /// enforced by the caller (`engine::StateChangeEngine::translate`).
    pub(crate) fn start_fuse(&mut self, id: FuseId, turns: i64, payload: Option<TypedPayload>, created_turn: u64) {
        if !self.active_fuses.contains_key(&id) {
            self.fuse_order.push(id.clone());
        }
        self.active_fuses.insert(id, FuseState { turns, payload, created_turn });
    }

    /// Removes an active fuse, returning its last state if it was active.
    pub(crate) fn stop_fuse(&mut self, id: &FuseId) -> Option<FuseState> {
        self.fuse_order.retain(|existing| existing != id);
        self.active_fuses.remove(id)
    }

    /// Overwrites an active fuse's remaining turn count.
    pub(crate) fn update_fuse_turns(&mut self, id: &FuseId, turns: i64) {
        if let Some(state) = self.active_fuses.get_mut(id) {
            state.turns = turns;
        }
    }

    /// Active fuse ids in insertion order (stable processing order).
    pub fn fuse_ids_in_order(&self) -> impl Iterator<Item = &FuseId> {
        self.fuse_order.iter()
    }

    /// Reads a fuse's current admin state.
    pub fn get_fuse(&self, id: &FuseId) -> Option<&FuseState> {
        self.active_fuses.get(id)
    }

    /// Registers a daemon as active. Package-private.
    pub(crate) fn start_daemon(&mut self, id: DaemonId, payload: Option<TypedPayload>, created_turn: u64) {
        if !self.active_daemons.contains_key(&id) {
            self.daemon_order.push(id.clone());
        }
        self.active_daemons.insert(
            id,
            DaemonState { execution_count: 0, last_execution_turn: -1, payload, created_turn },
        );
    }

    /// Removes an active daemon, returning its last state if it was active.
    pub(crate) fn stop_daemon(&mut self, id: &DaemonId) -> Option<DaemonState> {
        self.daemon_order.retain(|existing| existing != id);
        self.active_daemons.remove(id)
    }

    /// Replaces a daemon's mutable execution state after it fires.
    pub(crate) fn update_daemon_state(&mut self, id: &DaemonId, state: DaemonState) {
        if self.active_daemons.contains_key(id) {
            self.active_daemons.insert(id.clone(), state);
        }
    }

    /// Active daemon ids in insertion order.
    pub fn daemon_ids_in_order(&self) -> impl Iterator<Item = &DaemonId> {
        self.daemon_order.iter()
    }

    /// Reads a daemon's current admin state.
    pub fn get_daemon(&self, id: &DaemonId) -> Option<&DaemonState> {
        self.active_daemons.get(id)
    }

    /// The full change log, oldest first.
    pub fn change_log(&self) -> &[StateChange] {
        &self.change_log
    }

    /// Shared handle to the static item definitions.
    pub(crate) fn items_static(&self) -> &Rc<BTreeMap<ItemId, ItemStatic>> {
        &self.items
    }

    /// Shared handle to the static location definitions.
    pub(crate) fn locations_static(&self) -> &Rc<BTreeMap<LocationId, LocationStatic>> {
        &self.locations
    }

    /// Clones every mutable field for [`crate::snapshot::Snapshot::capture`].
    pub(crate) fn mutable_state(&self) -> MutableState {
        MutableState {
            overlays: self.overlays.clone(),
            player: self.player.clone(),
            globals: self.globals.clone(),
            pronouns: self.pronouns.clone(),
            change_log: self.change_log.clone(),
            children: self.children.clone(),
            active_fuses: self.active_fuses.clone(),
            fuse_order: self.fuse_order.clone(),
            active_daemons: self.active_daemons.clone(),
            daemon_order: self.daemon_order.clone(),
        }
    }

    /// Overwrites every mutable field from a captured [`MutableState`],
    /// leaving the shared static definitions untouched — they are shared
    /// across snapshot/restore, never copied.
    pub(crate) fn restore_mutable_state(&mut self, state: MutableState) {
        self.overlays = state.overlays;
        self.player = state.player;
        self.globals = state.globals;
        self.pronouns = state.pronouns;
        self.change_log = state.change_log;
        self.children = state.children;
        self.active_fuses = state.active_fuses;
        self.fuse_order = state.fuse_order;
        self.active_daemons = state.active_daemons;
        self.daemon_order = state.daemon_order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> WorldStore {
        let mut items = BTreeMap::new();
        items.insert(
            ItemId::new("lamp"),
            ItemStatic {
                id: "lamp".into(),
                name: "brass lamp".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("foyer".into()),
                flags: BTreeSet::from([FlagId::new("takable")]),
                size: Some(2),
                capacity: None,
                description: None,
            },
        );
        let mut locations = BTreeMap::new();
        locations.insert(
            LocationId::new("foyer"),
            LocationStatic {
                id: "foyer".into(),
                name: "Foyer".into(),
                description: None,
                exits: BTreeMap::new(),
                flags: BTreeSet::new(),
            },
        );
        WorldStore::new(items, locations, "foyer".into())
    }

    #[test]
    fn children_of_reflects_initial_static_parent() {
        let store = sample_store();
        let children = store.children_of(&ParentEntity::Location("foyer".into()));
        assert_eq!(children, &[ItemId::new("lamp")]);
    }

    #[test]
    fn reparent_updates_reverse_index_on_both_sides() {
        let mut store = sample_store();
        store.set_overlay(
            &EntityId::Item("lamp".into()),
            AttributeKey::ItemParent,
            StateValue::Parent(ParentEntity::Player),
        );
        assert!(store
            .children_of(&ParentEntity::Location("foyer".into()))
            .is_empty());
        assert_eq!(
            store.children_of(&ParentEntity::Player),
            &[ItemId::new("lamp")]
        );
        assert_eq!(store.effective_parent(&"lamp".into()), ParentEntity::Player);
    }

    #[test]
    fn setting_a_flag_evicts_a_prior_clear_of_the_same_flag() {
        let mut store = sample_store();
        let flag = FlagId::new("lit");
        store.set_overlay(
            &EntityId::Item("lamp".into()),
            AttributeKey::ClearFlag(flag.clone()),
            StateValue::Bool(true),
        );
        store.set_overlay(
            &EntityId::Item("lamp".into()),
            AttributeKey::SetFlag(flag.clone()),
            StateValue::Bool(true),
        );
        let entries: Vec<_> = store.item_overlay_entries(&"lamp".into()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, &AttributeKey::SetFlag(flag));
    }

    #[test]
    fn unknown_item_is_not_found_not_panic() {
        let store = sample_store();
        let err = store.get_item_static(&"ghost".into()).unwrap_err();
        assert_eq!(err, EngineError::NotFound("item ghost".into()));
    }
}
