//! The state-change engine: the sole writer to the world store.
use std::collections::HashMap;

use crate::change::{AttributeKey, SideEffect, StateChange};
use crate::error::{ActionResponse, EngineError};
use crate::ident::{DaemonId, FuseId};
use crate::resolver::{ComputeRegistry, Resolver};
use crate::store::WorldStore;
use crate::value::{EntityId, StateValue};

/// A pure function that accepts or rejects a proposed attribute change, given
/// the entity's current effective value. Rejection is a typed
/// [`ActionResponse`] (typically `PrerequisiteNotMet`), consumed by the
/// messenger.
pub type ValidatorFn = fn(&WorldStore, &EntityId, &AttributeKey, Option<&StateValue>, &StateValue) -> Result<(), ActionResponse>;

/// Registry of validators, keyed specifically first, then by attribute alone
/// as a fallback — the same precedence shape as [`crate::resolver::ComputeRegistry`].
#[derive(Default)]
pub struct ValidatorRegistry {
    specific: HashMap<(EntityId, AttributeKey), ValidatorFn>,
    fallback: HashMap<AttributeKey, ValidatorFn>,
}

impl ValidatorRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator for one specific entity and attribute.
    pub fn register(&mut self, entity: EntityId, attribute: AttributeKey, validator: ValidatorFn) {
        self.specific.insert((entity, attribute), validator);
    }

    /// Registers a validator that applies to every entity for one attribute.
    pub fn register_fallback(&mut self, attribute: AttributeKey, validator: ValidatorFn) {
        self.fallback.insert(attribute, validator);
    }

    fn lookup(&self, entity: &EntityId, attribute: &AttributeKey) -> Option<ValidatorFn> {
        self.specific
            .get(&(entity.clone(), attribute.clone()))
            .or_else(|| self.fallback.get(attribute))
            .copied()
    }
}

/// The sole writer to a [`WorldStore`]'s mutable state.
pub struct StateChangeEngine {
    validators: ValidatorRegistry,
}

impl StateChangeEngine {
    /// Builds an engine over the given validator registry.
    pub fn new(validators: ValidatorRegistry) -> Self {
        Self { validators }
    }

    fn effective_value(resolver: &Resolver<'_>, store: &WorldStore, entity: &EntityId, attribute: &AttributeKey) -> Option<StateValue> {
        match entity {
            EntityId::Item(_) | EntityId::Location(_) => resolver.resolve(entity, attribute),
            EntityId::Player => store.get_overlay(entity, attribute),
            EntityId::Global(id) => store.get_global(id).cloned(),
            EntityId::Fuse(_) | EntityId::Daemon(_) => None,
        }
    }

    /// Applies one change: validates it against the entity's current
    /// effective value, then writes the overlay and appends the fully
    /// populated record (with the observed `old_value`) to the change log.
    ///
    /// Takes a compute registry rather than a ready-made [`Resolver`] because
    /// the resolver's read of the old value must be dropped before the
    /// overlay write below borrows the store mutably; building it internally,
    /// scoped to that one read, keeps both borrows from overlapping at any
    /// call site.
    ///
    /// # Errors
    /// Returns the validator's rejection, unchanged, if one is registered and
    /// rejects the proposed value. The store is left untouched on rejection.
    pub fn apply(
        &self,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        target: EntityId,
        attribute: AttributeKey,
        new_value: StateValue,
        turn: u64,
    ) -> Result<StateChange, ActionResponse> {
        let old_value = {
            let resolver = Resolver::new(store, compute);
            Self::effective_value(&resolver, store, &target, &attribute)
        };
        if let Some(validator) = self.validators.lookup(&target, &attribute) {
            validator(store, &target, &attribute, old_value.as_ref(), &new_value)?;
        }
        let record = StateChange {
            target: target.clone(),
            attribute: attribute.clone(),
            old_value,
            new_value: new_value.clone(),
            turn,
        };
        store.set_overlay(&target, attribute, new_value);
        store.push_change_log(record.clone());
        Ok(record)
    }

    /// Applies every change in order; stops at the first rejection. The
    /// caller receives the successful prefix alongside the failure — handlers
    /// are expected to validate before returning a batch, so the pipeline
    /// does not roll back changes already applied.
    pub fn apply_all(
        &self,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        changes: Vec<(EntityId, AttributeKey, StateValue)>,
        turn: u64,
    ) -> Result<Vec<StateChange>, (Vec<StateChange>, ActionResponse)> {
        let mut applied = Vec::with_capacity(changes.len());
        for (target, attribute, value) in changes {
            match self.apply(store, compute, target, attribute, value, turn) {
                Ok(record) => applied.push(record),
                Err(err) => return Err((applied, err)),
            }
        }
        Ok(applied)
    }

    /// Translates a handler-emitted side effect into the concrete store
    /// mutation it describes.
    ///
    /// Fuse/daemon admin state lives outside the generic overlay system (it
    /// has no `StateValue` shape of its own), so this writes directly to the
    /// fuse/daemon maps rather than through `set_overlay`, but still appends a
    /// minimal audit record to the change log so the log stays complete for it.
    pub fn translate(
        &self,
        store: &mut WorldStore,
        effect: SideEffect,
        turn: u64,
    ) -> Result<Option<StateChange>, EngineError> {
        match effect {
            SideEffect::StartFuse { id, turns, payload } => {
                let turns = turns.unwrap_or(1);
                if turns < 1 {
                    return Err(EngineError::InvalidSideEffect(format!(
                        "fuse {id} scheduled with turns = {turns}, must be >= 1"
                    )));
                }
                store.start_fuse(id.clone(), turns, payload, turn);
                Ok(Some(fuse_audit_record(id, StateValue::Int(turns), turn)))
            }
            SideEffect::StopFuse(id) => {
                store.stop_fuse(&id);
                Ok(Some(StateChange {
                    target: EntityId::Fuse(id.clone()),
                    attribute: AttributeKey::RemoveActiveFuse(id),
                    old_value: None,
                    new_value: StateValue::Bool(false),
                    turn,
                }))
            }
            SideEffect::RunDaemon(id) => {
                store.start_daemon(id.clone(), None, turn);
                Ok(Some(StateChange {
                    target: EntityId::Daemon(id.clone()),
                    attribute: AttributeKey::AddActiveDaemon(id),
                    old_value: None,
                    new_value: StateValue::Bool(true),
                    turn,
                }))
            }
            SideEffect::StopDaemon(id) => {
                store.stop_daemon(&id);
                Ok(Some(StateChange {
                    target: EntityId::Daemon(id.clone()),
                    attribute: AttributeKey::RemoveActiveDaemon(id),
                    old_value: None,
                    new_value: StateValue::Bool(false),
                    turn,
                }))
            }
            SideEffect::ScheduleEvent { .. } => Ok(None),
        }
    }
}

fn fuse_audit_record(id: FuseId, new_value: StateValue, turn: u64) -> StateChange {
    StateChange {
        target: EntityId::Fuse(id.clone()),
        attribute: AttributeKey::AddActiveFuse { id, initial_turns: new_value.as_int().unwrap_or(0) },
        old_value: None,
        new_value,
        turn,
    }
}

/// Writes a daemon's updated execution bookkeeping and logs it, used by the
/// time system after a daemon fires.
pub fn record_daemon_fired(store: &mut WorldStore, id: &DaemonId, execution_count: i64, turn: u64) -> StateChange {
    let Some(existing) = store.get_daemon(id) else {
        return StateChange {
            target: EntityId::Daemon(id.clone()),
            attribute: AttributeKey::UpdateDaemonState(id.clone()),
            old_value: None,
            new_value: StateValue::Int(execution_count),
            turn,
        };
    };
    let payload = existing.payload.clone();
    let created_turn = existing.created_turn;
    store.update_daemon_state(
        id,
        crate::store::DaemonState {
            execution_count,
            last_execution_turn: turn as i64,
            payload,
            created_turn,
        },
    );
    StateChange {
        target: EntityId::Daemon(id.clone()),
        attribute: AttributeKey::UpdateDaemonState(id.clone()),
        old_value: None,
        new_value: StateValue::Int(execution_count),
        turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{FlagId, ItemId, LocationId};
    use crate::resolver::ComputeRegistry;
    use crate::store::{ItemStatic, LocationStatic};
    use crate::value::ParentEntity;
    use std::collections::{BTreeMap as Map, BTreeSet};

    fn sample_store() -> WorldStore {
        let mut items = Map::new();
        items.insert(
            ItemId::new("lamp"),
            ItemStatic {
                id: "lamp".into(),
                name: "brass lamp".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("room".into()),
                flags: BTreeSet::from([FlagId::new("takable")]),
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

    fn always_reject(
        _store: &WorldStore,
        _entity: &EntityId,
        _attribute: &AttributeKey,
        _old: Option<&StateValue>,
        _new: &StateValue,
    ) -> Result<(), ActionResponse> {
        Err(ActionResponse::PrerequisiteNotMet("no".into()))
    }

    #[test]
    fn apply_records_the_observed_old_value() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        let record = engine
            .apply(
                &mut store,
                &compute,
                EntityId::Item("lamp".into()),
                AttributeKey::ItemParent,
                StateValue::Parent(ParentEntity::Player),
                1,
            )
            .expect("not rejected");
        assert_eq!(record.old_value, Some(StateValue::Parent(ParentEntity::Location("room".into()))));
        assert_eq!(store.effective_parent(&"lamp".into()), ParentEntity::Player);
    }

    #[test]
    fn rejected_validator_leaves_the_store_untouched() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let mut validators = ValidatorRegistry::new();
        validators.register(EntityId::Item("lamp".into()), AttributeKey::ItemParent, always_reject);
        let engine = StateChangeEngine::new(validators);
        let result = engine.apply(
            &mut store,
            &compute,
            EntityId::Item("lamp".into()),
            AttributeKey::ItemParent,
            StateValue::Parent(ParentEntity::Player),
            1,
        );
        assert!(result.is_err());
        assert_eq!(store.effective_parent(&"lamp".into()), ParentEntity::Location("room".into()));
    }

    #[test]
    fn start_fuse_with_zero_turns_is_rejected() {
        let mut store = sample_store();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        let result = engine.translate(
            &mut store,
            SideEffect::StartFuse { id: FuseId::new("candle"), turns: Some(0), payload: None },
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn start_fuse_registers_it_in_insertion_order() {
        let mut store = sample_store();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        engine
            .translate(&mut store, SideEffect::StartFuse { id: FuseId::new("candle"), turns: Some(3), payload: None }, 1)
            .expect("valid");
        assert_eq!(store.get_fuse(&FuseId::new("candle")).map(|f| f.turns), Some(3));
        assert_eq!(store.fuse_ids_in_order().collect::<Vec<_>>(), vec![&FuseId::new("candle")]);
    }
}
