//! Fuse and daemon scheduling: fuses tick down and fire once; daemons fire
//! on a fixed frequency and persist.
use std::collections::HashMap;

use crate::dispatch::ActionResult;
use crate::engine::StateChangeEngine;
use crate::error::ActionResponse;
use crate::ident::{DaemonId, FuseId};
use crate::resolver::{ComputeRegistry, Resolver};
use crate::store::{DaemonState, FuseState, WorldStore};
use crate::value::TypedPayload;

/// A fuse's function: a pure read of the current snapshot producing at most
/// one [`ActionResult`] to apply when it fires: a pure function of
/// `(engine_view, fuse_state)`.
pub type FuseFn = fn(&WorldStore, &Resolver<'_>, &FuseState) -> Result<Option<ActionResult>, ActionResponse>;

/// What a daemon invocation produced: an optional action result to apply, and
/// an optional replacement payload, if the daemon wants to update its
/// stored state.
#[derive(Clone, Debug, Default)]
pub struct DaemonOutcome {
    /// Changes and side effects to apply, if any.
    pub result: Option<ActionResult>,
    /// Replacement payload, if the daemon wants to update its stored state.
    pub payload: Option<TypedPayload>,
}

/// A daemon's function, invoked when it is due.
pub type DaemonFn = fn(&WorldStore, &Resolver<'_>, &DaemonState) -> Result<DaemonOutcome, ActionResponse>;

struct DaemonEntry {
    function: DaemonFn,
    frequency: i64,
}

/// Registrations of fuse and daemon functions, frozen after engine start.
#[derive(Default)]
pub struct TimeRegistry {
    fuse_fns: HashMap<FuseId, FuseFn>,
    daemon_fns: HashMap<DaemonId, DaemonEntry>,
}

impl TimeRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the function a fuse invokes when it fires.
    pub fn register_fuse(&mut self, id: FuseId, function: FuseFn) {
        self.fuse_fns.insert(id, function);
    }

    /// Registers a daemon's function and its firing frequency, in turns.
    pub fn register_daemon(&mut self, id: DaemonId, function: DaemonFn, frequency: i64) {
        self.daemon_fns.insert(id, DaemonEntry { function, frequency });
    }
}

/// What fired during one [`TimeSystem::tick`] call, for logging/testing.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Fuses that fired this tick, in processing order.
    pub fired_fuses: Vec<FuseId>,
    /// Daemons that fired this tick, in processing order.
    pub fired_daemons: Vec<DaemonId>,
    /// Messages from fired fuses/daemons, in firing order, for the pipeline
    /// to append to the turn's output.
    pub messages: Vec<String>,
}

/// Advances fuses and daemons by one turn.
///
/// Failure bookkeeping (`fuse_failures`/`daemon_failures`) is intentionally
/// not part of the snapshot: it resets across a restore, which only affects
/// how quickly a broken fuse/daemon gets evicted after the fact, never game
/// state visible to the player.
#[derive(Default)]
pub struct TimeSystem {
    registry: TimeRegistry,
    fuse_failures: HashMap<FuseId, u8>,
    daemon_failures: HashMap<DaemonId, u8>,
}

const MAX_CONSECUTIVE_FAILURES: u8 = 2;

impl TimeSystem {
    /// Builds a time system over the given fuse/daemon function registry.
    pub fn new(registry: TimeRegistry) -> Self {
        Self { registry, fuse_failures: HashMap::new(), daemon_failures: HashMap::new() }
    }

    /// Applies an already-produced [`ActionResult`] to the store: its
    /// changes through the engine, its side effects translated and applied.
    fn apply_result(
        &self,
        engine: &StateChangeEngine,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        result: &ActionResult,
        turn: u64,
        messages: &mut Vec<String>,
    ) {
        let ActionResult::Handled { message, changes, side_effects } = result else { return };
        if let Some(text) = message {
            messages.push(text.clone());
        }
        for change in changes {
            let outcome = engine.apply(
                store,
                compute,
                change.target.clone(),
                change.attribute.clone(),
                change.new_value.clone(),
                turn,
            );
            if let Err(err) = outcome {
                tracing::warn!(%err, "time-system change rejected");
            }
        }
        for effect in side_effects.iter().cloned() {
            if let Err(err) = engine.translate(store, effect, turn) {
                tracing::warn!(%err, "time-system side effect translation failed");
            }
        }
    }

    /// Decrements every active fuse, firing and removing any that reach 0;
    /// then fires every due daemon. Processing order is fuse insertion order,
    /// then daemon insertion order, within this one tick.
    pub fn tick(
        &mut self,
        engine: &StateChangeEngine,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        turn: u64,
    ) -> TickReport {
        let mut report = TickReport::default();
        self.tick_fuses(engine, store, compute, turn, &mut report);
        self.tick_daemons(engine, store, compute, turn, &mut report);
        report
    }

    fn tick_fuses(
        &mut self,
        engine: &StateChangeEngine,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        turn: u64,
        report: &mut TickReport,
    ) {
        let ids: Vec<FuseId> = store.fuse_ids_in_order().cloned().collect();
        for id in ids {
            let Some(state) = store.get_fuse(&id).cloned() else { continue };
            if state.created_turn == turn {
                continue;
            }
            let remaining = state.turns - 1;
            if remaining > 0 {
                store.update_fuse_turns(&id, remaining);
                continue;
            }
            let outcome = match self.registry.fuse_fns.get(&id) {
                Some(function) => {
                    let resolver = Resolver::new(store, compute);
                    function(store, &resolver, &state)
                }
                None => Ok(None),
            };
            match outcome {
                Ok(maybe_result) => {
                    self.fuse_failures.remove(&id);
                    if let Some(result) = &maybe_result {
                        self.apply_result(engine, store, compute, result, turn, &mut report.messages);
                    }
                    store.stop_fuse(&id);
                    report.fired_fuses.push(id);
                }
                Err(err) => self.record_fuse_failure(store, &id, &err),
            }
        }
    }

    fn record_fuse_failure(&mut self, store: &mut WorldStore, id: &FuseId, err: &ActionResponse) {
        tracing::warn!(fuse = %id, %err, "fuse function failed");
        let count = self.fuse_failures.entry(id.clone()).or_insert(0);
        *count += 1;
        if *count >= MAX_CONSECUTIVE_FAILURES {
            tracing::warn!(fuse = %id, "fuse removed after repeated failures");
            store.stop_fuse(id);
            self.fuse_failures.remove(id);
        }
    }

    fn tick_daemons(
        &mut self,
        engine: &StateChangeEngine,
        store: &mut WorldStore,
        compute: &ComputeRegistry,
        turn: u64,
        report: &mut TickReport,
    ) {
        let ids: Vec<DaemonId> = store.daemon_ids_in_order().cloned().collect();
        for id in ids {
            let Some(state) = store.get_daemon(&id).cloned() else { continue };
            if state.created_turn == turn {
                continue;
            }
            let Some(entry) = self.registry.daemon_fns.get(&id) else { continue };
            if entry.frequency <= 0 || turn % entry.frequency as u64 != 0 {
                continue;
            }
            let outcome = {
                let resolver = Resolver::new(store, compute);
                (entry.function)(store, &resolver, &state)
            };
            match outcome {
                Ok(outcome) => {
                    self.daemon_failures.remove(&id);
                    if let Some(result) = &outcome.result {
                        self.apply_result(engine, store, compute, result, turn, &mut report.messages);
                    }
                    let execution_count = state.execution_count + 1;
                    crate::engine::record_daemon_fired(store, &id, execution_count, turn);
                    if let Some(payload) = outcome.payload {
                        if let Some(updated) = store.get_daemon(&id).cloned() {
                            store.update_daemon_state(
                                &id,
                                DaemonState { payload: Some(payload), ..updated },
                            );
                        }
                    }
                    report.fired_daemons.push(id);
                }
                Err(err) => self.record_daemon_failure(store, &id, &err),
            }
        }
    }

    fn record_daemon_failure(&mut self, store: &mut WorldStore, id: &DaemonId, err: &ActionResponse) {
        tracing::warn!(daemon = %id, %err, "daemon function failed");
        let count = self.daemon_failures.entry(id.clone()).or_insert(0);
        *count += 1;
        if *count >= MAX_CONSECUTIVE_FAILURES {
            tracing::warn!(daemon = %id, "daemon removed after repeated failures");
            store.stop_daemon(id);
            self.daemon_failures.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ValidatorRegistry;
    use crate::ident::{FlagId, LocationId};
    use crate::store::LocationStatic;
    use std::collections::{BTreeMap as Map, BTreeSet};

    fn sample_store() -> WorldStore {
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("room"),
            LocationStatic {
                id: "room".into(),
                name: "Room".into(),
                description: None,
                exits: Map::new(),
                flags: BTreeSet::from([FlagId::new("inherently-lit")]),
            },
        );
        WorldStore::new(Map::new(), locations, "room".into())
    }

    fn noop_fuse(_store: &WorldStore, _resolver: &Resolver<'_>, _state: &FuseState) -> Result<Option<ActionResult>, ActionResponse> {
        Ok(None)
    }

    fn failing_fuse(_store: &WorldStore, _resolver: &Resolver<'_>, _state: &FuseState) -> Result<Option<ActionResult>, ActionResponse> {
        Err(ActionResponse::InternalEngineError("boom".into()))
    }

    fn noop_daemon(_store: &WorldStore, _resolver: &Resolver<'_>, _state: &DaemonState) -> Result<DaemonOutcome, ActionResponse> {
        Ok(DaemonOutcome::default())
    }

    #[test]
    fn fuse_does_not_decrement_on_its_creation_turn() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        store.start_fuse(FuseId::new("candle"), 3, None, 5);
        let mut registry = TimeRegistry::new();
        registry.register_fuse(FuseId::new("candle"), noop_fuse);
        let mut system = TimeSystem::new(registry);
        let report = system.tick(&engine, &mut store, &compute, 5);
        assert!(report.fired_fuses.is_empty());
        assert_eq!(store.get_fuse(&FuseId::new("candle")).map(|f| f.turns), Some(3));
    }

    #[test]
    fn fuse_counts_down_and_fires_on_the_kth_tick() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        store.start_fuse(FuseId::new("candle"), 3, None, 0);
        let mut registry = TimeRegistry::new();
        registry.register_fuse(FuseId::new("candle"), noop_fuse);
        let mut system = TimeSystem::new(registry);

        system.tick(&engine, &mut store, &compute, 1);
        assert_eq!(store.get_fuse(&FuseId::new("candle")).map(|f| f.turns), Some(2));
        system.tick(&engine, &mut store, &compute, 2);
        assert_eq!(store.get_fuse(&FuseId::new("candle")).map(|f| f.turns), Some(1));
        let report = system.tick(&engine, &mut store, &compute, 3);
        assert_eq!(report.fired_fuses, vec![FuseId::new("candle")]);
        assert!(store.get_fuse(&FuseId::new("candle")).is_none());
    }

    #[test]
    fn fuse_is_evicted_after_two_consecutive_failures() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        store.start_fuse(FuseId::new("candle"), 1, None, 0);
        let mut registry = TimeRegistry::new();
        registry.register_fuse(FuseId::new("candle"), failing_fuse);
        let mut system = TimeSystem::new(registry);

        system.tick(&engine, &mut store, &compute, 1);
        assert!(store.get_fuse(&FuseId::new("candle")).is_some());
        store.start_fuse(FuseId::new("candle"), 1, None, 1);
        system.tick(&engine, &mut store, &compute, 2);
        assert!(store.get_fuse(&FuseId::new("candle")).is_none());
    }

    #[test]
    fn daemon_fires_only_when_due() {
        let mut store = sample_store();
        let compute = ComputeRegistry::new();
        let engine = StateChangeEngine::new(ValidatorRegistry::new());
        store.start_daemon(DaemonId::new("tick-tock"), None, 0);
        let mut registry = TimeRegistry::new();
        registry.register_daemon(DaemonId::new("tick-tock"), noop_daemon, 3);
        let mut system = TimeSystem::new(registry);

        let report1 = system.tick(&engine, &mut store, &compute, 1);
        assert!(report1.fired_daemons.is_empty());
        let report2 = system.tick(&engine, &mut store, &compute, 3);
        assert_eq!(report2.fired_daemons, vec![DaemonId::new("tick-tock")]);
        assert_eq!(store.get_daemon(&DaemonId::new("tick-tock")).map(|d| d.execution_count), Some(1));
    }
}
