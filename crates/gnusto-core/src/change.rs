//! `StateChange`, `AttributeKey`, and `SideEffect` — the vocabulary of mutation.
//!
//! Every mutation anywhere in the engine is expressed as a `StateChange` and
//! applied exclusively by [`crate::engine::StateChangeEngine`].
use serde::{Deserialize, Serialize};

use crate::ident::{AttributeId, Direction, FlagId, FuseId, GlobalId, ItemId, LocationId, Pronoun};
use crate::value::StateValue;

/// Enumerates every mutable property the engine knows how to change.
///
/// This is also the overlay's storage key: [`crate::store::WorldStore::get_overlay`]
/// and `set_overlay` are keyed by `(EntityId, AttributeKey)`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AttributeKey {
    /// An item's containing parent.
    ItemParent,
    /// An item's display name.
    ItemName,
    /// An item's adjective set.
    ItemAdjectives,
    /// An item's synonym set.
    ItemSynonyms,
    /// An item's size.
    ItemSize,
    /// A container item's capacity.
    ItemCapacity,
    /// An item's description.
    ItemDescription,
    /// A location's description.
    LocationDescription,
    /// A location's exit table.
    LocationExits,
    /// A location's display name.
    LocationName,
    /// An opaque, game-specific item attribute.
    ItemAttribute(AttributeId),
    /// An opaque, game-specific location attribute.
    LocationAttribute(AttributeId),
    /// The player's score.
    PlayerScore,
    /// The player's move counter.
    PlayerMoves,
    /// The player's current location.
    PlayerLocation,
    /// The player's inventory capacity.
    PlayerInventoryLimit,
    /// The player's health.
    PlayerHealth,
    /// Sets a flag on the target entity.
    SetFlag(FlagId),
    /// Clears a flag on the target entity.
    ClearFlag(FlagId),
    /// Sets an entry in the global bag.
    GlobalSet(GlobalId),
    /// Binds a pronoun to a referent set.
    PronounBind(Pronoun),
    /// Registers a fuse as active with its initial countdown.
    AddActiveFuse {
        /// The fuse being scheduled.
        id: FuseId,
        /// The turn count it starts at (must be ≥ 1).
        initial_turns: i64,
    },
    /// Updates the remaining turn count of an active fuse.
    UpdateFuseTurns(FuseId),
    /// Removes an active fuse (fired or cancelled).
    RemoveActiveFuse(FuseId),
    /// Registers a daemon as active.
    AddActiveDaemon(crate::ident::DaemonId),
    /// Replaces a daemon's mutable execution state.
    UpdateDaemonState(crate::ident::DaemonId),
    /// Removes an active daemon.
    RemoveActiveDaemon(crate::ident::DaemonId),
}

/// A single, self-describing mutation: target, attribute, observed old value,
/// and the value it was changed to. Timestamped by turn index.
///
/// Invariant: every applied record's `old_value` equals what the entity
/// actually held immediately before the change.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StateChange {
    /// The entity being mutated.
    pub target: crate::value::EntityId,
    /// Which property of the entity is being mutated.
    pub attribute: AttributeKey,
    /// The value observed immediately before this change, if any existed.
    pub old_value: Option<StateValue>,
    /// The value this change sets.
    pub new_value: StateValue,
    /// The turn index this change was applied during.
    pub turn: u64,
}

/// A higher-level intent emitted by a handler alongside direct `StateChange`s.
/// The pipeline translates each into concrete changes against the fuse/daemon
/// maps via [`crate::engine::StateChangeEngine::translate`].
#[derive(Clone, Debug)]
pub enum SideEffect {
    /// Start a fuse, optionally overriding its default turn count and payload.
    StartFuse {
        /// The fuse to start.
        id: FuseId,
        /// Turn count override; `None` uses the fuse's registered default.
        turns: Option<i64>,
        /// Typed payload to attach, if any.
        payload: Option<crate::value::TypedPayload>,
    },
    /// Cancel a previously started fuse.
    StopFuse(FuseId),
    /// Force a daemon to become active immediately.
    RunDaemon(crate::ident::DaemonId),
    /// Deactivate a running daemon.
    StopDaemon(crate::ident::DaemonId),
    /// Schedule a named event for later processing by a fuse or daemon function.
    ScheduleEvent {
        /// Free-form event name consumed by handler/fuse logic.
        name: String,
        /// Turns until the event should be considered, if time-gated.
        in_turns: Option<i64>,
    },
}

/// Builds a location's direction→exit map with a stable key ordering.
pub fn exits_map<I>(entries: I) -> std::collections::BTreeMap<Direction, crate::value::Exit>
where
    I: IntoIterator<Item = (Direction, crate::value::Exit)>,
{
    entries.into_iter().collect()
}
