//! The engine's three error families: two player-facing recoverable
//! families reported via the messenger, and one internal family for
//! programmer mistakes (bad blueprints, unknown ids at registration time).
use thiserror::Error;

use crate::ident::{Direction, ItemId};

/// A recoverable failure produced while parsing one sub-command.
///
/// Caught by the turn pipeline; never crashes the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A token matched no vocabulary entry.
    #[error("unknown word: {0}")]
    UnknownWord(String),
    /// A noun phrase matched vocabulary but no in-scope entity.
    #[error("don't see that here: {0}")]
    DontSeeThat(String),
    /// A noun phrase matched more than one in-scope entity.
    #[error("ambiguous phrase, {} candidates", .0.len())]
    BeMoreSpecific(Vec<ItemId>),
    /// A pronoun was used with no prior referent bound.
    #[error("nothing to refer to for pronoun")]
    NothingToReferTo,
    /// The token sequence did not match any known grammar shape.
    #[error("garbled input: {0}")]
    Garbled(String),
    /// A parser bug, as opposed to a player mistake.
    #[error("internal parser error: {0}")]
    InternalError(String),
}

/// A recoverable failure produced while validating or processing a command
/// against the world model. Each variant maps to a messenger call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionResponse {
    /// The target container is closed.
    #[error("container is closed")]
    ContainerClosed,
    /// The target container has no room left.
    #[error("container is full")]
    ContainerFull,
    /// Movement in the given direction is not currently possible.
    #[error("direction blocked: {0:?}")]
    DirectionBlocked(Direction, Option<String>),
    /// The item cannot currently be reached (out of scope / not visible).
    #[error("item not accessible: {0}")]
    ItemNotAccessible(ItemId),
    /// The item lacks the `takable` flag.
    #[error("item not takable: {0}")]
    ItemNotTakable(ItemId),
    /// The item lacks the `openable` flag.
    #[error("item not openable: {0}")]
    ItemNotOpenable(ItemId),
    /// The item already has the `open` flag set.
    #[error("already open: {0}")]
    AlreadyOpen(ItemId),
    /// The item already lacks the `open` flag (and is not open).
    #[error("already closed: {0}")]
    AlreadyClosed(ItemId),
    /// The item has the `locked` flag set.
    #[error("locked: {0}")]
    Locked(ItemId),
    /// A key was supplied but does not match the lock.
    #[error("wrong key")]
    WrongKey,
    /// The item lacks the `wearable` flag.
    #[error("not wearable: {0}")]
    NotWearable(ItemId),
    /// The item is not currently held by the player.
    #[error("not held: {0}")]
    NotHeld(ItemId),
    /// The player's inventory capacity would be exceeded.
    #[error("player cannot carry more")]
    PlayerCannotCarryMore,
    /// The current location is not lit and the action requires light.
    #[error("room is dark")]
    RoomIsDark,
    /// A handler-declared precondition was not satisfied.
    #[error("prerequisite not met: {0}")]
    PrerequisiteNotMet(String),
    /// A handler or validator failed unexpectedly.
    #[error("internal engine error: {0}")]
    InternalEngineError(String),
}

/// A programmer-facing error: malformed blueprints, unknown ids passed to
/// registration APIs, or queries for entities that were never declared.
/// Never shown to the player; distinct from [`ParseError`]/[`ActionResponse`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No static definition exists for the given entity.
    #[error("not found: {0}")]
    NotFound(String),
    /// A registration call referenced an id that was already registered.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),
    /// A snapshot could not be restored because its shape did not match.
    #[error("snapshot shape mismatch: {0}")]
    SnapshotMismatch(String),
    /// A side effect could not be translated (e.g. a fuse scheduled with `turns = 0`).
    #[error("invalid side effect: {0}")]
    InvalidSideEffect(String),
}
