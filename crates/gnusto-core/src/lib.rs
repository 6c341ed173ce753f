//! Gnusto: a turn-based interactive-fiction engine core.
//!
//! A host binds static world data and game-specific handlers/hooks/compute
//! functions into a [`blueprint::Blueprint`], builds it into a
//! [`pipeline::Engine`], and drives it one [`io::IoBoundary`]-backed turn at a
//! time. Every mutation flows through [`engine::StateChangeEngine`]; every
//! property read flows through [`resolver::Resolver`]; every player-facing
//! string flows through a [`messenger::Messenger`] — the engine never
//! hard-codes game content or player-visible text.
mod blueprint;
mod builtins;
mod change;
/// A tiny fixture world used by integration tests and `gnusto-cli`'s demo mode.
pub mod demo;
mod dispatch;
mod engine;
mod error;
mod hooks;
mod ident;
mod io;
mod messenger;
mod parser;
mod pipeline;
mod resolver;
mod rng;
mod snapshot;
mod store;
mod time;
mod value;
mod vocabulary;

pub use blueprint::Blueprint;
pub use change::{AttributeKey, SideEffect, StateChange};
pub use dispatch::{ActionContext, ActionHandler, ActionResult, ActionRegistry, SyntaxRule};
pub use engine::{StateChangeEngine, ValidatorFn, ValidatorRegistry};
pub use error::{ActionResponse, EngineError, ParseError};
pub use hooks::{EventHook, HookRegistry};
pub use ident::{
    AttributeId, DaemonId, Direction, FlagId, FuseId, GlobalId, ItemId, LocationId, MessageId,
    Pronoun, UniversalId, VerbId,
};
pub use io::{InputLine, IoBoundary, ScriptedIo, TerminalIo};
pub use messenger::{default_catalog, with_article, CatalogMessenger, MessageArg, Messenger};
pub use parser::{Command, DisambiguationSlot, NeedsDisambiguation, ObjectRef, ParseOutcome, Parser};
pub use pipeline::{EndReason, Engine, TurnOutcome};
pub use resolver::{ComputeFn, ComputeRegistry, Resolver};
pub use rng::Rng;
pub use snapshot::Snapshot;
pub use store::{DaemonState, FuseState, ItemStatic, LocationStatic, PlayerState, PronounTable};
pub use time::{DaemonFn, DaemonOutcome, FuseFn, TickReport, TimeRegistry};
pub use value::{
    default_universals, EntityId, Exit, GameAttribute, ParentEntity, StateValue, TypedPayload,
    Universal, UniversalGroup,
};
pub use vocabulary::{VerbEntry, Vocabulary, WordRoles};
