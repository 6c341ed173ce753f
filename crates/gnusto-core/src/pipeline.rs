//! The turn pipeline: turns one line of player input into one block of
//! printed output, threading commands through parsing, dispatch, hooks, the
//! state-change engine, and the time system.
use std::collections::BTreeSet;

use crate::blueprint::Blueprint;
use crate::change::{AttributeKey, StateChange};
use crate::dispatch::{check_light, ActionContext, ActionRegistry, ActionResult};
use crate::error::{ActionResponse, EngineError, ParseError};
use crate::hooks::HookRegistry;
use crate::ident::{Direction, ItemId, LocationId};
use crate::io::{InputLine, IoBoundary};
use crate::messenger::{with_article, MessageArg, Messenger};
use crate::ident::MessageId;
use crate::parser::{Command, NeedsDisambiguation, ParseOutcome, Parser};
use crate::resolver::{ComputeRegistry, Resolver};
use crate::rng::Rng;
use crate::snapshot::Snapshot;
use crate::store::WorldStore;
use crate::time::TimeSystem;
use crate::value::{EntityId, Exit, ParentEntity, StateValue};
use crate::vocabulary::Vocabulary;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The player typed `quit`.
    Quit,
    /// Input was exhausted without a quit.
    Eof,
    /// The player's health reached zero or below.
    Death,
    /// The player's score reached the maximum attainable score.
    Victory,
}

/// What happened during one [`Engine::run_turn`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurnOutcome {
    /// Set when the session should stop after this turn.
    pub ended: Option<EndReason>,
}

/// The assembled, runnable engine. Built via [`Blueprint::build`];
/// registration tables are frozen from this point on.
pub struct Engine {
    store: WorldStore,
    vocabulary: Vocabulary,
    universals: Vec<crate::value::Universal>,
    handlers: ActionRegistry,
    hooks: HookRegistry,
    compute: ComputeRegistry,
    engine: crate::engine::StateChangeEngine,
    time: TimeSystem,
    messenger: Box<dyn Messenger>,
    rng: Rng,
    log_target: String,
    title: String,
    release: String,
    introduction: String,
    max_score: i64,
    turn: u64,
    last_location: Option<LocationId>,
    visited: BTreeSet<LocationId>,
    last_snapshot: Option<Snapshot>,
    introduced: bool,
    /// Set when the previous sub-command's noun phrase was ambiguous; the
    /// next sub-command is fed to [`Parser::resolve_disambiguation`] against
    /// this frame instead of being parsed as a fresh command.
    pending_disambiguation: Option<NeedsDisambiguation>,
}

impl Engine {
    /// Assembles a runnable engine from a blueprint's registration tables.
    pub(crate) fn from_blueprint(blueprint: Blueprint) -> Self {
        let parts = blueprint.into_parts();
        Self {
            store: parts.store,
            vocabulary: parts.vocabulary,
            universals: parts.universals,
            handlers: parts.handlers,
            hooks: parts.hooks,
            compute: parts.compute,
            engine: parts.engine,
            time: TimeSystem::new(parts.time),
            messenger: parts.messenger,
            rng: Rng::from_seed_u64(parts.rng_seed),
            log_target: parts.log_target,
            title: parts.title,
            release: parts.release,
            introduction: parts.introduction,
            max_score: parts.max_score,
            turn: 1,
            last_location: None,
            visited: BTreeSet::new(),
            last_snapshot: None,
            introduced: false,
            pending_disambiguation: None,
        }
    }

    /// Game title, for the host's startup banner.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Release/serial string, for the host's startup banner.
    pub fn release(&self) -> &str {
        &self.release
    }

    /// The `tracing` target this engine's spans/events are emitted under.
    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    /// The current turn index.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Mutable access to the engine's deterministic RNG, for game-specific
    /// compute handlers, fuses, and daemons that need randomness.
    pub fn rng(&mut self) -> &mut Rng {
        &mut self.rng
    }

    /// Captures the engine's current mutable state as a portable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store, self.turn)
    }

    /// Overwrites the engine's mutable state from a previously captured
    /// snapshot, leaving static item/location definitions untouched.
    ///
    /// # Errors
    /// Returns [`EngineError::SnapshotMismatch`] if `snapshot` was not
    /// produced by a version of the engine this build understands.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        snapshot.restore(&mut self.store)
    }

    /// Runs one turn: prints a location header if warranted, reads one line
    /// of input, executes every "and"-joined sub-command in order, and
    /// prints exactly one buffered block of output.
    #[tracing::instrument(skip(self, io))]
    pub fn run_turn(&mut self, io: &mut dyn IoBoundary) -> TurnOutcome {
        let mut buffer = String::new();
        if !self.introduced {
            buffer.push_str(&self.introduction);
            buffer.push('\n');
            self.introduced = true;
        }
        self.write_location_header(&mut buffer);

        let mut outcome = TurnOutcome::default();
        match io.read_line() {
            InputLine::Eof => {
                outcome.ended = Some(EndReason::Eof);
            }
            InputLine::Line(line) => {
                for raw in crate::parser::split_into_subcommands(&line) {
                    self.run_subcommand(&raw, &mut buffer, &mut outcome);
                    if outcome.ended.is_some() {
                        break;
                    }
                }
            }
        }
        io.print(&buffer);
        outcome
    }

    fn write_location_header(&mut self, buffer: &mut String) {
        let current = self.store.player().location.clone();
        let changed = self.last_location.as_ref() != Some(&current);
        if changed {
            let resolver = Resolver::new(&self.store, &self.compute);
            let first_visit = !self.visited.contains(&current);
            let text = if first_visit {
                describe_location_full(&self.store, &resolver, &current, self.messenger.as_ref())
            } else {
                describe_location_brief(&self.store, &resolver, &current, self.messenger.as_ref())
            };
            buffer.push_str(&text);
            buffer.push('\n');
        }
        self.visited.insert(current.clone());
        self.last_location = Some(current);
    }

    fn run_subcommand(&mut self, raw: &str, buffer: &mut String, outcome: &mut TurnOutcome) {
        if let Some(pending) = self.pending_disambiguation.take() {
            self.run_disambiguation_reply(&pending, raw, buffer);
            self.advance_time(buffer);
            self.turn += 1;
            self.check_end_conditions(outcome);
            return;
        }

        let parsed = {
            let resolver = Resolver::new(&self.store, &self.compute);
            let parser = Parser::new(&self.vocabulary, &self.store, &resolver, &self.universals);
            parser.parse(raw)
        };

        match parsed {
            Ok(ParseOutcome::Command(command)) => {
                if let Some(direction) = command.direction {
                    self.run_movement(direction, buffer);
                } else {
                    self.run_action(&command, buffer);
                }
            }
            Ok(ParseOutcome::NeedsDisambiguation(pending)) => {
                buffer.push_str(&self.render_disambiguation_prompt(&pending.candidates));
                buffer.push('\n');
                self.pending_disambiguation = Some(pending);
            }
            Err(err) => {
                buffer.push_str(&self.render_parse_error(&err));
                buffer.push('\n');
            }
        }

        self.advance_time(buffer);
        self.turn += 1;
        self.check_end_conditions(outcome);
    }

    /// Resolves a reply to an open disambiguation against `pending`'s
    /// candidates, without re-parsing the rest of the original command.
    fn run_disambiguation_reply(&mut self, pending: &NeedsDisambiguation, raw: &str, buffer: &mut String) {
        let resolved = {
            let resolver = Resolver::new(&self.store, &self.compute);
            let parser = Parser::new(&self.vocabulary, &self.store, &resolver, &self.universals);
            parser.resolve_disambiguation(pending, raw)
        };
        match resolved {
            Ok(command) => {
                if let Some(direction) = command.direction {
                    self.run_movement(direction, buffer);
                } else {
                    self.run_action(&command, buffer);
                }
            }
            Err(ParseError::BeMoreSpecific(candidates)) => {
                buffer.push_str(&self.render_disambiguation_prompt(&candidates));
                buffer.push('\n');
                self.pending_disambiguation =
                    Some(NeedsDisambiguation { command: pending.command.clone(), slot: pending.slot, candidates });
            }
            Err(err) => {
                buffer.push_str(&self.render_parse_error(&err));
                buffer.push('\n');
            }
        }
    }

    /// Lists disambiguation candidates by qualified name (adjectives plus
    /// their shared noun, e.g. "brass key" vs. "rusty key").
    fn render_disambiguation_prompt(&self, candidates: &[ItemId]) -> String {
        let names: Vec<String> = candidates.iter().map(|id| self.qualified_item_label(id)).collect();
        self.messenger.render(&MessageId::be_more_specific(), &[MessageArg::Text(names.join(", "))])
    }

    fn qualified_item_label(&self, id: &ItemId) -> String {
        let Ok(item) = self.store.get_item_static(id) else {
            return id.as_str().to_string();
        };
        let mut words: Vec<&str> = item.adjectives.iter().map(String::as_str).collect();
        words.push(&item.name);
        words.join(" ")
    }

    fn run_action(&mut self, command: &Command, buffer: &mut String) {
        let location = self.store.player().location.clone();

        let (default_outcome, after_outcomes) = {
            let resolver = Resolver::new(&self.store, &self.compute);
            let scope = Parser::new(&self.vocabulary, &self.store, &resolver, &self.universals).scope();
            let ctx = ActionContext {
                store: &self.store,
                resolver: &resolver,
                command,
                turn: self.turn,
                messenger: self.messenger.as_ref(),
            };

            let default_outcome = if let Some(result) = self.hooks.run_before(&location, &scope, &ctx) {
                result
            } else {
                match self.handlers.dispatch(command) {
                    Some(handler) => {
                        let produced = check_light(handler, &resolver, &location)
                            .and_then(|()| handler.validate(&ctx))
                            .and_then(|()| handler.process(&ctx));
                        match produced {
                            Ok(result) => handler.post_process(&ctx, result),
                            Err(response) => self.yielded_text(&self.render_action_response(&response)),
                        }
                    }
                    None => {
                        let text = self.messenger.render(&MessageId::dont_understand(), &[]);
                        self.yielded_text(&text)
                    }
                }
            };
            let after_outcomes = self.hooks.run_after(&location, &scope, &ctx, &default_outcome);
            (default_outcome, after_outcomes)
        };

        self.apply_action_result(&default_outcome, buffer);
        for result in &after_outcomes {
            self.apply_action_result(result, buffer);
        }
    }

    fn yielded_text(&self, text: &str) -> ActionResult {
        ActionResult::handled(Some(text.to_string()), Vec::new(), Vec::new()).unwrap_or(ActionResult::Yield)
    }

    fn apply_action_result(&mut self, result: &ActionResult, buffer: &mut String) {
        let ActionResult::Handled { message, changes, side_effects } = result else { return };
        if let Some(text) = message {
            buffer.push_str(text);
            buffer.push('\n');
        }
        for change in changes {
            let applied = self.engine.apply(
                &mut self.store,
                &self.compute,
                change.target.clone(),
                change.attribute.clone(),
                change.new_value.clone(),
                self.turn,
            );
            if let Err(err) = applied {
                buffer.push_str(&self.render_action_response(&err));
                buffer.push('\n');
                return;
            }
        }
        for effect in side_effects.iter().cloned() {
            if let Err(err) = self.engine.translate(&mut self.store, effect, self.turn) {
                tracing::warn!(%err, "side effect translation failed");
            }
        }
    }

    fn run_movement(&mut self, direction: Direction, buffer: &mut String) {
        let location = self.store.player().location.clone();
        let exit = {
            let resolver = Resolver::new(&self.store, &self.compute);
            resolver.exits(&location).and_then(|exits| exits.get(&direction).cloned())
        };
        match exit {
            Some(Exit::To(destination)) => self.move_player_to(destination),
            Some(Exit::Blocked(message)) => {
                buffer.push_str(&message);
                buffer.push('\n');
            }
            Some(Exit::Conditional { to, required_flag, barred_message }) => {
                let has_flag = {
                    let resolver = Resolver::new(&self.store, &self.compute);
                    resolver.location_flags(&location).contains(&required_flag)
                };
                if has_flag {
                    self.move_player_to(to);
                } else {
                    buffer.push_str(&barred_message);
                    buffer.push('\n');
                }
            }
            None => {
                let text = self.messenger.render(&MessageId::blocked_direction(), &[]);
                buffer.push_str(&text);
                buffer.push('\n');
            }
        }
    }

    /// Moves the player with no success message: the new location's
    /// description is printed by the *next* turn's header step, matching how
    /// this engine reports location changes.
    fn move_player_to(&mut self, destination: LocationId) {
        let change = StateChange {
            target: EntityId::Player,
            attribute: AttributeKey::PlayerLocation,
            old_value: Some(StateValue::LocationRef(self.store.player().location.clone())),
            new_value: StateValue::LocationRef(destination),
            turn: self.turn,
        };
        let applied = self.engine.apply(
            &mut self.store,
            &self.compute,
            change.target,
            change.attribute,
            change.new_value,
            self.turn,
        );
        if let Err(err) = applied {
            tracing::warn!(%err, "movement rejected by validator");
        }
    }

    fn advance_time(&mut self, buffer: &mut String) {
        let report = self.time.tick(&self.engine, &mut self.store, &self.compute, self.turn);
        for message in report.messages {
            buffer.push_str(&message);
            buffer.push('\n');
        }
    }

    fn check_end_conditions(&mut self, outcome: &mut TurnOutcome) {
        if self.global_flag(&crate::builtins::quit_requested_flag()) {
            outcome.ended = Some(EndReason::Quit);
            return;
        }
        if let Some(health) = self.store.player().health {
            if health <= 0 {
                outcome.ended = Some(EndReason::Death);
                return;
            }
        }
        if self.max_score > 0 && self.store.player().score >= self.max_score {
            outcome.ended = Some(EndReason::Victory);
            return;
        }
        if self.global_flag(&crate::builtins::save_requested_flag()) {
            self.last_snapshot = Some(Snapshot::capture(&self.store, self.turn));
            self.store.set_global(crate::builtins::save_requested_flag(), StateValue::Bool(false));
        }
        if self.global_flag(&crate::builtins::restore_requested_flag()) {
            if let Some(snapshot) = self.last_snapshot.clone() {
                if let Err(err) = snapshot.restore(&mut self.store) {
                    tracing::warn!(%err, "restore failed");
                }
            }
            self.store.set_global(crate::builtins::restore_requested_flag(), StateValue::Bool(false));
        }
    }

    fn global_flag(&self, id: &crate::ident::GlobalId) -> bool {
        self.store.get_global(id).and_then(StateValue::as_bool).unwrap_or(false)
    }

    fn item_label(&self, id: &ItemId) -> String {
        self.store.get_item_static(id).map_or_else(|_| id.as_str().to_string(), |item| item.name.clone())
    }

    fn render_parse_error(&self, error: &ParseError) -> String {
        match error {
            ParseError::UnknownWord(_) => self.messenger.render(&MessageId::dont_understand(), &[]),
            ParseError::DontSeeThat(phrase) => {
                self.messenger.render(&MessageId::dont_see_that(), &[MessageArg::Text(phrase.clone())])
            }
            ParseError::BeMoreSpecific(candidates) => self.render_disambiguation_prompt(candidates),
            ParseError::NothingToReferTo => self.messenger.render(&MessageId::nothing_to_refer_to(), &[]),
            ParseError::Garbled(_) => self.messenger.render(&MessageId::garbled(), &[]),
            ParseError::InternalError(detail) => {
                tracing::warn!(%detail, "internal parser error");
                self.messenger.render(&MessageId::internal_apology(), &[])
            }
        }
    }

    fn render_action_response(&self, error: &ActionResponse) -> String {
        match error {
            ActionResponse::ContainerClosed => self.messenger.render(&MessageId::container_closed(), &[]),
            ActionResponse::ContainerFull => self.messenger.render(&MessageId::container_full(), &[]),
            ActionResponse::DirectionBlocked(_, custom) => custom
                .clone()
                .unwrap_or_else(|| self.messenger.render(&MessageId::blocked_direction(), &[])),
            ActionResponse::ItemNotAccessible(id) => {
                self.messenger.render(&MessageId::dont_see_that(), &[MessageArg::Text(self.item_label(id))])
            }
            ActionResponse::ItemNotTakable(id) => {
                self.messenger.render(&MessageId::cannot_take_fixed(), &[MessageArg::Text(self.item_label(id))])
            }
            ActionResponse::ItemNotOpenable(_) => self.messenger.render(&MessageId::prerequisite_not_met(), &[]),
            ActionResponse::AlreadyOpen(_) => self.messenger.render(&MessageId::already_open(), &[]),
            ActionResponse::AlreadyClosed(_) => self.messenger.render(&MessageId::already_closed(), &[]),
            ActionResponse::Locked(id) => {
                self.messenger.render(&MessageId::locked(), &[MessageArg::Text(self.item_label(id))])
            }
            ActionResponse::WrongKey => self.messenger.render(&MessageId::wrong_key(), &[]),
            ActionResponse::NotWearable(_) => self.messenger.render(&MessageId::not_wearable(), &[]),
            ActionResponse::NotHeld(_) => self.messenger.render(&MessageId::not_held(), &[]),
            ActionResponse::PlayerCannotCarryMore => {
                self.messenger.render(&MessageId::player_cannot_carry_more(), &[])
            }
            ActionResponse::RoomIsDark => self.messenger.render(&MessageId::room_is_dark(), &[]),
            ActionResponse::PrerequisiteNotMet(message) => message.clone(),
            ActionResponse::InternalEngineError(detail) => {
                tracing::warn!(%detail, "internal engine error");
                self.messenger.render(&MessageId::internal_apology(), &[])
            }
        }
    }
}

/// Full room description: name, description, and visible contents.
pub(crate) fn describe_location_full(
    store: &WorldStore,
    resolver: &Resolver<'_>,
    location: &LocationId,
    messenger: &dyn Messenger,
) -> String {
    if !resolver.is_lit(location) {
        return messenger.render(&MessageId::room_is_dark(), &[]);
    }
    let Ok(static_location) = store.get_location_static(location) else {
        return messenger.render(&MessageId::room_is_dark(), &[]);
    };
    let mut lines = vec![static_location.name.clone()];
    let description = resolver
        .resolve(&EntityId::Location(location.clone()), &AttributeKey::LocationDescription)
        .and_then(|value| value.as_str().map(str::to_string));
    if let Some(text) = description {
        lines.push(text);
    }
    let visible_items = resolver
        .contents(&ParentEntity::Location(location.clone()))
        .iter()
        .filter(|id| resolver.is_visible(id))
        .filter_map(|id| store.get_item_static(id).ok())
        .map(|item| format!("There is {} here.", with_article(&item.name)));
    lines.extend(visible_items);
    lines.join("\n")
}

/// Brief room description: name only, for a revisited and unchanged location.
pub(crate) fn describe_location_brief(
    store: &WorldStore,
    resolver: &Resolver<'_>,
    location: &LocationId,
    messenger: &dyn Messenger,
) -> String {
    if !resolver.is_lit(location) {
        return messenger.render(&MessageId::room_is_dark(), &[]);
    }
    store
        .get_location_static(location)
        .map_or_else(|_| location.as_str().to_string(), |loc| loc.name.clone())
}
