//! Built-in commands every game gets for free: wait, look, inventory, score,
//! quit, save, restore. Registered automatically by
//! [`crate::blueprint::Blueprint::new`] as ordinary [`ActionHandler`]s, scored
//! and dispatched through [`crate::dispatch::ActionRegistry`] like any
//! game-declared verb. Movement is the one command the pipeline handles
//! specially, since a bare direction carries no verb to score against.
use crate::change::{AttributeKey, StateChange};
use crate::dispatch::{ActionContext, ActionHandler, ActionRegistry, ActionResult, SyntaxRule};
use crate::error::ActionResponse;
use crate::ident::{GlobalId, MessageId, VerbId};
use crate::messenger::{MessageArg, Messenger};
use crate::value::{EntityId, ParentEntity, StateValue};
use crate::vocabulary::VerbEntry;

/// Global-bag key set by [`QuitHandler`]; the pipeline checks and clears it
/// after every sub-command.
pub fn quit_requested_flag() -> GlobalId {
    GlobalId::new("quit-requested")
}

/// Global-bag key set by [`SaveHandler`].
pub fn save_requested_flag() -> GlobalId {
    GlobalId::new("save-requested")
}

/// Global-bag key set by [`RestoreHandler`].
pub fn restore_requested_flag() -> GlobalId {
    GlobalId::new("restore-requested")
}

fn rule(canonical_verb: &str) -> SyntaxRule {
    SyntaxRule { literal_verbs: vec![canonical_verb.to_string()], ..Default::default() }
}

fn bump_moves(ctx: &ActionContext<'_>) -> StateChange {
    StateChange {
        target: EntityId::Player,
        attribute: AttributeKey::PlayerMoves,
        old_value: Some(StateValue::Int(ctx.store.player().moves)),
        new_value: StateValue::Int(ctx.store.player().moves + 1),
        turn: ctx.turn,
    }
}

/// "wait"/"z": lets a turn pass with no other changes. The only built-in that
/// counts as a move, since the point of waiting is to let fuses/daemons tick.
struct WaitHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for WaitHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let message = ctx.messenger.render(&MessageId::time_passes(), &[]);
        ActionResult::handled(Some(message), vec![bump_moves(ctx)], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "look"/"l": redescribes the current location. Produces no changes, so it
/// never counts as a move.
struct LookHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for LookHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let location = ctx.store.player().location.clone();
        let description = crate::pipeline::describe_location_full(ctx.store, ctx.resolver, &location, ctx.messenger);
        ActionResult::handled(Some(description), Vec::new(), Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "inventory"/"i": lists what the player is carrying.
struct InventoryHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for InventoryHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let carried = ctx.resolver.contents(&ParentEntity::Player);
        let message = if carried.is_empty() {
            ctx.messenger.render(&MessageId::inventory_empty(), &[])
        } else {
            let mut lines = vec![ctx.messenger.render(&MessageId::inventory_header(), &[])];
            for id in carried {
                let name = ctx
                    .store
                    .get_item_static(id)
                    .map(|item| item.name.clone())
                    .unwrap_or_else(|_| id.as_str().to_string());
                lines.push(format!("  {name}"));
            }
            lines.join("\n")
        };
        ActionResult::handled(Some(message), Vec::new(), Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "score": reports the player's current score and move count.
struct ScoreHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for ScoreHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let player = ctx.store.player();
        let message = ctx.messenger.render(
            &MessageId::score_report(),
            &[MessageArg::Count(player.score), MessageArg::Count(player.moves)],
        );
        ActionResult::handled(Some(message), Vec::new(), Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "quit"/"q": requests the pipeline end the session. The actual end-of-turn
/// check lives in the pipeline, which clears this flag after reading it.
struct QuitHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for QuitHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let message = ctx.messenger.render(&MessageId::farewell(), &[]);
        let change = StateChange {
            target: EntityId::Global(quit_requested_flag()),
            attribute: AttributeKey::GlobalSet(quit_requested_flag()),
            old_value: ctx.store.get_global(&quit_requested_flag()).cloned(),
            new_value: StateValue::Bool(true),
            turn: ctx.turn,
        };
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "save": requests the pipeline take a snapshot after this sub-command.
struct SaveHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for SaveHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let message = ctx.messenger.render(&MessageId::game_saved(), &[]);
        let change = StateChange {
            target: EntityId::Global(save_requested_flag()),
            attribute: AttributeKey::GlobalSet(save_requested_flag()),
            old_value: ctx.store.get_global(&save_requested_flag()).cloned(),
            new_value: StateValue::Bool(true),
            turn: ctx.turn,
        };
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "restore": requests the pipeline load the most recent snapshot.
struct RestoreHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for RestoreHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let message = ctx.messenger.render(&MessageId::game_restored(), &[]);
        let change = StateChange {
            target: EntityId::Global(restore_requested_flag()),
            attribute: AttributeKey::GlobalSet(restore_requested_flag()),
            old_value: ctx.store.get_global(&restore_requested_flag()).cloned(),
            new_value: StateValue::Bool(true),
            turn: ctx.turn,
        };
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

fn add_builtin(
    handlers: &mut ActionRegistry,
    verbs: &mut Vec<VerbEntry>,
    canonical: &str,
    synonyms: &[&str],
    handler: Box<dyn ActionHandler>,
) {
    let mut words = vec![canonical.to_string()];
    words.extend(synonyms.iter().map(|s| s.to_string()));
    verbs.push(VerbEntry { id: VerbId::new(canonical), words });
    handlers.register(handler);
}

/// Registers every built-in command's verb and handler.
pub(crate) fn register_all(handlers: &mut ActionRegistry, verbs: &mut Vec<VerbEntry>) {
    add_builtin(handlers, verbs, "wait", &["z"], Box::new(WaitHandler { rules: vec![rule("wait")] }));
    add_builtin(handlers, verbs, "look", &["l"], Box::new(LookHandler { rules: vec![rule("look")] }));
    add_builtin(
        handlers,
        verbs,
        "inventory",
        &["i", "inv"],
        Box::new(InventoryHandler { rules: vec![rule("inventory")] }),
    );
    add_builtin(handlers, verbs, "score", &[], Box::new(ScoreHandler { rules: vec![rule("score")] }));
    add_builtin(handlers, verbs, "quit", &["q"], Box::new(QuitHandler { rules: vec![rule("quit")] }));
    add_builtin(handlers, verbs, "save", &[], Box::new(SaveHandler { rules: vec![rule("save")] }));
    add_builtin(handlers, verbs, "restore", &[], Box::new(RestoreHandler { rules: vec![rule("restore")] }));
}
