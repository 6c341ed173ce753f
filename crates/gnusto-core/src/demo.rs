//! A tiny fixture world — lit foyer, takable lamp, closed chest, fixed hook,
//! and a dark cellar below — used by the scenario/invariant integration
//! tests and as a runnable example for `gnusto-cli`. Grounded in the
//! teacher's own convention of keeping a small self-contained demo module
//! (`demo/motion.rs`) next to the library it exercises.
use std::collections::{BTreeMap, BTreeSet};

use crate::blueprint::Blueprint;
use crate::change::{AttributeKey, StateChange};
use crate::dispatch::{ActionContext, ActionHandler, ActionResult, SyntaxRule};
use crate::error::ActionResponse;
use crate::ident::{Direction, FlagId, ItemId, LocationId, MessageId, VerbId};
use crate::messenger::{CatalogMessenger, MessageArg};
use crate::parser::ObjectRef;
use crate::store::{ItemStatic, LocationStatic};
use crate::value::{EntityId, Exit, ParentEntity, StateValue};
use crate::vocabulary::VerbEntry;

fn item_label(ctx: &ActionContext<'_>, id: &ItemId) -> String {
    ctx.store.get_item_static(id).map_or_else(|_| id.as_str().to_string(), |item| item.name.clone())
}

fn bound_items(objects: &[ObjectRef]) -> impl Iterator<Item = &ItemId> {
    objects.iter().filter_map(|obj| match obj {
        ObjectRef::Item(id) => Some(id),
        ObjectRef::Universal(_) | ObjectRef::Pending(_) => None,
    })
}

fn carried_size(ctx: &ActionContext<'_>) -> i64 {
    ctx.resolver
        .contents(&ParentEntity::Player)
        .iter()
        .filter_map(|id| ctx.store.get_item_static(id).ok())
        .filter_map(|item| item.size)
        .sum()
}

/// "take"/"get": moves every bound item that's takable and fits into the
/// player's inventory; refuses each of the rest with its own message,
/// mirroring scenario 3's combined "one taken, one refused" output.
struct TakeHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for TakeHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn requires_light(&self) -> bool {
        true
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let mut lines = Vec::new();
        let mut changes = Vec::new();
        let mut held_size = carried_size(ctx);
        for id in bound_items(&ctx.command.direct_objects) {
            let flags = ctx.resolver.item_flags(id);
            if !flags.iter().any(|f| f.as_str() == "takable") {
                lines.push(ctx.messenger.render(&MessageId::cannot_take_fixed(), &[MessageArg::Text(item_label(ctx, id))]));
                continue;
            }
            let size = ctx.store.get_item_static(id).ok().and_then(|item| item.size).unwrap_or(0);
            if let Some(limit) = ctx.store.player().inventory_limit {
                if held_size + size > limit {
                    lines.push(ctx.messenger.render(&MessageId::player_cannot_carry_more(), &[]));
                    continue;
                }
            }
            held_size += size;
            changes.push(StateChange {
                target: EntityId::Item(id.clone()),
                attribute: AttributeKey::ItemParent,
                old_value: Some(StateValue::Parent(ctx.store.effective_parent(id))),
                new_value: StateValue::Parent(ParentEntity::Player),
                turn: ctx.turn,
            });
            lines.push(ctx.messenger.render(&MessageId::taken(), &[]));
        }
        ActionResult::handled(Some(lines.join("\n")), changes, Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "drop": moves every bound, currently-held item back into the current location.
struct DropHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for DropHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let location = ctx.store.player().location.clone();
        let mut lines = Vec::new();
        let mut changes = Vec::new();
        for id in bound_items(&ctx.command.direct_objects) {
            if !matches!(ctx.store.effective_parent(id), ParentEntity::Player) {
                return Err(ActionResponse::NotHeld(id.clone()));
            }
            changes.push(StateChange {
                target: EntityId::Item(id.clone()),
                attribute: AttributeKey::ItemParent,
                old_value: Some(StateValue::Parent(ParentEntity::Player)),
                new_value: StateValue::Parent(ParentEntity::Location(location.clone())),
                turn: ctx.turn,
            });
            lines.push(ctx.messenger.render(&MessageId::dropped(), &[]));
        }
        ActionResult::handled(Some(lines.join("\n")), changes, Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "open": requires the `container` flag, refuses if already open.
struct OpenHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for OpenHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext<'_>) -> Result<(), ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next() else {
            return Err(ActionResponse::InternalEngineError("open with no object".into()));
        };
        let flags = ctx.resolver.item_flags(id);
        if !flags.iter().any(|f| f.as_str() == "container") {
            return Err(ActionResponse::ItemNotOpenable(id.clone()));
        }
        if flags.iter().any(|f| f.as_str() == "open") {
            return Err(ActionResponse::AlreadyOpen(id.clone()));
        }
        Ok(())
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next().cloned() else {
            return Err(ActionResponse::InternalEngineError("open with no object".into()));
        };
        let change = StateChange {
            target: EntityId::Item(id.clone()),
            attribute: AttributeKey::SetFlag(FlagId::new("open")),
            old_value: None,
            new_value: StateValue::Bool(true),
            turn: ctx.turn,
        };
        let message = ctx.messenger.render(&MessageId::opened(), &[]);
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "close": the inverse of [`OpenHandler`].
struct CloseHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for CloseHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext<'_>) -> Result<(), ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next() else {
            return Err(ActionResponse::InternalEngineError("close with no object".into()));
        };
        let flags = ctx.resolver.item_flags(id);
        if !flags.iter().any(|f| f.as_str() == "container") {
            return Err(ActionResponse::ItemNotOpenable(id.clone()));
        }
        if !flags.iter().any(|f| f.as_str() == "open") {
            return Err(ActionResponse::AlreadyClosed(id.clone()));
        }
        Ok(())
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next().cloned() else {
            return Err(ActionResponse::InternalEngineError("close with no object".into()));
        };
        let change = StateChange {
            target: EntityId::Item(id.clone()),
            attribute: AttributeKey::ClearFlag(FlagId::new("open")),
            old_value: None,
            new_value: StateValue::Bool(false),
            turn: ctx.turn,
        };
        let message = ctx.messenger.render(&MessageId::closed(), &[]);
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "put X in Y": requires `Y` to be an open container with room for `X`.
struct PutHandler {
    rules: Vec<SyntaxRule>,
}

impl ActionHandler for PutHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext<'_>) -> Result<(), ActionResponse> {
        let Some(container) = bound_items(&ctx.command.indirect_objects).next() else {
            return Err(ActionResponse::InternalEngineError("put with no destination".into()));
        };
        let flags = ctx.resolver.item_flags(container);
        if !flags.iter().any(|f| f.as_str() == "container") {
            return Err(ActionResponse::ItemNotOpenable(container.clone()));
        }
        if !flags.iter().any(|f| f.as_str() == "open") {
            return Err(ActionResponse::ContainerClosed);
        }
        Ok(())
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let Some(container) = bound_items(&ctx.command.indirect_objects).next().cloned() else {
            return Err(ActionResponse::InternalEngineError("put with no destination".into()));
        };
        let Some(item) = bound_items(&ctx.command.direct_objects).next().cloned() else {
            return Err(ActionResponse::InternalEngineError("put with no object".into()));
        };
        let item_size = ctx.store.get_item_static(&item).ok().and_then(|i| i.size).unwrap_or(0);
        let capacity = ctx.store.get_item_static(&container).ok().and_then(|c| c.capacity);
        if let Some(capacity) = capacity {
            if ctx.resolver.current_load(&container) + item_size > capacity {
                return Err(ActionResponse::ContainerFull);
            }
        }
        let change = StateChange {
            target: EntityId::Item(item.clone()),
            attribute: AttributeKey::ItemParent,
            old_value: Some(StateValue::Parent(ctx.store.effective_parent(&item))),
            new_value: StateValue::Parent(ParentEntity::Item(container)),
            turn: ctx.turn,
        };
        let message = format!("You put {} in.", item_label(ctx, &item));
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

/// "turn on": lights a `light-source` item, the only way the demo's cellar
/// ever becomes lit. Unlike [`TakeHandler`] this does not require light
/// itself, since fumbling for a lamp in the dark is exactly the point.
struct TurnOnHandler {
    rules: Vec<SyntaxRule>,
}

fn lamp_lit_message() -> MessageId {
    MessageId::new("demo-lamp-lit")
}

impl ActionHandler for TurnOnHandler {
    fn syntax_rules(&self) -> &[SyntaxRule] {
        &self.rules
    }
    fn synonyms(&self) -> &[VerbId] {
        &[]
    }
    fn validate(&self, ctx: &ActionContext<'_>) -> Result<(), ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next() else {
            return Err(ActionResponse::InternalEngineError("turn on with no object".into()));
        };
        let flags = ctx.resolver.item_flags(id);
        if !flags.iter().any(|f| f.as_str() == "light-source") {
            return Err(ActionResponse::PrerequisiteNotMet(format!("{} doesn't light up.", item_label(ctx, id))));
        }
        Ok(())
    }
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
        let Some(id) = bound_items(&ctx.command.direct_objects).next().cloned() else {
            return Err(ActionResponse::InternalEngineError("turn on with no object".into()));
        };
        let change = StateChange {
            target: EntityId::Item(id),
            attribute: AttributeKey::SetFlag(FlagId::new("lit")),
            old_value: None,
            new_value: StateValue::Bool(true),
            turn: ctx.turn,
        };
        let message = ctx.messenger.render(&lamp_lit_message(), &[]);
        ActionResult::handled(Some(message), vec![change], Vec::new())
            .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
    }
}

fn flags(names: &[&str]) -> BTreeSet<FlagId> {
    names.iter().map(|n| FlagId::new(*n)).collect()
}

fn verb(canonical: &str, synonyms: &[&str]) -> VerbEntry {
    let mut words = vec![canonical.to_string()];
    words.extend(synonyms.iter().map(|s| s.to_string()));
    VerbEntry { id: VerbId::new(canonical), words }
}

fn rule(canonical_verb: &str, requires_direct_object: bool) -> SyntaxRule {
    SyntaxRule {
        literal_verbs: vec![canonical_verb.to_string()],
        requires_direct_object,
        ..Default::default()
    }
}

/// Builds the blueprint for the scenario/invariant test fixture: a lit foyer
/// holding a takable lamp, a fixed hook, and a closed chest,
/// with an unlit cellar below, holding a takable coin, reachable only by
/// carrying a lit lamp.
pub fn lamp_and_chest_world() -> Blueprint {
    let mut items = BTreeMap::new();
    items.insert(
        ItemId::new("lamp"),
        ItemStatic {
            id: "lamp".into(),
            name: "brass lamp".into(),
            adjectives: BTreeSet::from(["brass".to_string()]),
            synonyms: BTreeSet::new(),
            initial_parent: ParentEntity::Location("foyer".into()),
            flags: flags(&["takable", "light-source"]),
            size: Some(2),
            capacity: None,
            description: Some("A small brass lamp.".to_string()),
        },
    );
    items.insert(
        ItemId::new("hook"),
        ItemStatic {
            id: "hook".into(),
            name: "brass hook".into(),
            adjectives: BTreeSet::from(["brass".to_string()]),
            synonyms: BTreeSet::new(),
            initial_parent: ParentEntity::Location("foyer".into()),
            flags: BTreeSet::new(),
            size: None,
            capacity: None,
            description: Some("A hook, screwed firmly into the wall.".to_string()),
        },
    );
    items.insert(
        ItemId::new("chest"),
        ItemStatic {
            id: "chest".into(),
            name: "wooden chest".into(),
            adjectives: BTreeSet::from(["wooden".to_string()]),
            synonyms: BTreeSet::new(),
            initial_parent: ParentEntity::Location("foyer".into()),
            flags: flags(&["container"]),
            size: Some(20),
            capacity: Some(10),
            description: Some("A sturdy wooden chest.".to_string()),
        },
    );
    items.insert(
        ItemId::new("coin"),
        ItemStatic {
            id: "coin".into(),
            name: "gold coin".into(),
            adjectives: BTreeSet::from(["gold".to_string()]),
            synonyms: BTreeSet::new(),
            initial_parent: ParentEntity::Location("cellar".into()),
            flags: flags(&["takable"]),
            size: Some(1),
            capacity: None,
            description: Some("A single gold coin, half-buried in grit.".to_string()),
        },
    );

    let mut locations = BTreeMap::new();
    locations.insert(
        LocationId::new("foyer"),
        LocationStatic {
            id: "foyer".into(),
            name: "Foyer".into(),
            description: Some("A small entrance hall. A staircase leads down.".to_string()),
            exits: BTreeMap::from([(Direction::Down, Exit::To(LocationId::new("cellar")))]),
            flags: flags(&["inherently-lit"]),
        },
    );
    locations.insert(
        LocationId::new("cellar"),
        LocationStatic {
            id: "cellar".into(),
            name: "Cellar".into(),
            description: Some("A cramped stone cellar.".to_string()),
            exits: BTreeMap::from([(Direction::Up, Exit::To(LocationId::new("foyer")))]),
            flags: BTreeSet::new(),
        },
    );

    let mut messenger = CatalogMessenger::with_defaults();
    messenger.set(lamp_lit_message(), "Click. The lamp is now lit.");
    messenger.set(MessageId::container_closed(), "You'll have to open the chest first.");

    Blueprint::new("Cloak of Darkness Demo", "Release 1 / Serial 260726", "Welcome to the foyer.", 0, LocationId::new("foyer"), items, locations)
        .with_verb(verb("take", &["get"]))
        .with_handler(Box::new(TakeHandler { rules: vec![rule("take", true)] }))
        .with_verb(verb("drop", &[]))
        .with_handler(Box::new(DropHandler { rules: vec![rule("drop", true)] }))
        .with_verb(verb("open", &[]))
        .with_handler(Box::new(OpenHandler { rules: vec![rule("open", true)] }))
        .with_verb(verb("close", &[]))
        .with_handler(Box::new(CloseHandler { rules: vec![rule("close", true)] }))
        .with_verb(verb("put", &[]))
        .with_handler(Box::new(PutHandler {
            rules: vec![SyntaxRule {
                literal_verbs: vec!["put".to_string()],
                requires_direct_object: true,
                requires_indirect_object: true,
                preposition: Some("in".to_string()),
                ..Default::default()
            }],
        }))
        .with_verb(verb("turn", &[]))
        .with_handler(Box::new(TurnOnHandler {
            rules: vec![SyntaxRule {
                literal_verbs: vec!["turn".to_string()],
                requires_direct_object: true,
                particle: Some("on".to_string()),
                ..Default::default()
            }],
        }))
        .with_messenger(Box::new(messenger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ScriptedIo;

    #[test]
    fn taking_the_lamp_moves_it_to_the_player() {
        let mut engine = lamp_and_chest_world().build();
        let mut io = ScriptedIo::new(["take lamp"]);
        engine.run_turn(&mut io);
        assert!(io.transcript_text().contains("Taken."));
    }

    #[test]
    fn closed_chest_refuses_put_until_opened() {
        let mut engine = lamp_and_chest_world().build();
        let mut io = ScriptedIo::new(["take lamp", "put lamp in chest"]);
        engine.run_turn(&mut io);
        engine.run_turn(&mut io);
        assert!(io.transcript_text().contains("open the chest first"));
    }
}
