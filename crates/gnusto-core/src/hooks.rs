//! Before/after event hooks on items and locations.
use std::collections::{BTreeSet, HashMap};

use crate::dispatch::{ActionContext, ActionResult};
use crate::ident::{ItemId, LocationId, VerbId};

/// A hook attached to an item or location, filtered by command verb.
///
/// Default `before`/`after` yield, matching [`crate::dispatch::ActionHandler`]'s
/// own default-to-yield shape: a hook only needs to implement the half it
/// cares about.
pub trait EventHook {
    /// Verbs this hook considers; `None` means every verb. A hook matching
    /// only `.drop, .insert` is only considered for those verbs.
    fn filter_verbs(&self) -> Option<&[VerbId]> {
        None
    }
    /// Runs before the default handler. A non-yield result short-circuits it.
    fn before(&self, _ctx: &ActionContext<'_>) -> ActionResult {
        ActionResult::Yield
    }
    /// Runs after the default handler (or the before-hook that replaced it).
    fn after(&self, _ctx: &ActionContext<'_>, _outcome: &ActionResult) -> ActionResult {
        ActionResult::Yield
    }
}

fn applies(hook: &dyn EventHook, verb: Option<&VerbId>) -> bool {
    match (hook.filter_verbs(), verb) {
        (None, _) => true,
        (Some(verbs), Some(v)) => verbs.iter().any(|candidate| candidate == v),
        (Some(_), None) => false,
    }
}

/// Registry of item and location hooks, keyed by entity id; each entity may
/// carry more than one hook, tried in registration order.
#[derive(Default)]
pub struct HookRegistry {
    item_hooks: HashMap<ItemId, Vec<Box<dyn EventHook>>>,
    location_hooks: HashMap<LocationId, Vec<Box<dyn EventHook>>>,
}

impl HookRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a hook to an item.
    pub fn register_item_hook(&mut self, item: ItemId, hook: Box<dyn EventHook>) {
        self.item_hooks.entry(item).or_default().push(hook);
    }

    /// Attaches a hook to a location.
    pub fn register_location_hook(&mut self, location: LocationId, hook: Box<dyn EventHook>) {
        self.location_hooks.entry(location).or_default().push(hook);
    }

    /// Runs before-hooks in spec order (location, then items in scope);
    /// returns the first non-yield result, which short-circuits the default
    /// handler, or `None` if every hook yielded.
    pub fn run_before(
        &self,
        location: &LocationId,
        scope: &BTreeSet<ItemId>,
        ctx: &ActionContext<'_>,
    ) -> Option<ActionResult> {
        if let Some(hooks) = self.location_hooks.get(location) {
            for hook in hooks {
                if applies(hook.as_ref(), ctx.command.verb.as_ref()) {
                    let result = hook.before(ctx);
                    if !result.is_yield() {
                        tracing::debug!(location = %location, "before-hook on location short-circuited dispatch");
                        return Some(result);
                    }
                }
            }
        }
        for item in scope {
            let Some(hooks) = self.item_hooks.get(item) else { continue };
            for hook in hooks {
                if applies(hook.as_ref(), ctx.command.verb.as_ref()) {
                    let result = hook.before(ctx);
                    if !result.is_yield() {
                        tracing::debug!(item = %item, "before-hook on item short-circuited dispatch");
                        return Some(result);
                    }
                }
            }
        }
        None
    }

    /// Runs after-hooks in a fixed order (items in scope, then location);
    /// every hook always runs regardless of what earlier hooks returned.
    /// Returns every non-yield result produced, in order.
    pub fn run_after(
        &self,
        location: &LocationId,
        scope: &BTreeSet<ItemId>,
        ctx: &ActionContext<'_>,
        default_outcome: &ActionResult,
    ) -> Vec<ActionResult> {
        let mut results = Vec::new();
        for item in scope {
            let Some(hooks) = self.item_hooks.get(item) else { continue };
            for hook in hooks {
                if applies(hook.as_ref(), ctx.command.verb.as_ref()) {
                    let result = hook.after(ctx, default_outcome);
                    if !result.is_yield() {
                        results.push(result);
                    }
                }
            }
        }
        if let Some(hooks) = self.location_hooks.get(location) {
            for hook in hooks {
                if applies(hook.as_ref(), ctx.command.verb.as_ref()) {
                    let result = hook.after(ctx, default_outcome);
                    if !result.is_yield() {
                        results.push(result);
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::StateChange;
    use crate::ident::FlagId;
    use crate::messenger::CatalogMessenger;
    use crate::resolver::{ComputeRegistry, Resolver};
    use crate::store::{ItemStatic, LocationStatic, WorldStore};
    use crate::value::ParentEntity;
    use std::collections::BTreeMap as Map;

    struct AlwaysRefuse;
    impl EventHook for AlwaysRefuse {
        fn before(&self, _ctx: &ActionContext<'_>) -> ActionResult {
            ActionResult::handled(Some("The hook says no.".into()), Vec::new(), Vec::new())
                .expect("non-empty result")
        }
    }

    struct RecordsTouch;
    impl EventHook for RecordsTouch {
        fn after(&self, _ctx: &ActionContext<'_>, _outcome: &ActionResult) -> ActionResult {
            ActionResult::handled(Some("It feels warm.".into()), Vec::new(), Vec::new())
                .expect("non-empty result")
        }
    }

    fn sample_store() -> WorldStore {
        let mut items = Map::new();
        items.insert(
            ItemId::new("chest"),
            ItemStatic {
                id: "chest".into(),
                name: "chest".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("room".into()),
                flags: BTreeSet::from([FlagId::new("container")]),
                size: Some(5),
                capacity: Some(10),
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
                flags: BTreeSet::from([FlagId::new("inherently-lit")]),
            },
        );
        WorldStore::new(items, locations, "room".into())
    }

    fn sample_command() -> crate::parser::Command {
        crate::parser::Command {
            verb: Some(VerbId::new("open")),
            direct_objects: vec![crate::parser::ObjectRef::Item(ItemId::new("chest"))],
            indirect_objects: Vec::new(),
            particle: None,
            preposition: None,
            direction: None,
            is_all: false,
            raw_input: "open chest".into(),
        }
    }

    #[test]
    fn location_before_hook_short_circuits_and_skips_items() {
        let store = sample_store();
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let command = sample_command();
        let messenger = CatalogMessenger::with_defaults();
        let ctx = ActionContext {
            store: &store,
            resolver: &resolver,
            command: &command,
            turn: 1,
            messenger: &messenger,
        };
        let mut registry = HookRegistry::new();
        registry.register_location_hook(LocationId::new("room"), Box::new(AlwaysRefuse));
        let scope = BTreeSet::from([ItemId::new("chest")]);
        let result = registry.run_before(&LocationId::new("room"), &scope, &ctx);
        assert!(result.is_some());
    }

    #[test]
    fn after_hooks_run_even_though_handler_already_produced_a_result() {
        let store = sample_store();
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let command = sample_command();
        let messenger = CatalogMessenger::with_defaults();
        let ctx = ActionContext {
            store: &store,
            resolver: &resolver,
            command: &command,
            turn: 1,
            messenger: &messenger,
        };
        let mut registry = HookRegistry::new();
        registry.register_item_hook(ItemId::new("chest"), Box::new(RecordsTouch));
        let scope = BTreeSet::from([ItemId::new("chest")]);
        let default_outcome =
            ActionResult::handled(Some("Opened.".into()), Vec::<StateChange>::new(), Vec::new())
                .expect("non-empty result");
        let after = registry.run_after(&LocationId::new("room"), &scope, &ctx, &default_outcome);
        assert_eq!(after.len(), 1);
    }
}
