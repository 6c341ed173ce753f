//! The game's configuration object: title, release metadata, static world
//! data, and every registration table the engine consults. Registration
//! tables are frozen the moment [`Blueprint::build`] runs.
use std::collections::BTreeMap;

use crate::dispatch::{ActionHandler, ActionRegistry};
use crate::engine::{StateChangeEngine, ValidatorFn, ValidatorRegistry};
use crate::hooks::{EventHook, HookRegistry};
use crate::ident::{DaemonId, FuseId, ItemId, LocationId};
use crate::messenger::{CatalogMessenger, Messenger};
use crate::resolver::{ComputeFn, ComputeRegistry};
use crate::store::{ItemStatic, LocationStatic, WorldStore};
use crate::time::{DaemonFn, FuseFn, TimeRegistry};
use crate::value::{EntityId, Universal};
use crate::vocabulary::{VerbEntry, Vocabulary};

use crate::change::AttributeKey;

/// Everything a host binary assembles before the turn pipeline can run.
/// Construction follows a consuming builder convention (`with_*` methods
/// taking and returning `Self` by value).
pub struct Blueprint {
    /// Game title, shown in the startup banner.
    pub title: String,
    /// Release/version string, shown alongside the title.
    pub release: String,
    /// Introductory text, printed once before the first turn.
    pub introduction: String,
    /// The maximum attainable score, for the `score` command's "out of N".
    pub max_score: i64,
    /// The player's starting location.
    pub player_start: LocationId,
    /// Item static definitions.
    pub items: BTreeMap<ItemId, ItemStatic>,
    /// Location static definitions.
    pub locations: BTreeMap<LocationId, LocationStatic>,
    /// Always-present abstract referents (sky, floor, ...).
    pub universals: Vec<Universal>,
    /// Handler-declared verbs, aggregated into the parser's vocabulary.
    pub verbs: Vec<VerbEntry>,
    handlers: ActionRegistry,
    hooks: HookRegistry,
    compute: ComputeRegistry,
    validators: ValidatorRegistry,
    time: TimeRegistry,
    messenger: Box<dyn Messenger>,
    /// Seed for the engine's deterministic RNG.
    pub rng_seed: u64,
    /// `tracing` target name this engine's spans/events are emitted under.
    pub log_target: String,
}

impl Blueprint {
    /// Builds a blueprint with empty registration tables and the engine's
    /// built-in message catalog and universals.
    pub fn new(
        title: impl Into<String>,
        release: impl Into<String>,
        introduction: impl Into<String>,
        max_score: i64,
        player_start: LocationId,
        items: BTreeMap<ItemId, ItemStatic>,
        locations: BTreeMap<LocationId, LocationStatic>,
    ) -> Self {
        let mut verbs = Vec::new();
        let mut handlers = ActionRegistry::new();
        crate::builtins::register_all(&mut handlers, &mut verbs);
        Self {
            title: title.into(),
            release: release.into(),
            introduction: introduction.into(),
            max_score,
            player_start,
            items,
            locations,
            universals: crate::value::default_universals(),
            verbs,
            handlers,
            hooks: HookRegistry::new(),
            compute: ComputeRegistry::new(),
            validators: ValidatorRegistry::new(),
            time: TimeRegistry::new(),
            messenger: Box::new(CatalogMessenger::with_defaults()),
            rng_seed: 0,
            log_target: "gnusto".to_string(),
        }
    }

    /// Replaces the default universal referents.
    pub fn with_universals(mut self, universals: Vec<Universal>) -> Self {
        self.universals = universals;
        self
    }

    /// Declares a verb and the words that name it.
    pub fn with_verb(mut self, verb: VerbEntry) -> Self {
        self.verbs.push(verb);
        self
    }

    /// Registers an action handler.
    pub fn with_handler(mut self, handler: Box<dyn ActionHandler>) -> Self {
        self.handlers.register(handler);
        self
    }

    /// Attaches an event hook to an item.
    pub fn with_item_hook(mut self, item: ItemId, hook: Box<dyn EventHook>) -> Self {
        self.hooks.register_item_hook(item, hook);
        self
    }

    /// Attaches an event hook to a location.
    pub fn with_location_hook(mut self, location: LocationId, hook: Box<dyn EventHook>) -> Self {
        self.hooks.register_location_hook(location, hook);
        self
    }

    /// Registers a compute handler for one specific entity and attribute.
    pub fn with_compute(mut self, entity: EntityId, attribute: AttributeKey, handler: ComputeFn) -> Self {
        self.compute.register(entity, attribute, handler);
        self
    }

    /// Registers a compute handler applying to every entity for one attribute.
    pub fn with_compute_fallback(mut self, attribute: AttributeKey, handler: ComputeFn) -> Self {
        self.compute.register_fallback(attribute, handler);
        self
    }

    /// Registers a validator for one specific entity and attribute.
    pub fn with_validator(mut self, entity: EntityId, attribute: AttributeKey, validator: ValidatorFn) -> Self {
        self.validators.register(entity, attribute, validator);
        self
    }

    /// Registers a validator applying to every entity for one attribute.
    pub fn with_validator_fallback(mut self, attribute: AttributeKey, validator: ValidatorFn) -> Self {
        self.validators.register_fallback(attribute, validator);
        self
    }

    /// Registers the function a fuse invokes when it fires.
    pub fn with_fuse(mut self, id: FuseId, function: FuseFn) -> Self {
        self.time.register_fuse(id, function);
        self
    }

    /// Registers a daemon's function and firing frequency, in turns.
    pub fn with_daemon(mut self, id: DaemonId, function: DaemonFn, frequency: i64) -> Self {
        self.time.register_daemon(id, function, frequency);
        self
    }

    /// Replaces the default message catalog.
    pub fn with_messenger(mut self, messenger: Box<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }

    /// Overrides the RNG seed (default `0`).
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Overrides the `tracing` target name (default `"gnusto"`).
    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    /// Consumes the blueprint, building a [`crate::pipeline::Engine`] ready to
    /// run turns. Registration tables are owned by the returned engine from
    /// this point on; nothing is shared or mutable at file scope.
    pub fn build(self) -> crate::pipeline::Engine {
        crate::pipeline::Engine::from_blueprint(self)
    }
}

pub(crate) struct BuiltParts {
    pub store: WorldStore,
    pub vocabulary: Vocabulary,
    pub universals: Vec<Universal>,
    pub handlers: ActionRegistry,
    pub hooks: HookRegistry,
    pub compute: ComputeRegistry,
    pub engine: StateChangeEngine,
    pub time: TimeRegistry,
    pub messenger: Box<dyn Messenger>,
    pub rng_seed: u64,
    pub log_target: String,
    pub title: String,
    pub release: String,
    pub introduction: String,
    pub max_score: i64,
}

impl Blueprint {
    /// Assembles the runtime pieces `Engine::from_blueprint` wires together,
    /// without exposing `gnusto-core`'s internal registries outside the crate.
    pub(crate) fn into_parts(self) -> BuiltParts {
        let store = WorldStore::new(self.items, self.locations, self.player_start);
        let vocabulary = Vocabulary::build(&store, &self.verbs);
        BuiltParts {
            store,
            vocabulary,
            universals: self.universals,
            handlers: self.handlers,
            hooks: self.hooks,
            compute: self.compute,
            engine: StateChangeEngine::new(self.validators),
            time: self.time,
            messenger: self.messenger,
            rng_seed: self.rng_seed,
            log_target: self.log_target,
            title: self.title,
            release: self.release,
            introduction: self.introduction,
            max_score: self.max_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{FlagId, VerbId};
    use crate::value::ParentEntity;
    use std::collections::BTreeSet;

    fn sample_items() -> BTreeMap<ItemId, ItemStatic> {
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
        items
    }

    fn sample_locations() -> BTreeMap<LocationId, LocationStatic> {
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
        locations
    }

    #[test]
    fn builder_chain_populates_verbs_and_fuse_registrations() {
        fn noop_fuse(
            _store: &WorldStore,
            _resolver: &crate::resolver::Resolver<'_>,
            _state: &crate::store::FuseState,
        ) -> Result<Option<crate::dispatch::ActionResult>, crate::error::ActionResponse> {
            Ok(None)
        }

        let builtin_verb_count = Blueprint::new(
            "Gnusto Demo",
            "Release 1 / Serial 260726",
            "Welcome.",
            10,
            LocationId::new("foyer"),
            sample_items(),
            sample_locations(),
        )
        .verbs
        .len();

        let blueprint = Blueprint::new(
            "Gnusto Demo",
            "Release 1 / Serial 260726",
            "Welcome.",
            10,
            LocationId::new("foyer"),
            sample_items(),
            sample_locations(),
        )
        .with_verb(VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] })
        .with_fuse(FuseId::new("candle"), noop_fuse)
        .with_rng_seed(42);

        assert_eq!(blueprint.verbs.len(), builtin_verb_count + 1);
        assert_eq!(blueprint.rng_seed, 42);
        let parts = blueprint.into_parts();
        assert_eq!(parts.max_score, 10);
        assert!(parts.vocabulary.roles("take").verbs.contains(&VerbId::new("take")));
    }
}
