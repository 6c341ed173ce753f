//! Action handler contract, syntax-rule scoring, and dispatch selection.
use crate::change::{SideEffect, StateChange};
use crate::error::ActionResponse;
use crate::ident::{LocationId, VerbId};
use crate::messenger::Messenger;
use crate::parser::Command;
use crate::resolver::Resolver;
use crate::store::WorldStore;

/// One shape a handler accepts: literal verb tokens plus required slots.
///
/// An empty `literal_verbs` rule still matches through [`ActionHandler::synonyms`]
/// (a generic `.verb` slot); a non-empty one matches more specifically via a
/// literal token in the rule.
#[derive(Clone, Debug, Default)]
pub struct SyntaxRule {
    /// Literal verb words this rule matches directly (more specific than a synonym).
    pub literal_verbs: Vec<String>,
    /// Whether a direct object must be bound for this rule to apply.
    pub requires_direct_object: bool,
    /// Whether an indirect object must be bound for this rule to apply.
    pub requires_indirect_object: bool,
    /// A required particle immediately after the verb (e.g. "on" in "turn on").
    pub particle: Option<String>,
    /// A required preposition before the indirect object.
    pub preposition: Option<String>,
}

impl SyntaxRule {
    /// Count of literal tokens this rule pins down, used to break scoring ties
    /// in favor of the more specific rule.
    fn specificity(&self) -> u32 {
        self.literal_verbs.len() as u32
            + u32::from(self.particle.is_some())
            + u32::from(self.preposition.is_some())
    }
}

/// Read-only context shared by a handler's `validate`/`process`/`post_process`.
pub struct ActionContext<'a> {
    /// The world store, read-only from a handler's perspective.
    pub store: &'a WorldStore,
    /// The resolver for rollups and effective property reads.
    pub resolver: &'a Resolver<'a>,
    /// The command being dispatched.
    pub command: &'a Command,
    /// The current turn index.
    pub turn: u64,
    /// The message catalog; handlers never hard-code player-visible text.
    pub messenger: &'a dyn Messenger,
}

/// What a handler (or hook) produced.
///
/// `Yield` means "I declined; continue with default handling"; it never
/// short-circuits further processing. Any other value does.
#[derive(Clone, Debug, Default)]
pub enum ActionResult {
    /// The handler declined to act.
    #[default]
    Yield,
    /// The handler acted: an optional message plus changes and side effects.
    Handled {
        /// A player-facing message, usually from the messenger.
        message: Option<String>,
        /// State changes to apply, in order.
        changes: Vec<StateChange>,
        /// Side effects to translate and apply.
        side_effects: Vec<SideEffect>,
    },
}

impl ActionResult {
    /// Builds a `Handled` result. Errors if every field would be empty, since
    /// a result that changes nothing and says nothing is never meaningful.
    pub fn handled(
        message: Option<String>,
        changes: Vec<StateChange>,
        side_effects: Vec<SideEffect>,
    ) -> Result<Self, crate::error::EngineError> {
        if message.is_none() && changes.is_empty() && side_effects.is_empty() {
            return Err(crate::error::EngineError::InvalidSideEffect(
                "action result with no message, changes, or side effects".into(),
            ));
        }
        Ok(ActionResult::Handled { message, changes, side_effects })
    }

    /// True if this is the `Yield` sentinel.
    pub fn is_yield(&self) -> bool {
        matches!(self, ActionResult::Yield)
    }
}

/// A unit of command-processing logic.
///
/// `validate`/`post_process` default to an empty check and a no-op
/// passthrough, respectively, so a handler only implements what it needs.
pub trait ActionHandler {
    /// The shapes of command this handler accepts.
    fn syntax_rules(&self) -> &[SyntaxRule];
    /// Verbs this handler answers to generically (the "100" scoring tier).
    fn synonyms(&self) -> &[VerbId];
    /// Whether this handler requires its location to be lit to run.
    fn requires_light(&self) -> bool {
        false
    }
    /// Checks prerequisites; rejects with a typed [`ActionResponse`] on failure.
    fn validate(&self, _ctx: &ActionContext<'_>) -> Result<(), ActionResponse> {
        Ok(())
    }
    /// Produces the handler's effect.
    fn process(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse>;
    /// Refines the result after it is produced; the default is a no-op passthrough.
    fn post_process(&self, _ctx: &ActionContext<'_>, result: ActionResult) -> ActionResult {
        result
    }
}

/// A handler's score against one command, plus the specificity of the rule
/// that produced it (used only to break score ties).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct HandlerScore {
    score: u32,
    specificity: u32,
}

fn score_rule(rule: &SyntaxRule, handler_has_rules: bool, verb: &VerbId, synonyms: &[VerbId], command: &Command) -> Option<HandlerScore> {
    let matches_literal = rule.literal_verbs.iter().any(|word| VerbId::new(word.clone()) == *verb);
    let matches_synonym = synonyms.iter().any(|syn| syn == verb);
    if !matches_literal && !matches_synonym {
        return None;
    }
    if rule.requires_direct_object && command.direct_objects.is_empty() {
        return None;
    }
    if rule.requires_indirect_object && command.indirect_objects.is_empty() {
        return None;
    }
    if let Some(expected) = &rule.particle {
        if command.particle.as_deref() != Some(expected.as_str()) {
            return None;
        }
    }
    if let Some(expected) = &rule.preposition {
        if command.preposition.as_deref() != Some(expected.as_str()) {
            return None;
        }
    }

    let mut score = if matches_literal { 200 } else { 100 };
    if rule.requires_direct_object {
        score += 10;
    }
    if rule.requires_indirect_object {
        score += 10;
    }
    if rule.particle.is_some() {
        score += 20;
    }
    if rule.preposition.is_some() {
        score += 20;
    }
    if handler_has_rules {
        score += 5;
    }
    Some(HandlerScore { score, specificity: rule.specificity() })
}

/// Scores a handler against a command; `0` means no syntax rule matched
/// structurally.
fn score_handler(handler: &dyn ActionHandler, command: &Command) -> HandlerScore {
    let Some(verb) = &command.verb else {
        return HandlerScore::default();
    };
    let rules = handler.syntax_rules();
    let has_rules = !rules.is_empty();
    rules
        .iter()
        .filter_map(|rule| score_rule(rule, has_rules, verb, handler.synonyms(), command))
        .max_by_key(|candidate| (candidate.score, candidate.specificity))
        .unwrap_or_default()
}

/// Ordered registry of handlers; registration order is the final tie-break.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: Vec<Box<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Handlers are tried for dispatch in registration order on ties.
    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.push(handler);
    }

    /// Selects the highest-scoring handler for `command`, or `None` if every
    /// handler scored `0`, in which case the caller falls back to a generic
    /// "I don't understand that".
    pub fn dispatch(&self, command: &Command) -> Option<&dyn ActionHandler> {
        let mut best: Option<(usize, HandlerScore)> = None;
        for (index, handler) in self.handlers.iter().enumerate() {
            let score = score_handler(handler.as_ref(), command);
            if score.score == 0 {
                continue;
            }
            let is_better = match best {
                None => true,
                Some((_, best_score)) => {
                    (score.score, score.specificity) > (best_score.score, best_score.specificity)
                }
            };
            if is_better {
                if best.is_some() {
                    tracing::debug!(index, score = score.score, "dispatch scoring tie broken by specificity/order");
                }
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| self.handlers[index].as_ref())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Rejects a handler invocation if it requires light and the player's current
/// location is dark.
pub fn check_light(
    handler: &dyn ActionHandler,
    resolver: &Resolver<'_>,
    location: &LocationId,
) -> Result<(), ActionResponse> {
    if handler.requires_light() && !resolver.is_lit(location) {
        return Err(ActionResponse::RoomIsDark);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::ItemId;
    use crate::parser::ObjectRef;

    struct TakeHandler {
        rules: Vec<SyntaxRule>,
        synonyms: Vec<VerbId>,
    }

    impl ActionHandler for TakeHandler {
        fn syntax_rules(&self) -> &[SyntaxRule] {
            &self.rules
        }
        fn synonyms(&self) -> &[VerbId] {
            &self.synonyms
        }
        fn process(&self, _ctx: &ActionContext<'_>) -> Result<ActionResult, ActionResponse> {
            ActionResult::handled(Some("Taken.".into()), Vec::new(), Vec::new())
                .map_err(|e| ActionResponse::InternalEngineError(e.to_string()))
        }
    }

    fn command(verb: &str, direct: Vec<ObjectRef>) -> Command {
        Command {
            verb: Some(VerbId::new(verb)),
            direct_objects: direct,
            indirect_objects: Vec::new(),
            particle: None,
            preposition: None,
            direction: None,
            is_all: false,
            raw_input: verb.to_string(),
        }
    }

    #[test]
    fn literal_verb_with_bound_object_outscores_synonym_only_rule() {
        let literal = TakeHandler {
            rules: vec![SyntaxRule {
                literal_verbs: vec!["take".into()],
                requires_direct_object: true,
                ..Default::default()
            }],
            synonyms: vec![VerbId::new("take")],
        };
        let cmd = command("take", vec![ObjectRef::Item(ItemId::new("lamp"))]);
        let score = score_handler(&literal, &cmd);
        assert_eq!(score.score, 200 + 10 + 5);
    }

    #[test]
    fn missing_required_object_scores_zero() {
        let handler = TakeHandler {
            rules: vec![SyntaxRule {
                literal_verbs: vec!["take".into()],
                requires_direct_object: true,
                ..Default::default()
            }],
            synonyms: vec![],
        };
        let cmd = command("take", Vec::new());
        assert_eq!(score_handler(&handler, &cmd).score, 0);
    }

    #[test]
    fn registry_dispatches_the_only_matching_handler() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(TakeHandler {
            rules: vec![SyntaxRule {
                literal_verbs: vec!["take".into()],
                requires_direct_object: true,
                ..Default::default()
            }],
            synonyms: vec![VerbId::new("take")],
        }));
        let cmd = command("take", vec![ObjectRef::Item(ItemId::new("lamp"))]);
        assert!(registry.dispatch(&cmd).is_some());
        let nothing = command("xyzzy", Vec::new());
        assert!(registry.dispatch(&nothing).is_none());
    }

    #[test]
    fn action_result_handled_rejects_fully_empty_construction() {
        assert!(ActionResult::handled(None, Vec::new(), Vec::new()).is_err());
        assert!(ActionResult::handled(Some("hi".into()), Vec::new(), Vec::new()).is_ok());
    }
}
