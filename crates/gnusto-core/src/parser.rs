//! Tokenizes raw input, resolves phrase structure, and binds noun phrases to
//! entities in scope.
use std::collections::BTreeSet;

use crate::error::ParseError;
use crate::ident::{Direction, ItemId, Pronoun, VerbId};
use crate::resolver::Resolver;
use crate::store::WorldStore;
use crate::value::ParentEntity;
use crate::vocabulary::Vocabulary;

/// A bound or still-unresolved noun phrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectRef {
    /// Resolved to a concrete item.
    Item(ItemId),
    /// Resolved to an always-present abstract referent.
    Universal(crate::ident::UniversalId),
    /// Could not yet be resolved (retained for diagnostics/echoing).
    Pending(String),
}

/// A fully structured and bound player command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// The verb, if the sub-command named one (bare direction commands may omit it).
    pub verb: Option<VerbId>,
    /// Objects bound as direct objects (more than one only when `is_all`).
    pub direct_objects: Vec<ObjectRef>,
    /// Objects bound as indirect objects (after a preposition).
    pub indirect_objects: Vec<ObjectRef>,
    /// A particle immediately following the verb (e.g. "on" in "turn on lamp").
    pub particle: Option<String>,
    /// The preposition separating direct and indirect objects, if any.
    pub preposition: Option<String>,
    /// A direction, for movement commands.
    pub direction: Option<Direction>,
    /// Whether the command targeted "all".
    pub is_all: bool,
    /// The original, unmodified input line.
    pub raw_input: String,
}

/// Which slot of a [`Command`] a disambiguation is still waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisambiguationSlot {
    /// The command's direct object was ambiguous.
    DirectObject,
    /// The command's indirect object was ambiguous.
    IndirectObject,
}

/// A command whose parse is complete except for one ambiguous noun phrase.
/// The open slot holds an [`ObjectRef::Pending`] placeholder carrying the
/// phrase text; [`Parser::resolve_disambiguation`] fills it in from the
/// player's next reply without re-parsing anything else about the command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeedsDisambiguation {
    /// The command as far as it could be bound.
    pub command: Command,
    /// Which slot is still open.
    pub slot: DisambiguationSlot,
    /// Every in-scope entity the ambiguous phrase could have meant.
    pub candidates: Vec<ItemId>,
}

/// What parsing one sub-command produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every noun phrase resolved to exactly one entity (or the command has none).
    Command(Command),
    /// A noun phrase matched more than one in-scope entity; the caller should
    /// prompt with `candidates` by qualified name and feed the player's next
    /// line to [`Parser::resolve_disambiguation`] instead of parsing it fresh.
    NeedsDisambiguation(NeedsDisambiguation),
}

/// The result of resolving one noun phrase against the player's scope.
enum PhraseBinding {
    Resolved(ObjectRef),
    Ambiguous { phrase: String, candidates: Vec<ItemId> },
}

/// Splits one input line into sub-commands on the literal word "and";
/// each sub-command is parsed and executed as its own turn-step.
pub fn split_into_subcommands(line: &str) -> Vec<String> {
    let tokens = tokenize(line);
    let mut parts = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token == "and" {
            if !current.is_empty() {
                parts.push(current.join(" "));
                current = Vec::new();
            }
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        parts.push(current.join(" "));
    }
    parts
}

fn is_in(list: &[&str], word: &str) -> bool {
    list.iter().any(|candidate| *candidate == word)
}

fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| c.is_ascii_punctuation())
                .to_ascii_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parses one sub-command string against the current vocabulary, world
/// store, and resolver, binding noun phrases to entities in the player's
/// scope.
pub struct Parser<'a> {
    vocabulary: &'a Vocabulary,
    store: &'a WorldStore,
    resolver: &'a Resolver<'a>,
    universals: &'a [crate::value::Universal],
}

impl<'a> Parser<'a> {
    /// Builds a parser bound to the vocabulary, store, and resolver for one turn.
    pub fn new(
        vocabulary: &'a Vocabulary,
        store: &'a WorldStore,
        resolver: &'a Resolver<'a>,
        universals: &'a [crate::value::Universal],
    ) -> Self {
        Self { vocabulary, store, resolver, universals }
    }

    /// The player's current scope: inventory, the current location's
    /// contents, and open containers' contents transitively. Also used by the
    /// turn pipeline to scope event hooks to what's actually in play.
    pub(crate) fn scope(&self) -> BTreeSet<ItemId> {
        let mut scope = BTreeSet::new();
        let mut frontier: Vec<ParentEntity> =
            vec![ParentEntity::Player, ParentEntity::Location(self.store.player().location.clone())];
        while let Some(parent) = frontier.pop() {
            for child in self.store.children_of(&parent) {
                if scope.insert(child.clone()) {
                    let flags = self.resolver.item_flags(child);
                    let is_open_container = flags.iter().any(|f| f.as_str() == "open")
                        || flags.iter().any(|f| f.as_str() == "transparent");
                    if is_open_container {
                        frontier.push(ParentEntity::Item(child.clone()));
                    }
                }
            }
        }
        scope
    }

    /// Parses a single sub-command, producing a bound command, a pending
    /// disambiguation, or a typed error.
    pub fn parse(&self, raw_sub_command: &str) -> Result<ParseOutcome, ParseError> {
        let tokens = tokenize(raw_sub_command);
        if tokens.is_empty() {
            return Err(ParseError::Garbled("empty command".into()));
        }

        if tokens.len() == 1 {
            if let Some(direction) = Direction::from_word(&tokens[0]) {
                return Ok(ParseOutcome::Command(Command {
                    verb: None,
                    direct_objects: Vec::new(),
                    indirect_objects: Vec::new(),
                    particle: None,
                    preposition: None,
                    direction: Some(direction),
                    is_all: false,
                    raw_input: raw_sub_command.to_string(),
                }));
            }
        }

        let verb_word = &tokens[0];
        if self.vocabulary.is_unknown(verb_word) {
            return Err(ParseError::UnknownWord(verb_word.clone()));
        }
        let verb_roles = self.vocabulary.roles(verb_word);
        let verb = verb_roles.verbs.iter().next().cloned();

        let mut rest: Vec<&str> = tokens[1..].iter().map(String::as_str).collect();
        rest.retain(|token| !is_in(&crate::vocabulary::META_TOKENS, token) || *token == "all");

        let mut particle = None;
        if let Some(first) = rest.first() {
            if is_in(&crate::vocabulary::PREPOSITIONS, first) && rest.len() > 1 {
                particle = Some((*first).to_string());
                rest.remove(0);
            }
        }

        let mut is_all = false;
        if rest.first() == Some(&"all") {
            is_all = true;
            rest.remove(0);
        }

        if is_all {
            let direct_objects: Vec<ObjectRef> = self.scope().into_iter().map(ObjectRef::Item).collect();
            let (preposition, indirect_binding) = self.parse_trailing_indirect(&rest)?;
            let command = Command {
                verb,
                direct_objects,
                indirect_objects: Vec::new(),
                particle,
                preposition,
                direction: None,
                is_all,
                raw_input: raw_sub_command.to_string(),
            };
            return Ok(self.finish(command, None, indirect_binding.map(|b| (DisambiguationSlot::IndirectObject, b))));
        }

        if rest.is_empty() {
            return Ok(ParseOutcome::Command(Command {
                verb,
                direct_objects: Vec::new(),
                indirect_objects: Vec::new(),
                particle,
                preposition: None,
                direction: None,
                is_all,
                raw_input: raw_sub_command.to_string(),
            }));
        }

        let (direct_phrase, remainder) = split_at_preposition(&rest);
        let direct_binding = self.bind_phrase(direct_phrase)?;
        let (preposition, indirect_binding) = self.parse_trailing_indirect(remainder)?;

        let direct_objects = vec![placeholder_or_object(&direct_binding)];
        let command = Command {
            verb,
            direct_objects,
            indirect_objects: Vec::new(),
            particle,
            preposition,
            direction: None,
            is_all,
            raw_input: raw_sub_command.to_string(),
        };
        Ok(self.finish(
            command,
            Some((DisambiguationSlot::DirectObject, direct_binding)),
            indirect_binding.map(|b| (DisambiguationSlot::IndirectObject, b)),
        ))
    }

    /// Fills in whichever slots resolved cleanly, and returns a
    /// `NeedsDisambiguation` for the first slot (direct object takes
    /// priority) that didn't.
    fn finish(
        &self,
        mut command: Command,
        direct: Option<(DisambiguationSlot, PhraseBinding)>,
        indirect: Option<(DisambiguationSlot, PhraseBinding)>,
    ) -> ParseOutcome {
        let mut ambiguity = None;
        if let Some((slot, binding)) = direct {
            match binding {
                PhraseBinding::Resolved(object) => command.direct_objects = vec![object],
                PhraseBinding::Ambiguous { phrase, candidates } => {
                    command.direct_objects = vec![ObjectRef::Pending(phrase)];
                    ambiguity.get_or_insert((slot, candidates));
                }
            }
        }
        if let Some((slot, binding)) = indirect {
            match binding {
                PhraseBinding::Resolved(object) => command.indirect_objects = vec![object],
                PhraseBinding::Ambiguous { phrase, candidates } => {
                    command.indirect_objects = vec![ObjectRef::Pending(phrase)];
                    ambiguity.get_or_insert((slot, candidates));
                }
            }
        }
        match ambiguity {
            Some((slot, candidates)) => {
                ParseOutcome::NeedsDisambiguation(NeedsDisambiguation { command, slot, candidates })
            }
            None => ParseOutcome::Command(command),
        }
    }

    /// Narrows a pending disambiguation's candidates against the player's
    /// reply, one token at a time, then plugs the single surviving candidate
    /// into the open slot of `pending.command`. No other part of the command
    /// is re-parsed.
    pub fn resolve_disambiguation(
        &self,
        pending: &NeedsDisambiguation,
        raw_reply: &str,
    ) -> Result<Command, ParseError> {
        let tokens = tokenize(raw_reply);
        if tokens.is_empty() {
            return Err(ParseError::Garbled("empty reply".into()));
        }
        let mut narrowed = pending.candidates.clone();
        for token in &tokens {
            if self.vocabulary.is_unknown(token) {
                continue;
            }
            let roles = self.vocabulary.roles(token);
            let matched: Vec<ItemId> = narrowed
                .iter()
                .filter(|id| roles.nouns.contains(*id) || roles.adjectives.contains(*id))
                .cloned()
                .collect();
            if !matched.is_empty() {
                narrowed = matched;
            }
        }
        let chosen = match narrowed.len() {
            0 => return Err(ParseError::DontSeeThat(raw_reply.to_string())),
            1 => narrowed.remove(0),
            _ => return Err(ParseError::BeMoreSpecific(narrowed)),
        };
        let mut command = pending.command.clone();
        match pending.slot {
            DisambiguationSlot::DirectObject => command.direct_objects = vec![ObjectRef::Item(chosen)],
            DisambiguationSlot::IndirectObject => command.indirect_objects = vec![ObjectRef::Item(chosen)],
        }
        Ok(command)
    }

    fn parse_trailing_indirect(
        &self,
        rest: &[&str],
    ) -> Result<(Option<String>, Option<PhraseBinding>), ParseError> {
        if rest.is_empty() {
            return Ok((None, None));
        }
        let preposition = rest[0].to_string();
        if !is_in(&crate::vocabulary::PREPOSITIONS, rest[0]) {
            return Err(ParseError::Garbled(format!("expected a preposition, found {}", rest[0])));
        }
        let phrase = &rest[1..];
        if phrase.is_empty() {
            return Err(ParseError::Garbled("preposition with no object".into()));
        }
        Ok((Some(preposition), Some(self.bind_phrase(phrase)?)))
    }

    fn bind_phrase(&self, phrase: &[&str]) -> Result<PhraseBinding, ParseError> {
        if phrase.is_empty() {
            return Err(ParseError::Garbled("empty noun phrase".into()));
        }
        if phrase.len() == 1 {
            if let Some(pronoun) = Pronoun::from_word(phrase[0]) {
                return self.resolve_pronoun(pronoun).map(PhraseBinding::Resolved);
            }
        }
        let (adjectives, noun) = phrase.split_at(phrase.len() - 1);
        let noun_word = noun[0];
        if self.vocabulary.is_unknown(noun_word) {
            return Err(ParseError::UnknownWord(noun_word.to_string()));
        }
        let roles = self.vocabulary.roles(noun_word);
        let scope = self.scope();
        let mut candidates: Vec<ItemId> =
            roles.nouns.iter().filter(|id| scope.contains(*id)).cloned().collect();
        for adjective in adjectives {
            let adj_roles = self.vocabulary.roles(adjective);
            candidates.retain(|id| adj_roles.adjectives.contains(id));
        }
        match candidates.len() {
            0 => {
                if let Some(universal) =
                    self.universals.iter().find(|u| u.names.iter().any(|name| *name == noun_word))
                {
                    Ok(PhraseBinding::Resolved(ObjectRef::Universal(universal.id.clone())))
                } else {
                    Err(ParseError::DontSeeThat(phrase.join(" ")))
                }
            }
            1 => Ok(PhraseBinding::Resolved(ObjectRef::Item(candidates.remove(0)))),
            _ => Ok(PhraseBinding::Ambiguous { phrase: phrase.join(" "), candidates }),
        }
    }

    fn resolve_pronoun(&self, pronoun: Pronoun) -> Result<ObjectRef, ParseError> {
        let referents = self.store.pronouns().get(&pronoun);
        match referents {
            Some(set) if !set.is_empty() => {
                let mut iter = set.iter();
                let first = iter.next().expect("checked non-empty").clone();
                Ok(ObjectRef::Item(first))
            }
            _ => Err(ParseError::NothingToReferTo),
        }
    }
}

fn placeholder_or_object(binding: &PhraseBinding) -> ObjectRef {
    match binding {
        PhraseBinding::Resolved(object) => object.clone(),
        PhraseBinding::Ambiguous { phrase, .. } => ObjectRef::Pending(phrase.clone()),
    }
}

fn split_at_preposition<'t>(tokens: &[&'t str]) -> (&[&'t str], &[&'t str]) {
    for (index, token) in tokens.iter().enumerate() {
        if is_in(&crate::vocabulary::PREPOSITIONS, token) && index > 0 {
            return (&tokens[..index], &tokens[index..]);
        }
    }
    (tokens, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{FlagId, LocationId};
    use crate::resolver::ComputeRegistry;
    use crate::store::{ItemStatic, LocationStatic};
    use crate::vocabulary::VerbEntry;
    use std::collections::BTreeMap as Map;

    fn world_with_lamp_and_hook() -> WorldStore {
        let mut items = Map::new();
        items.insert(
            ItemId::new("lamp"),
            ItemStatic {
                id: "lamp".into(),
                name: "lamp".into(),
                adjectives: BTreeSet::from(["brass".to_string()]),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("foyer".into()),
                flags: BTreeSet::from([FlagId::new("takable")]),
                size: Some(2),
                capacity: None,
                description: None,
            },
        );
        items.insert(
            ItemId::new("hook"),
            ItemStatic {
                id: "hook".into(),
                name: "hook".into(),
                adjectives: BTreeSet::new(),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("foyer".into()),
                flags: BTreeSet::new(),
                size: Some(1),
                capacity: None,
                description: None,
            },
        );
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("foyer"),
            LocationStatic {
                id: "foyer".into(),
                name: "Foyer".into(),
                description: None,
                exits: Map::new(),
                flags: BTreeSet::from([FlagId::new("inherently-lit")]),
            },
        );
        WorldStore::new(items, locations, "foyer".into())
    }

    fn world_with_two_keys() -> WorldStore {
        let mut items = Map::new();
        items.insert(
            ItemId::new("brass-key"),
            ItemStatic {
                id: "brass-key".into(),
                name: "key".into(),
                adjectives: BTreeSet::from(["brass".to_string()]),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("foyer".into()),
                flags: BTreeSet::from([FlagId::new("takable")]),
                size: Some(1),
                capacity: None,
                description: None,
            },
        );
        items.insert(
            ItemId::new("rusty-key"),
            ItemStatic {
                id: "rusty-key".into(),
                name: "key".into(),
                adjectives: BTreeSet::from(["rusty".to_string()]),
                synonyms: BTreeSet::new(),
                initial_parent: ParentEntity::Location("foyer".into()),
                flags: BTreeSet::from([FlagId::new("takable")]),
                size: Some(1),
                capacity: None,
                description: None,
            },
        );
        let mut locations = Map::new();
        locations.insert(
            LocationId::new("foyer"),
            LocationStatic {
                id: "foyer".into(),
                name: "Foyer".into(),
                description: None,
                exits: Map::new(),
                flags: BTreeSet::from([FlagId::new("inherently-lit")]),
            },
        );
        WorldStore::new(items, locations, "foyer".into())
    }

    #[test]
    fn take_lamp_binds_the_single_matching_item() {
        let store = world_with_lamp_and_hook();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("take lamp").expect("parses");
        let ParseOutcome::Command(command) = outcome else { panic!("expected a bound command") };
        assert_eq!(command.verb, Some(VerbId::new("take")));
        assert_eq!(command.direct_objects, vec![ObjectRef::Item(ItemId::new("lamp"))]);
    }

    #[test]
    fn take_all_binds_every_item_in_scope() {
        let store = world_with_lamp_and_hook();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("take all").expect("parses");
        let ParseOutcome::Command(command) = outcome else { panic!("expected a bound command") };
        assert!(command.is_all);
        assert_eq!(command.direct_objects.len(), 2);
    }

    #[test]
    fn bare_direction_produces_a_movement_command_with_no_verb() {
        let store = world_with_lamp_and_hook();
        let vocab = Vocabulary::build(&store, &[]);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("north").expect("parses");
        let ParseOutcome::Command(command) = outcome else { panic!("expected a bound command") };
        assert_eq!(command.direction, Some(Direction::North));
        assert!(command.verb.is_none());
    }

    #[test]
    fn unknown_word_is_reported_distinctly_from_out_of_scope() {
        let store = world_with_lamp_and_hook();
        let vocab = Vocabulary::build(&store, &[]);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        assert_eq!(parser.parse("xyzzy"), Err(ParseError::UnknownWord("xyzzy".into())));
    }

    #[test]
    fn pronoun_with_no_prior_binding_is_an_error() {
        let store = world_with_lamp_and_hook();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        assert_eq!(parser.parse("take it"), Err(ParseError::NothingToReferTo));
    }

    #[test]
    fn ambiguous_noun_phrase_yields_needs_disambiguation_with_both_candidates() {
        let store = world_with_two_keys();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("take key").expect("parses");
        let ParseOutcome::NeedsDisambiguation(pending) = outcome else {
            panic!("expected an ambiguous noun phrase")
        };
        assert_eq!(pending.slot, DisambiguationSlot::DirectObject);
        assert_eq!(pending.candidates.len(), 2);
        assert!(pending.candidates.contains(&ItemId::new("brass-key")));
        assert!(pending.candidates.contains(&ItemId::new("rusty-key")));
    }

    #[test]
    fn disambiguation_reply_narrows_by_adjective_and_binds_the_open_slot() {
        let store = world_with_two_keys();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("take key").expect("parses");
        let ParseOutcome::NeedsDisambiguation(pending) = outcome else {
            panic!("expected an ambiguous noun phrase")
        };
        let command = parser.resolve_disambiguation(&pending, "brass").expect("resolves");
        assert_eq!(command.verb, Some(VerbId::new("take")));
        assert_eq!(command.direct_objects, vec![ObjectRef::Item(ItemId::new("brass-key"))]);
    }

    #[test]
    fn disambiguation_reply_that_still_matches_both_stays_ambiguous() {
        let store = world_with_two_keys();
        let verbs = vec![VerbEntry { id: VerbId::new("take"), words: vec!["take".to_string()] }];
        let vocab = Vocabulary::build(&store, &verbs);
        let compute = ComputeRegistry::new();
        let resolver = Resolver::new(&store, &compute);
        let universals = Vec::new();
        let parser = Parser::new(&vocab, &store, &resolver, &universals);
        let outcome = parser.parse("take key").expect("parses");
        let ParseOutcome::NeedsDisambiguation(pending) = outcome else {
            panic!("expected an ambiguous noun phrase")
        };
        let result = parser.resolve_disambiguation(&pending, "key");
        assert!(matches!(result, Err(ParseError::BeMoreSpecific(candidates)) if candidates.len() == 2));
    }
}
