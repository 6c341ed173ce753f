//! The parser's lexicon: built once at startup from item and location static
//! data plus handler-declared verbs, then queried by the parser as an
//! immutable lowercase-string → token-class lookup.
use std::collections::{BTreeMap, BTreeSet};

use crate::ident::{Direction, ItemId, VerbId};
use crate::store::WorldStore;

/// The fixed preposition set the parser recognizes.
pub const PREPOSITIONS: [&str; 13] = [
    "in", "on", "to", "from", "with", "at", "under", "behind", "about", "through", "up", "down", "off",
];

/// Meta tokens with grammatical but no lexical meaning.
pub const META_TOKENS: [&str; 6] = ["all", "any", "the", "a", "an", "and"];

/// All role classes a single word may belong to. A word such as "light" is
/// legitimately both a verb and a noun/adjective; the parser's structuring
/// step disambiguates by grammatical position, not the vocabulary.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct WordRoles {
    /// Verbs this word names, by canonical verb id.
    pub verbs: BTreeSet<VerbId>,
    /// Items this word names as their primary noun or a synonym.
    pub nouns: BTreeSet<ItemId>,
    /// Items this word names as an adjective.
    pub adjectives: BTreeSet<ItemId>,
    /// Set when the word is a recognized preposition.
    pub is_preposition: bool,
    /// Set when the word is a recognized direction.
    pub direction: Option<Direction>,
    /// Set when the word is a recognized pronoun.
    pub pronoun: Option<crate::ident::Pronoun>,
    /// Set when the word is a meta token (article, conjunction, quantifier).
    pub is_meta: bool,
}

impl WordRoles {
    fn is_empty(&self) -> bool {
        self.verbs.is_empty()
            && self.nouns.is_empty()
            && self.adjectives.is_empty()
            && !self.is_preposition
            && self.direction.is_none()
            && self.pronoun.is_none()
            && !self.is_meta
    }
}

/// The immutable lexicon the parser consults. Construction aggregates every
/// word source; queries never mutate it.
pub struct Vocabulary {
    words: BTreeMap<String, WordRoles>,
}

/// A verb declared by a handler, with its canonical id and any synonyms.
pub struct VerbEntry {
    /// Canonical verb id.
    pub id: VerbId,
    /// Literal words that name this verb.
    pub words: Vec<String>,
}

impl Vocabulary {
    /// Builds the vocabulary from the world's static item/location data plus
    /// handler-declared verbs.
    pub fn build(store: &WorldStore, verbs: &[VerbEntry]) -> Self {
        let mut words: BTreeMap<String, WordRoles> = BTreeMap::new();

        for id in store.item_ids() {
            if let Ok(item) = store.get_item_static(id) {
                Self::insert_noun(&mut words, &item.name, id);
                for synonym in &item.synonyms {
                    Self::insert_noun(&mut words, synonym, id);
                }
                for adjective in &item.adjectives {
                    words.entry(lower(adjective)).or_default().adjectives.insert(id.clone());
                }
            }
        }

        for direction in Direction::ALL {
            words.entry(direction.word().to_string()).or_default().direction = Some(direction);
        }

        for pronoun in [
            crate::ident::Pronoun::It,
            crate::ident::Pronoun::Them,
            crate::ident::Pronoun::Him,
            crate::ident::Pronoun::Her,
        ] {
            words.entry(pronoun.word().to_string()).or_default().pronoun = Some(pronoun);
        }

        for preposition in PREPOSITIONS {
            words.entry(preposition.to_string()).or_default().is_preposition = true;
        }

        for meta in META_TOKENS {
            words.entry(meta.to_string()).or_default().is_meta = true;
        }

        for entry in verbs {
            for word in &entry.words {
                words.entry(lower(word)).or_default().verbs.insert(entry.id.clone());
            }
        }

        words.retain(|_, roles| !roles.is_empty());
        Self { words }
    }

    fn insert_noun(words: &mut BTreeMap<String, WordRoles>, name: &str, id: &ItemId) {
        words.entry(lower(name)).or_default().nouns.insert(id.clone());
    }

    /// Looks up every role a lowercase word plays; empty if unknown.
    pub fn roles(&self, word: &str) -> WordRoles {
        self.words.get(&lower(word)).cloned().unwrap_or_default()
    }

    /// True if `word` matches nothing in the vocabulary at all.
    pub fn is_unknown(&self, word: &str) -> bool {
        !self.words.contains_key(&lower(word))
    }
}

fn lower(word: &str) -> String {
    word.to_ascii_lowercase()
}
