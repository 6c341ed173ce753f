//! Opaque string-backed identifiers for every addressable thing in the world.
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Builds an id from any string-like value.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrows the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }
    };
}

string_id!(
    /// Identifier for an [`crate::value::ParentEntity`]-eligible item.
    ItemId
);
string_id!(
    /// Identifier for a location.
    LocationId
);
string_id!(
    /// Identifier for a fuse (one-shot countdown timer).
    FuseId
);
string_id!(
    /// Identifier for a daemon (recurring background process).
    DaemonId
);
string_id!(
    /// Identifier for a verb, as declared by a handler's syntax rules.
    VerbId
);
string_id!(
    /// Identifier for a boolean capability flag on an entity.
    FlagId
);
string_id!(
    /// Identifier for an entry in the global key/value bag.
    GlobalId
);
string_id!(
    /// Identifier for a game-specific, opaque per-entity attribute.
    AttributeId
);
string_id!(
    /// Identifier for an always-present abstract referent (sky, floor, water, ...).
    UniversalId
);
string_id!(
    /// Identifier for a player-facing message template in a [`crate::messenger::Messenger`] catalog.
    MessageId
);

/// A compass or relative direction recognised by the parser and location exits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// North.
    North,
    /// South.
    South,
    /// East.
    East,
    /// West.
    West,
    /// Northeast.
    Northeast,
    /// Northwest.
    Northwest,
    /// Southeast.
    Southeast,
    /// Southwest.
    Southwest,
    /// Up.
    Up,
    /// Down.
    Down,
    /// In (enter).
    In,
    /// Out (exit).
    Out,
}

impl Direction {
    /// All directions, in a fixed canonical order used for stable iteration.
    pub const ALL: [Direction; 12] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Up,
        Direction::Down,
        Direction::In,
        Direction::Out,
    ];

    /// The lowercase vocabulary word for this direction.
    pub fn word(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Northeast => "northeast",
            Direction::Northwest => "northwest",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Parses a direction from a lowercase vocabulary word, including common abbreviations.
    pub fn from_word(word: &str) -> Option<Direction> {
        match word {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            "northeast" | "ne" => Some(Direction::Northeast),
            "northwest" | "nw" => Some(Direction::Northwest),
            "southeast" | "se" => Some(Direction::Southeast),
            "southwest" | "sw" => Some(Direction::Southwest),
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// A pronoun the parser resolves against the most recently bound referent set.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Pronoun {
    /// "it" — singular, typically inanimate.
    It,
    /// "them" — plural.
    Them,
    /// "him" — singular, masculine.
    Him,
    /// "her" — singular, feminine.
    Her,
}

impl Pronoun {
    /// The lowercase vocabulary word for this pronoun.
    pub fn word(self) -> &'static str {
        match self {
            Pronoun::It => "it",
            Pronoun::Them => "them",
            Pronoun::Him => "him",
            Pronoun::Her => "her",
        }
    }

    /// Parses a pronoun from a lowercase vocabulary word.
    pub fn from_word(word: &str) -> Option<Pronoun> {
        match word {
            "it" => Some(Pronoun::It),
            "them" => Some(Pronoun::Them),
            "him" => Some(Pronoun::Him),
            "her" => Some(Pronoun::Her),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_id_round_trips_display_and_eq() {
        let a = ItemId::new("lamp");
        let b: ItemId = "lamp".into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "lamp");
        assert_eq!(a.as_str(), "lamp");
    }

    #[test]
    fn direction_word_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_word(dir.word()), Some(dir));
        }
    }

    #[test]
    fn direction_abbreviations_resolve() {
        assert_eq!(Direction::from_word("n"), Some(Direction::North));
        assert_eq!(Direction::from_word("sw"), Some(Direction::Southwest));
        assert_eq!(Direction::from_word("bogus"), None);
    }

    #[test]
    fn pronoun_word_round_trip() {
        for p in [Pronoun::It, Pronoun::Them, Pronoun::Him, Pronoun::Her] {
            assert_eq!(Pronoun::from_word(p.word()), Some(p));
        }
    }
}
