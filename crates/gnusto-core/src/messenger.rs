//! Player-facing text catalog: the engine never hard-codes player-visible
//! text. Handlers call a [`Messenger`] with a semantic
//! [`MessageId`] and arguments; the catalog maps ids to templates.
use std::collections::HashMap;

use crate::ident::{Direction, MessageId};

/// One argument to a message template, substituted positionally for each
/// `{}` placeholder in the stored template, in order.
#[derive(Clone, Debug)]
pub enum MessageArg {
    /// A ready-to-print noun phrase (e.g. "the brass lamp").
    Text(String),
    /// A direction, rendered as its vocabulary word.
    Direction(Direction),
    /// A bare integer (score, count, turn number).
    Count(i64),
}

impl MessageArg {
    fn render(&self) -> String {
        match self {
            MessageArg::Text(s) => s.clone(),
            MessageArg::Direction(d) => d.word().to_string(),
            MessageArg::Count(n) => n.to_string(),
        }
    }
}

/// Prefixes `name` with "a" or "an" by its leading sound, the common-case
/// English rule (no attempt at exceptions like "an hour").
pub fn with_article(name: &str) -> String {
    match name.chars().next() {
        Some(c) if "aeiouAEIOU".contains(c) => format!("an {name}"),
        Some(_) => format!("a {name}"),
        None => name.to_string(),
    }
}

/// A replaceable catalog mapping semantic message ids to player-facing text.
/// A game re-voices or localizes responses by building its own catalog
/// rather than subclassing the engine's.
pub trait Messenger {
    /// Renders the template registered for `id`, substituting `args` in
    /// order for each `{}` placeholder. An unregistered id renders as the id
    /// itself in brackets, so a missing message is visible, not silent.
    fn render(&self, id: &MessageId, args: &[MessageArg]) -> String;
}

/// A [`Messenger`] backed by a flat `MessageId -> template` map.
pub struct CatalogMessenger {
    catalog: HashMap<MessageId, String>,
}

impl CatalogMessenger {
    /// Builds a messenger from an explicit catalog, replacing nothing.
    pub fn new(catalog: HashMap<MessageId, String>) -> Self {
        Self { catalog }
    }

    /// Builds a messenger from [`default_catalog`].
    pub fn with_defaults() -> Self {
        Self::new(default_catalog())
    }

    /// Overrides (or adds) one template, for a game re-voicing a single message.
    pub fn set(&mut self, id: MessageId, template: impl Into<String>) {
        self.catalog.insert(id, template.into());
    }
}

impl Messenger for CatalogMessenger {
    fn render(&self, id: &MessageId, args: &[MessageArg]) -> String {
        let Some(template) = self.catalog.get(id) else {
            return format!("[{id}]");
        };
        let mut rendered = String::with_capacity(template.len());
        let mut args = args.iter();
        let mut rest = template.as_str();
        while let Some(position) = rest.find("{}") {
            rendered.push_str(&rest[..position]);
            match args.next() {
                Some(arg) => rendered.push_str(&arg.render()),
                None => rendered.push_str("{}"),
            }
            rest = &rest[position + 2..];
        }
        rendered.push_str(rest);
        rendered
    }
}

macro_rules! message_ids {
    ($($(#[$meta:meta])* $fn_name:ident => $id:literal),+ $(,)?) => {
        impl MessageId {
            $(
                $(#[$meta])*
                pub fn $fn_name() -> MessageId {
                    MessageId::new($id)
                }
            )+
        }
    };
}

message_ids! {
    /// "Taken." after a successful take.
    taken => "taken",
    /// A take on a fixed (non-takable) item.
    cannot_take_fixed => "cannot-take-fixed",
    /// "Dropped." after a successful drop.
    dropped => "dropped",
    /// After opening a container.
    opened => "opened",
    /// After closing a container.
    closed => "closed",
    /// The target container is already open.
    already_open => "already-open",
    /// The target container is already closed.
    already_closed => "already-closed",
    /// The target container is closed and must be opened first.
    container_closed => "container-closed",
    /// The target container has no room left.
    container_full => "container-full",
    /// The target is locked.
    locked => "locked",
    /// A key was supplied but does not fit.
    wrong_key => "wrong-key",
    /// The item cannot be worn.
    not_wearable => "not-wearable",
    /// The item is not currently held.
    not_held => "not-held",
    /// The player's inventory is full.
    player_cannot_carry_more => "player-cannot-carry-more",
    /// The current location is dark.
    room_is_dark => "room-is-dark",
    /// Movement in a direction is blocked.
    blocked_direction => "blocked-direction",
    /// A handler-declared prerequisite failed, with no more specific message.
    prerequisite_not_met => "prerequisite-not-met",
    /// The inventory listing's header line.
    inventory_header => "inventory-header",
    /// The inventory is empty.
    inventory_empty => "inventory-empty",
    /// The current score report.
    score_report => "score-report",
    /// A turn spent doing nothing.
    time_passes => "time-passes",
    /// Printed once a quit is confirmed.
    farewell => "farewell",
    /// A save request succeeded.
    game_saved => "game-saved",
    /// A restore request succeeded.
    game_restored => "game-restored",
    /// Generic catch-all when no handler matched.
    dont_understand => "dont-understand",
    /// A noun phrase named nothing in scope.
    dont_see_that => "dont-see-that",
    /// A noun phrase matched more than one in-scope entity; takes one
    /// [`MessageArg::Text`] listing the candidates by qualified name.
    be_more_specific => "be-more-specific",
    /// A pronoun was used with no prior referent bound.
    nothing_to_refer_to => "nothing-to-refer-to",
    /// The token sequence did not match any known grammar shape.
    garbled => "garbled",
    /// An internal engine failure; shown instead of leaking detail to the player.
    internal_apology => "internal-apology",
}

/// The engine's built-in English templates, overridable per-message via
/// [`CatalogMessenger::set`].
pub fn default_catalog() -> HashMap<MessageId, String> {
    HashMap::from([
        (MessageId::taken(), "Taken.".to_string()),
        (MessageId::cannot_take_fixed(), "That's fixed in place.".to_string()),
        (MessageId::dropped(), "Dropped.".to_string()),
        (MessageId::opened(), "Opened.".to_string()),
        (MessageId::closed(), "Closed.".to_string()),
        (MessageId::already_open(), "That's already open.".to_string()),
        (MessageId::already_closed(), "That's already closed.".to_string()),
        (
            MessageId::container_closed(),
            "You'll have to open that first.".to_string(),
        ),
        (MessageId::container_full(), "There's no more room in there.".to_string()),
        (MessageId::locked(), "{} is locked.".to_string()),
        (MessageId::wrong_key(), "That key doesn't fit.".to_string()),
        (MessageId::not_wearable(), "You can't wear that.".to_string()),
        (MessageId::not_held(), "You aren't holding that.".to_string()),
        (
            MessageId::player_cannot_carry_more(),
            "Your hands are full.".to_string(),
        ),
        (MessageId::room_is_dark(), "It is pitch black. You are likely to be eaten by a grue.".to_string()),
        (MessageId::blocked_direction(), "You can't go that way.".to_string()),
        (MessageId::prerequisite_not_met(), "You can't do that right now.".to_string()),
        (MessageId::inventory_header(), "You are carrying:".to_string()),
        (MessageId::inventory_empty(), "You are empty-handed.".to_string()),
        (MessageId::score_report(), "Your score is {} in {} moves.".to_string()),
        (MessageId::time_passes(), "Time passes.".to_string()),
        (MessageId::farewell(), "Thanks for playing.".to_string()),
        (MessageId::game_saved(), "Saved.".to_string()),
        (MessageId::game_restored(), "Restored.".to_string()),
        (MessageId::dont_understand(), "I don't understand that.".to_string()),
        (MessageId::dont_see_that(), "You don't see {} here.".to_string()),
        (MessageId::be_more_specific(), "Which do you mean: {}?".to_string()),
        (MessageId::nothing_to_refer_to(), "I don't know what you're referring to.".to_string()),
        (MessageId::garbled(), "I didn't understand that sentence.".to_string()),
        (MessageId::internal_apology(), "Something went wrong and that didn't work.".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_args_substitute_in_order() {
        let messenger = CatalogMessenger::with_defaults();
        let text = messenger.render(
            &MessageId::score_report(),
            &[MessageArg::Count(10), MessageArg::Count(4)],
        );
        assert_eq!(text, "Your score is 10 in 4 moves.");
    }

    #[test]
    fn unregistered_id_renders_visibly_instead_of_silently() {
        let messenger = CatalogMessenger::with_defaults();
        let text = messenger.render(&MessageId::new("no-such-message"), &[]);
        assert_eq!(text, "[no-such-message]");
    }

    #[test]
    fn a_game_can_override_a_single_template() {
        let mut messenger = CatalogMessenger::with_defaults();
        messenger.set(MessageId::taken(), "Got it.");
        assert_eq!(messenger.render(&MessageId::taken(), &[]), "Got it.");
        assert_eq!(messenger.render(&MessageId::dropped(), &[]), "Dropped.");
    }

    #[test]
    fn article_picks_an_before_vowel_sounds() {
        assert_eq!(with_article("lamp"), "a lamp");
        assert_eq!(with_article("apple"), "an apple");
    }
}
