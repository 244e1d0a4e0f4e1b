//! Decides whether the bot speaks on an incoming message.

use serde::{Deserialize, Serialize};

use crate::memory::ConversationId;
use crate::random::RandomSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Author {
    /// `@username` when present, else the first name, else empty.
    pub fn display_name(&self) -> String {
        match self.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => format!("@{}", username),
            None => self.first_name.clone().unwrap_or_default(),
        }
    }

    pub fn is(&self, handle: &str) -> bool {
        match self.username.as_deref() {
            Some(username) if !username.is_empty() => username.to_lowercase() == handle.to_lowercase(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    pub text: Option<String>,
    pub author: Author,
    pub is_reply_to_bot: bool,
}

impl InboundMessage {
    /// Text content, treating an empty string as absent.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// The impersonated person: their handle plus the nicknames friends use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetIdentity {
    pub handle: String,
    pub nicknames: Vec<String>,
}

impl TargetIdentity {
    pub fn new(handle: impl Into<String>, nicknames: Vec<String>) -> Self {
        Self {
            handle: handle.into(),
            nicknames,
        }
    }

    fn mentioned_in(&self, lowered: &str) -> bool {
        std::iter::once(&self.handle)
            .chain(self.nicknames.iter())
            .map(|token| token.to_lowercase())
            .any(|token| !token.is_empty() && lowered.contains(&token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Mention,
    ReplyToBot,
    TargetMentioned,
    Chance,
}

/// First matching rule wins; only the final rule consumes randomness.
pub fn evaluate(
    message: &InboundMessage,
    bot_username: &str,
    target: &TargetIdentity,
    chance: f64,
    rng: &dyn RandomSource,
) -> Option<TriggerReason> {
    let text = message.text()?.to_lowercase();

    if !bot_username.is_empty() && text.contains(&format!("@{}", bot_username.to_lowercase())) {
        return Some(TriggerReason::Mention);
    }

    if message.is_reply_to_bot {
        return Some(TriggerReason::ReplyToBot);
    }

    if target.mentioned_in(&text) {
        return Some(TriggerReason::TargetMentioned);
    }

    (rng.next_f64() < chance).then_some(TriggerReason::Chance)
}

pub fn should_respond(
    message: &InboundMessage,
    bot_username: &str,
    target: &TargetIdentity,
    chance: f64,
    rng: &dyn RandomSource,
) -> bool {
    evaluate(message, bot_username, target, chance, rng).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{FixedRandom, ThreadRandom};

    const NEVER: FixedRandom = FixedRandom {
        value: 0.999,
        index: 0,
    };

    fn target() -> TargetIdentity {
        TargetIdentity::new("yersh9", vec!["ерш".to_string(), "yersh".to_string()])
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            conversation_id: ConversationId(7),
            text: Some(text.to_string()),
            author: Author {
                username: Some("petya".to_string()),
                first_name: Some("Petya".to_string()),
            },
            is_reply_to_bot: false,
        }
    }

    #[test]
    fn missing_or_empty_text_never_triggers() {
        let mut msg = message("");
        msg.is_reply_to_bot = true;
        assert!(!should_respond(&msg, "fooBot", &target(), 1.0, &ThreadRandom));

        msg.text = None;
        assert!(!should_respond(&msg, "fooBot", &target(), 1.0, &ThreadRandom));
    }

    #[test]
    fn bot_mention_is_case_insensitive() {
        let msg = message("hey @FooBot what's up");
        assert_eq!(
            evaluate(&msg, "fooBot", &target(), 0.0, &NEVER),
            Some(TriggerReason::Mention)
        );
    }

    #[test]
    fn empty_bot_username_does_not_match_bare_at() {
        let msg = message("mail me @ home");
        assert!(!should_respond(&msg, "", &target(), 0.0, &NEVER));
    }

    #[test]
    fn reply_to_bot_triggers_regardless_of_text() {
        let mut msg = message("unrelated stuff");
        msg.is_reply_to_bot = true;
        assert_eq!(
            evaluate(&msg, "fooBot", &target(), 0.0, &NEVER),
            Some(TriggerReason::ReplyToBot)
        );
    }

    #[test]
    fn target_handle_and_nicknames_trigger() {
        for text in ["where is YERSH9", "Ерш, ты где?", "yersh come here"] {
            assert_eq!(
                evaluate(&message(text), "fooBot", &target(), 0.0, &NEVER),
                Some(TriggerReason::TargetMentioned),
                "{text}"
            );
        }
    }

    #[test]
    fn empty_nickname_never_matches() {
        let target = TargetIdentity::new("yersh9", vec![String::new()]);
        assert!(!should_respond(&message("anything"), "fooBot", &target, 0.0, &NEVER));
    }

    #[test]
    fn zero_chance_never_fires() {
        let msg = message("just chatting");
        for _ in 0..1000 {
            assert!(!should_respond(&msg, "fooBot", &target(), 0.0, &ThreadRandom));
        }
    }

    #[test]
    fn full_chance_always_fires() {
        let msg = message("just chatting");
        for _ in 0..1000 {
            assert_eq!(
                evaluate(&msg, "fooBot", &target(), 1.0, &ThreadRandom),
                Some(TriggerReason::Chance)
            );
        }
    }

    #[test]
    fn chance_compares_against_sample() {
        let msg = message("just chatting");
        let low = FixedRandom {
            value: 0.2,
            index: 0,
        };
        assert!(should_respond(&msg, "fooBot", &target(), 0.3, &low));
        assert!(!should_respond(&msg, "fooBot", &target(), 0.2, &low));
    }

    #[test]
    fn display_name_prefers_username() {
        let author = Author {
            username: Some("petya".to_string()),
            first_name: Some("Petya".to_string()),
        };
        assert_eq!(author.display_name(), "@petya");

        let author = Author {
            username: None,
            first_name: Some("Petya".to_string()),
        };
        assert_eq!(author.display_name(), "Petya");
        assert_eq!(Author::default().display_name(), "");
    }

    #[test]
    fn author_match_is_case_insensitive_and_needs_username() {
        let author = Author {
            username: Some("Yersh9".to_string()),
            first_name: None,
        };
        assert!(author.is("yersh9"));
        assert!(!author.is("yersh"));

        let anonymous = Author {
            username: None,
            first_name: Some("yersh9".to_string()),
        };
        assert!(!anonymous.is("yersh9"));
    }
}
