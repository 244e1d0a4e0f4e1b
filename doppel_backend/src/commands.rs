//! Chat commands: `/start`, `/reset`, `/chance [value]`.

use crate::engine::Doppel;
use crate::memory::{ChanceUpdate, ConversationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Chance(Option<String>),
}

pub enum CommandOutcome {
    Handled { reply: String },

    /// Not a command, or a command for another bot / one we don't know.
    Unhandled,
}

/// `/name@bot args...`. A command addressed to a different bot is ignored.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let mut parts = text.trim().split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;

    let name = match head.split_once('@') {
        Some((name, addressee)) => {
            if !addressee.eq_ignore_ascii_case(bot_username) {
                return None;
            }
            name
        }
        None => head,
    };

    match name.to_lowercase().as_str() {
        "start" => Some(Command::Start),
        "reset" => Some(Command::Reset),
        "chance" => Some(Command::Chance(parts.next().map(str::to_string))),
        _ => None,
    }
}

const MAX_COMMAND_LEN: usize = 32;

fn is_command_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True when the first word is a bot command token: `/` followed by 1-32
/// ASCII letters, digits or underscores, optionally `@botname`. Commands
/// never enter history; "/привет" or a bare "/" is ordinary chat text.
pub fn is_command(text: &str) -> bool {
    let Some(head) = text.split_whitespace().next() else {
        return false;
    };
    if !text.starts_with('/') {
        return false;
    }

    let (name, addressee) = match head[1..].split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (&head[1..], None),
    };

    let name_ok = (1..=MAX_COMMAND_LEN).contains(&name.len()) && name.chars().all(is_command_char);
    let addressee_ok = addressee
        .map(|bot| !bot.is_empty() && bot.chars().all(is_command_char))
        .unwrap_or(true);
    name_ok && addressee_ok
}

fn percent(value: f64) -> i64 {
    (value * 100.0) as i64
}

pub fn execute(doppel: &Doppel, chat: ConversationId, command: Command) -> String {
    match command {
        Command::Start => format!(
            "Йо, я бот-копия @{}. Добавь меня в чат и я буду вести себя как этот чёрт 😈",
            doppel.target().handle
        ),
        Command::Reset => {
            doppel.reset_memory(chat);
            "Память стёрта, начинаем с чистого листа 🧹".to_string()
        }
        Command::Chance(arg) => {
            let update = match arg {
                Some(raw) => doppel.set_chance(&raw),
                None => ChanceUpdate::Rejected {
                    current: doppel.chance(),
                },
            };
            match update {
                ChanceUpdate::Applied(value) => format!("Шанс ответа: {}%", percent(value)),
                ChanceUpdate::Rejected { current } => format!(
                    "Текущий шанс ответа: {}%\nИспользуй: /chance 0.5 (от 0 до 1)",
                    percent(current)
                ),
            }
        }
    }
}

pub fn handle_command(
    doppel: &Doppel,
    chat: ConversationId,
    text: &str,
    bot_username: &str,
) -> CommandOutcome {
    match parse_command(text, bot_username) {
        Some(command) => CommandOutcome::Handled {
            reply: execute(doppel, chat, command),
        },
        None => CommandOutcome::Unhandled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::gateway::tests::ScriptedProvider;
    use crate::memory::Turn;
    use crate::random::ThreadRandom;
    use std::sync::Arc;

    const CHAT: ConversationId = ConversationId(5);

    fn doppel() -> Doppel {
        Doppel::new(
            &BotConfig::default(),
            Arc::new(ScriptedProvider::new(vec![])),
            Arc::new(ThreadRandom),
        )
    }

    fn reply(doppel: &Doppel, text: &str) -> Option<String> {
        match handle_command(doppel, CHAT, text, "doppel_bot") {
            CommandOutcome::Handled { reply } => Some(reply),
            CommandOutcome::Unhandled => None,
        }
    }

    #[test]
    fn parses_names_args_and_addressee() {
        assert_eq!(parse_command("/start", "doppel_bot"), Some(Command::Start));
        assert_eq!(parse_command("/Reset@Doppel_Bot", "doppel_bot"), Some(Command::Reset));
        assert_eq!(
            parse_command("/chance 0.5 extra", "doppel_bot"),
            Some(Command::Chance(Some("0.5".to_string())))
        );
        assert_eq!(parse_command("/chance", "doppel_bot"), Some(Command::Chance(None)));
        assert_eq!(parse_command("/reset@other_bot", "doppel_bot"), None);
        assert_eq!(parse_command("/weather", "doppel_bot"), None);
        assert_eq!(parse_command("reset", "doppel_bot"), None);
    }

    #[test]
    fn only_command_tokens_count_as_commands() {
        assert!(is_command("/start"));
        assert!(is_command("/chance 0.5"));
        assert!(is_command("/reset@doppel_bot"));
        assert!(is_command("/weather tomorrow"));

        assert!(!is_command("/привет ребят"));
        assert!(!is_command("/ ну и ладно"));
        assert!(!is_command("/"));
        assert!(!is_command("/reset@"));
        assert!(!is_command("ну /start"));
        assert!(!is_command(&format!("/{}", "a".repeat(33))));
    }

    #[test]
    fn slash_chat_text_is_recorded_as_a_turn() {
        let doppel = doppel();
        let text = "/привет ребят";
        assert!(!is_command(text));

        let message = crate::trigger::InboundMessage {
            conversation_id: CHAT,
            text: Some(text.to_string()),
            author: crate::trigger::Author {
                username: Some("yersh9".to_string()),
                first_name: None,
            },
            is_reply_to_bot: false,
        };
        doppel.observe(&message, "doppel_bot");

        assert_eq!(
            doppel.memory().history(CHAT),
            vec![Turn::user("@yersh9: /привет ребят")]
        );
        assert_eq!(doppel.memory().style_samples(CHAT), vec![text.to_string()]);
    }

    #[test]
    fn start_introduces_target() {
        let reply = reply(&doppel(), "/start").unwrap();
        assert!(reply.contains("@yersh9"));
    }

    #[test]
    fn reset_clears_history_only() {
        let doppel = doppel();
        doppel.memory().record_turn(CHAT, Turn::user("@a: b"));
        doppel.memory().record_style_sample(CHAT, "b");

        let reply = reply(&doppel, "/reset").unwrap();
        assert!(reply.starts_with("Память стёрта"));
        assert!(doppel.memory().history(CHAT).is_empty());
        assert_eq!(doppel.memory().style_samples(CHAT).len(), 1);
    }

    #[test]
    fn chance_reports_new_value() {
        let doppel = doppel();
        assert_eq!(reply(&doppel, "/chance 0.5").unwrap(), "Шанс ответа: 50%");
        assert_eq!(doppel.chance(), 0.5);
    }

    #[test]
    fn invalid_chance_reports_current_value_and_usage() {
        let doppel = doppel();
        for text in ["/chance 1.5", "/chance abc", "/chance"] {
            let reply = reply(&doppel, text).unwrap();
            assert_eq!(
                reply,
                "Текущий шанс ответа: 30%\nИспользуй: /chance 0.5 (от 0 до 1)"
            );
        }
        assert_eq!(doppel.chance(), 0.3);
    }

    #[test]
    fn percent_truncates() {
        assert_eq!(percent(0.999), 99);
        assert_eq!(percent(1.0), 100);
        assert_eq!(percent(0.0), 0);
    }
}
