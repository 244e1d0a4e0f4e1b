//! Builds the completion request from persona, style samples and history.

use crate::gateway::Message;
use crate::memory::{Role, Turn};

const TARGET_PLACEHOLDER: &str = "{target}";

const DEFAULT_PERSONA: &str = "Ты — бот-копия пользователя @{target} в групповом чате друзей в Telegram.
Ты знаешь, что ты бот и копия этого человека, и можешь об этом шутить.

Твоя личность:
— Весёлый, находчивый, с отличным чувством юмора
— Пишешь кратко и по делу, не разводишь воду
— Любишь троллить друзей и подкалывать
— Не стесняешься в выражениях
— Общаешься как обычный чувак в чате с друзьями, НЕ как ассистент
— Никогда не говоришь \"как ассистент\", \"я не могу\", \"это неуместно\" и прочие канцелярские отмазки
— Если кто-то спрашивает, ты признаёшь что ты бот-копия @{target}

Важно:
— Отвечай КРАТКО, 1-3 предложения максимум, как в реальном чате
— Используй сленг, сокращения, пиши как живой человек
— Учись стилю общения от сообщений настоящего @{target} в чате
— Реагируй на контекст беседы, а не просто генери рандом
— Можешь использовать эмодзи, но не злоупотребляй
— Пиши на том языке, на котором идёт беседа";

/// Static persona instruction, parameterized only by the target handle.
///
/// The built-in text keeps the structure and tone rules of the persona the
/// bot shipped with but leaves out its explicit lines on swearing, no
/// censorship and crude jokes. Set `persona_prompt` in config to use
/// different wording.
#[derive(Debug, Clone)]
pub struct Persona {
    target: String,
    instruction: String,
}

impl Persona {
    pub fn new(target: &str) -> Self {
        Self::with_template(target, DEFAULT_PERSONA)
    }

    /// `{target}` in the template is replaced with the handle.
    pub fn with_template(target: &str, template: &str) -> Self {
        Self {
            target: target.to_string(),
            instruction: template.replace(TARGET_PLACEHOLDER, target),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Empty string when there are no samples.
pub fn style_block(target: &str, samples: &[String]) -> String {
    if samples.is_empty() {
        return String::new();
    }

    let examples = samples
        .iter()
        .map(|sample| format!("— {}", sample))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\n\nПримеры сообщений настоящего @{} (учись его стилю, копируй манеру):\n{}",
        target, examples
    )
}

/// One system block followed by history in insertion order. Turn contents
/// already carry the speaker prefix, so they are passed through verbatim.
pub fn compose(persona: &Persona, style_samples: &[String], history: &[Turn]) -> Vec<Message> {
    let system = format!(
        "{}{}",
        persona.instruction(),
        style_block(persona.target(), style_samples)
    );

    std::iter::once(Message::system(system))
        .chain(history.iter().map(|turn| match turn.role {
            Role::User => Message::user(turn.content.clone()),
            Role::Agent => Message::assistant(turn.content.clone()),
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MessageRole;

    #[test]
    fn persona_mentions_target() {
        let persona = Persona::new("yersh9");
        assert!(persona.instruction().contains("@yersh9"));
        assert!(!persona.instruction().contains(TARGET_PLACEHOLDER));
    }

    #[test]
    fn custom_template_is_substituted() {
        let persona = Persona::with_template("vasya", "You are {target}'s twin.");
        assert_eq!(persona.instruction(), "You are vasya's twin.");
    }

    #[test]
    fn no_samples_means_no_exemplar_section() {
        let persona = Persona::new("yersh9");
        let messages = compose(&persona, &[], &[]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, persona.instruction());
        assert!(!messages[0].content.contains("Примеры сообщений"));
    }

    #[test]
    fn samples_are_listed_in_insertion_order() {
        let persona = Persona::new("yersh9");
        let samples = vec!["первое".to_string(), "второе".to_string()];
        let messages = compose(&persona, &samples, &[]);

        let system = &messages[0].content;
        assert!(system.starts_with(persona.instruction()));
        assert!(system.contains("Примеры сообщений настоящего @yersh9"));
        let first = system.find("— первое").expect("first sample");
        let second = system.find("— второе").expect("second sample");
        assert!(first < second);
    }

    #[test]
    fn history_follows_system_block_with_roles() {
        let persona = Persona::new("yersh9");
        let history = vec![
            Turn::user("@petya: привет"),
            Turn::agent("здарова"),
            Turn::user("Masha: как дела"),
        ];
        let messages = compose(&persona, &[], &history);

        let tagged: Vec<(MessageRole, &str)> = messages[1..]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (MessageRole::User, "@petya: привет"),
                (MessageRole::Assistant, "здарова"),
                (MessageRole::User, "Masha: как дела"),
            ]
        );
    }
}
