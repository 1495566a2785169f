/// A file the user sent, as Telegram refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file_id: String,
    pub file_name: String,
}

/// What an inbound update asks the relay to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Help,
    Online,
    Offline,
    Docs,
    Clear,
    Contexts,
    Question(String),
    Document(DocumentRef),
}

impl Action {
    /// Classify a text message. Exact command tokens map to commands
    /// (`/cmd@botname` included); anything else non-blank is a question.
    #[must_use]
    pub fn parse_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let command = text
            .split_once('@')
            .filter(|(cmd, bot)| cmd.starts_with('/') && !bot.is_empty() && !bot.contains(' '))
            .map_or(text, |(cmd, _)| cmd);

        Some(match command {
            "/start" => Self::Start,
            "/help" => Self::Help,
            "/online" => Self::Online,
            "/offline" => Self::Offline,
            "/docs" => Self::Docs,
            "/clear" => Self::Clear,
            "/contexts" => Self::Contexts,
            _ => Self::Question(text.to_string()),
        })
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Docs => "docs",
            Self::Clear => "clear",
            Self::Contexts => "contexts",
            Self::Question(_) => "question",
            Self::Document(_) => "document",
        }
    }
}

/// One update, reduced to what the relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: String,
    pub chat_id: i64,
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/start", Action::Start)]
    #[case("/help", Action::Help)]
    #[case("/online", Action::Online)]
    #[case("/offline", Action::Offline)]
    #[case("/docs", Action::Docs)]
    #[case("/clear", Action::Clear)]
    #[case("/contexts", Action::Contexts)]
    #[case("  /docs  ", Action::Docs)]
    #[case("/start@felis_bot", Action::Start)]
    fn recognizes_commands(#[case] text: &str, #[case] expected: Action) {
        assert_eq!(Action::parse_text(text), Some(expected));
    }

    #[rstest]
    #[case("What is X?")]
    #[case("/unknown")]
    #[case("/docs please")]
    #[case("/ONLINE")]
    #[case("mail me at a@b.c")]
    fn other_text_is_a_question(#[case] text: &str) {
        assert_eq!(
            Action::parse_text(text),
            Some(Action::Question(text.to_string()))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t")]
    fn blank_text_is_ignored(#[case] text: &str) {
        assert_eq!(Action::parse_text(text), None);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Action::Question("q".into()).kind(), "question");
        assert_eq!(
            Action::Document(DocumentRef {
                file_id: "f".into(),
                file_name: "a.pdf".into(),
            })
            .kind(),
            "document"
        );
    }
}
