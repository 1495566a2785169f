//! Fixed texts the relay sends to users.
//!
//! Failures are translated into a [`Notice`] at the flow boundary; the
//! underlying error only goes to the log.

use std::fmt::Write as _;

use felis_common::Mode;

pub const START_TEXT: &str = "🐾 Hi! I'm Felis, your document assistant.\n\n\
Send me a document (PDF, TXT, DOCX) and then ask questions about it.\n\n\
Commands:\n\
/help - show help\n\
/docs - list your documents\n\
/clear - delete all your documents\n\
/online - answer without documents\n\
/offline - answer from your documents\n\
/contexts - show sources for the last answer";

pub const HELP_TEXT: &str = "📖 How to use Felis:\n\n\
1. Send a document (PDF, TXT, DOCX)\n\
2. Ask a question about its content\n\
3. Get an answer based on your documents\n\n\
Commands:\n\
/docs - list your documents\n\
/clear - delete all your documents\n\
/online - switch to online mode (general answers)\n\
/offline - switch to offline mode (answers from your documents)\n\
/contexts - show sources for the last answer";

/// Commands registered with Telegram for client autocomplete.
pub const COMMANDS: &[(&str, &str)] = &[
    ("start", "Start the bot"),
    ("help", "Show help"),
    ("docs", "List your documents"),
    ("clear", "Delete all your documents"),
    ("online", "Answer without documents"),
    ("offline", "Answer from your documents"),
    ("contexts", "Show sources for the last answer"),
];

/// User-facing notices with fixed wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Acknowledgment sent while a retrieval query runs.
    Searching,
    StillProcessing,
    FileFetchFailed,
    DownloadFailed,
    UploadFailed,
    QueryFailed,
    /// The backend answered, but with nothing.
    NoAnswer,
    ModeSwitchFailed,
    ListDocumentsFailed,
    ClearDocumentsFailed,
    NoDocuments,
    DocumentsCleared,
    NoRecentAnswer,
    NoSources,
    Generic,
}

impl Notice {
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Searching => "🔎 Looking through your documents...",
            Self::StillProcessing => {
                "⏳ Still working on your previous question. Please wait for the answer."
            },
            Self::FileFetchFailed => "❌ Failed to get the file. Please try sending it again.",
            Self::DownloadFailed => "❌ Failed to download the file content. Please try again.",
            Self::UploadFailed => {
                "❌ Could not process the document. Check the file format and try again."
            },
            Self::QueryFailed => "❌ Could not get an answer right now. Please try again later.",
            Self::NoAnswer => "🤔 I couldn't answer that. Please try rephrasing the question.",
            Self::ModeSwitchFailed => "❌ Failed to switch mode. Please try again.",
            Self::ListDocumentsFailed => "❌ Failed to load your documents.",
            Self::ClearDocumentsFailed => "❌ Failed to delete your documents.",
            Self::NoDocuments => "📭 You have no documents yet. Send me one to get started.",
            Self::DocumentsCleared => "🗑 All your documents have been deleted.",
            Self::NoRecentAnswer => "ℹ️ There is no recent answer. Ask a question first.",
            Self::NoSources => "ℹ️ The last answer has no sources to show.",
            Self::Generic => "❌ Something went wrong. Please try again later.",
        }
    }
}

#[must_use]
pub fn mode_switched(mode: Mode) -> &'static str {
    match mode {
        Mode::Online => "🌐 Online mode on: I'll answer without using your documents.",
        Mode::Offline => "📚 Offline mode on: I'll answer from your documents.",
    }
}

#[must_use]
pub fn document_uploaded(doc_id: &str) -> String {
    format!("✅ Document uploaded (id: {doc_id}). You can ask questions about it now.")
}

/// Numbered list of document titles. Callers handle the empty case.
#[must_use]
pub fn document_list(titles: &[String]) -> String {
    let mut out = String::from("📄 Your documents:\n");
    for (i, title) in titles.iter().enumerate() {
        let _ = write!(out, "\n{}. {title}", i + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_list_is_numbered() {
        let titles = vec!["a.pdf".to_string(), "b.txt".to_string()];
        assert_eq!(
            document_list(&titles),
            "📄 Your documents:\n\n1. a.pdf\n2. b.txt"
        );
    }

    #[test]
    fn command_list_covers_every_command_in_help() {
        for (command, _) in COMMANDS.iter().filter(|(c, _)| *c != "start" && *c != "help") {
            assert!(HELP_TEXT.contains(&format!("/{command}")), "{command}");
        }
    }

    #[test]
    fn mode_texts_differ() {
        assert_ne!(mode_switched(Mode::Online), mode_switched(Mode::Offline));
    }
}
