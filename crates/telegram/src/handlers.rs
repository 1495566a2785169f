use std::{future::Future, sync::Arc, time::Duration};

use {
    felis_common::Mode,
    felis_qna::QnaBackend,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    config::RelaySettings,
    format::{format_response, truncate_chars},
    replies::{self, Notice},
    state::UserStateStore,
    transport::{ChatTransport, RenderMode},
    update::{Action, DocumentRef, Inbound},
};

/// Routes one inbound update through the matching flow.
///
/// Every flow reports its own failures to the chat and logs the cause;
/// nothing is propagated back to the dispatcher.
pub struct Relay {
    transport: Arc<dyn ChatTransport>,
    backend: Arc<dyn QnaBackend>,
    store: Arc<UserStateStore>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        backend: Arc<dyn QnaBackend>,
        store: Arc<UserStateStore>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            transport,
            backend,
            store,
            settings,
        }
    }

    pub async fn handle(&self, inbound: Inbound) {
        let Inbound {
            user_id,
            chat_id,
            action,
        } = inbound;
        self.store.observe(&user_id);
        debug!(user_id, chat_id, kind = action.kind(), "handling update");

        match action {
            Action::Start => self.send(chat_id, replies::START_TEXT, RenderMode::Plain).await,
            Action::Help => self.send(chat_id, replies::HELP_TEXT, RenderMode::Plain).await,
            Action::Online => self.handle_set_mode(&user_id, chat_id, Mode::Online).await,
            Action::Offline => self.handle_set_mode(&user_id, chat_id, Mode::Offline).await,
            Action::Docs => self.handle_list_documents(&user_id, chat_id).await,
            Action::Clear => self.handle_clear_documents(&user_id, chat_id).await,
            Action::Contexts => self.handle_contexts(&user_id, chat_id).await,
            Action::Document(doc) => self.handle_document(&user_id, chat_id, &doc).await,
            Action::Question(question) => match self.store.mode(&user_id) {
                Mode::Online => self.handle_direct_question(&user_id, chat_id, &question).await,
                Mode::Offline => self.handle_question(&user_id, chat_id, &question).await,
            },
        }
    }

    /// Tell the chat that its update could not be handled. Used when a flow
    /// died before it could report anything itself.
    pub async fn report_fault(&self, chat_id: i64) {
        self.send_notice(chat_id, Notice::Generic).await;
    }

    async fn handle_document(&self, user_id: &str, chat_id: i64, doc: &DocumentRef) {
        info!(user_id, chat_id, file_name = %doc.file_name, "received document");

        // The resolved URL embeds the bot token; keep it out of logs.
        let url = match self.transport.resolve_file_url(&doc.file_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "failed to resolve file url");
                self.send_notice(chat_id, Notice::FileFetchFailed).await;
                return;
            },
        };

        let data = match self.transport.download(&url).await {
            Ok(data) => data,
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "failed to download file");
                self.send_notice(chat_id, Notice::DownloadFailed).await;
                return;
            },
        };

        let size = data.len();
        let deadline = self.settings.timeouts.upload;
        let upload = self
            .backend
            .upload_document(user_id, &doc.file_name, data, deadline);
        match with_deadline("upload_document", deadline, upload).await {
            Ok(doc_id) => {
                info!(user_id, chat_id, doc_id = %doc_id, size, "document uploaded");
                self.send(chat_id, &replies::document_uploaded(&doc_id), RenderMode::Plain)
                    .await;
            },
            Err(e) => {
                warn!(user_id, chat_id, size, error = %e, "document upload failed");
                self.send_notice(chat_id, Notice::UploadFailed).await;
            },
        }
    }

    async fn handle_question(&self, user_id: &str, chat_id: i64, question: &str) {
        let Some(_guard) = self.store.try_begin_query(user_id) else {
            info!(user_id, chat_id, "query rejected: previous query still in flight");
            self.send_notice(chat_id, Notice::StillProcessing).await;
            return;
        };
        info!(user_id, chat_id, question_len = question.len(), "processing question");

        let ack = match self
            .transport
            .send_text(chat_id, Notice::Searching.text(), RenderMode::Plain)
            .await
        {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "failed to send acknowledgment");
                None
            },
        };

        let deadline = self.settings.timeouts.query;
        let query = self
            .backend
            .query(user_id, question, self.settings.top_k, deadline);
        let result = match with_deadline("query", deadline, query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(user_id, chat_id, timed_out = e.is_timeout(), error = %e, "query failed");
                self.deliver(chat_id, ack, Notice::QueryFailed.text(), RenderMode::Plain)
                    .await;
                return;
            },
        };

        let text = format_response(&result, false, self.settings.format);
        info!(
            user_id,
            chat_id,
            answer_len = result.answer.len(),
            contexts = result.contexts.len(),
            "query answered"
        );
        self.store.remember_result(user_id, result);

        if text.is_empty() {
            self.deliver(chat_id, ack, Notice::NoAnswer.text(), RenderMode::Plain)
                .await;
        } else {
            self.deliver(chat_id, ack, &text, RenderMode::Html).await;
        }
    }

    async fn handle_direct_question(&self, user_id: &str, chat_id: i64, question: &str) {
        info!(user_id, chat_id, question_len = question.len(), "processing direct question");

        let deadline = self.settings.timeouts.direct;
        let query = self.backend.direct_query(question, deadline);
        match with_deadline("direct_query", deadline, query).await {
            Ok(answer) if !answer.trim().is_empty() => {
                let answer = truncate_chars(answer.trim(), self.settings.format.max_message_chars);
                self.send(chat_id, answer, RenderMode::Plain).await;
            },
            Ok(_) => {
                info!(user_id, chat_id, "direct query returned an empty answer");
                self.send_notice(chat_id, Notice::NoAnswer).await;
            },
            Err(e) => {
                warn!(user_id, chat_id, timed_out = e.is_timeout(), error = %e, "direct query failed");
                self.send_notice(chat_id, Notice::QueryFailed).await;
            },
        }
    }

    async fn handle_set_mode(&self, user_id: &str, chat_id: i64, mode: Mode) {
        let deadline = self.settings.timeouts.admin;
        let call = self.backend.set_mode(mode, deadline);
        match with_deadline("set_mode", deadline, call).await {
            Ok(()) => {
                self.store.set_mode(user_id, mode);
                info!(user_id, chat_id, %mode, "mode switched");
                self.send(chat_id, replies::mode_switched(mode), RenderMode::Plain)
                    .await;
            },
            Err(e) => {
                warn!(user_id, chat_id, %mode, error = %e, "mode switch failed");
                self.send_notice(chat_id, Notice::ModeSwitchFailed).await;
            },
        }
    }

    async fn handle_list_documents(&self, user_id: &str, chat_id: i64) {
        let deadline = self.settings.timeouts.admin;
        let call = self.backend.list_documents(user_id, deadline);
        match with_deadline("list_documents", deadline, call).await {
            Ok(titles) if titles.is_empty() => self.send_notice(chat_id, Notice::NoDocuments).await,
            Ok(titles) => {
                let list = replies::document_list(&titles);
                let list = truncate_chars(&list, self.settings.format.max_message_chars);
                self.send(chat_id, list, RenderMode::Plain).await;
            },
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "listing documents failed");
                self.send_notice(chat_id, Notice::ListDocumentsFailed).await;
            },
        }
    }

    async fn handle_clear_documents(&self, user_id: &str, chat_id: i64) {
        let deadline = self.settings.timeouts.admin;
        let call = self.backend.clear_documents(user_id, deadline);
        match with_deadline("clear_documents", deadline, call).await {
            Ok(()) => {
                // Sources of the remembered answer are gone with the documents.
                self.store.forget_result(user_id);
                info!(user_id, chat_id, "documents cleared");
                self.send_notice(chat_id, Notice::DocumentsCleared).await;
            },
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "clearing documents failed");
                self.send_notice(chat_id, Notice::ClearDocumentsFailed).await;
            },
        }
    }

    async fn handle_contexts(&self, user_id: &str, chat_id: i64) {
        match self.store.last_result(user_id) {
            None => self.send_notice(chat_id, Notice::NoRecentAnswer).await,
            Some(result) if result.contexts.is_empty() => {
                self.send_notice(chat_id, Notice::NoSources).await;
            },
            Some(result) => {
                let text = format_response(&result, true, self.settings.format);
                self.send(chat_id, &text, RenderMode::Html).await;
            },
        }
    }

    /// Edit the acknowledgment when there is one, otherwise send anew.
    async fn deliver(&self, chat_id: i64, ack: Option<i32>, text: &str, render: RenderMode) {
        if let Some(message_id) = ack {
            match self
                .transport
                .edit_text(chat_id, message_id, text, render)
                .await
            {
                Ok(()) => return,
                Err(e) => {
                    warn!(chat_id, message_id, error = %e, "failed to edit acknowledgment, sending new message");
                },
            }
        }
        self.send(chat_id, text, render).await;
    }

    async fn send_notice(&self, chat_id: i64, notice: Notice) {
        self.send(chat_id, notice.text(), RenderMode::Plain).await;
    }

    async fn send(&self, chat_id: i64, text: &str, render: RenderMode) {
        if let Err(e) = self.transport.send_text(chat_id, text, render).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }
}

/// Run a backend call under `deadline`, independent of whether the backend
/// honors the deadline it was handed.
async fn with_deadline<T>(
    operation: &'static str,
    deadline: Duration,
    call: impl Future<Output = felis_qna::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout {
            operation,
            timeout_ms: deadline.as_millis(),
        }),
    }
}
