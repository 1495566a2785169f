//! In-memory doubles for the relay's collaborators.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    felis_common::Mode,
    felis_qna::{QnaBackend, QueryResult},
    felis_telegram::{ChatTransport, Error, Relay, RelaySettings, RenderMode, UserStateStore},
    tokio::sync::Notify,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Sent {
        chat_id: i64,
        message_id: i32,
        text: String,
        render: RenderMode,
    },
    Edited {
        chat_id: i64,
        message_id: i32,
        text: String,
        render: RenderMode,
    },
}

impl Outgoing {
    pub fn text(&self) -> &str {
        match self {
            Self::Sent { text, .. } | Self::Edited { text, .. } => text,
        }
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub outgoing: Mutex<Vec<Outgoing>>,
    pub resolved: Mutex<Vec<String>>,
    pub fail_resolve: AtomicBool,
    pub fail_download: AtomicBool,
    pub fail_sends: AtomicBool,
    /// Rejects only the next send.
    pub fail_next_send: AtomicBool,
    next_id: AtomicI32,
}

impl MockTransport {
    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.outgoing()
            .iter()
            .map(|o| o.text().to_string())
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        render: RenderMode,
    ) -> felis_telegram::Result<i32> {
        if self.fail_sends.load(Ordering::SeqCst) || self.fail_next_send.swap(false, Ordering::SeqCst)
        {
            return Err(Error::message("send rejected"));
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.outgoing.lock().unwrap().push(Outgoing::Sent {
            chat_id,
            message_id,
            text: text.to_string(),
            render,
        });
        Ok(message_id)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        render: RenderMode,
    ) -> felis_telegram::Result<()> {
        self.outgoing.lock().unwrap().push(Outgoing::Edited {
            chat_id,
            message_id,
            text: text.to_string(),
            render,
        });
        Ok(())
    }

    async fn resolve_file_url(&self, file_id: &str) -> felis_telegram::Result<String> {
        self.resolved.lock().unwrap().push(file_id.to_string());
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(Error::message("file not found"));
        }
        Ok(format!("https://files.test/{file_id}"))
    }

    async fn download(&self, url: &str) -> felis_telegram::Result<Vec<u8>> {
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(Error::message("connection reset"));
        }
        Ok(url.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload {
        user_id: String,
        filename: String,
        size: usize,
    },
    Query {
        user_id: String,
        question: String,
        top_k: i32,
    },
    Direct {
        question: String,
    },
    List {
        user_id: String,
    },
    Clear {
        user_id: String,
    },
    SetMode {
        mode: Mode,
    },
}

#[derive(Default)]
pub struct MockBackend {
    pub calls: Mutex<Vec<Call>>,
    pub answer: Mutex<QueryResult>,
    pub direct_answer: Mutex<String>,
    pub titles: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub fail_set_mode: AtomicBool,
    pub panic_on_query: AtomicBool,
    /// When set, `query` parks until `release` is notified.
    pub hold_queries: AtomicBool,
    pub query_started: Notify,
    pub release: Notify,
}

impl MockBackend {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Query { .. }))
            .count()
    }

    pub fn answer_with(&self, answer: &str) {
        *self.answer.lock().unwrap() = QueryResult {
            answer: answer.to_string(),
            contexts: Vec::new(),
        };
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome<T>(&self, value: T) -> felis_qna::Result<T> {
        if self.fail.load(Ordering::SeqCst) {
            Err(felis_qna::Error::message("backend unavailable"))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl QnaBackend for MockBackend {
    async fn upload_document(
        &self,
        user_id: &str,
        filename: &str,
        data: Vec<u8>,
        _deadline: Duration,
    ) -> felis_qna::Result<String> {
        self.record(Call::Upload {
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            size: data.len(),
        });
        self.outcome("doc-1".to_string())
    }

    async fn query(
        &self,
        user_id: &str,
        question: &str,
        top_k: i32,
        _deadline: Duration,
    ) -> felis_qna::Result<QueryResult> {
        self.record(Call::Query {
            user_id: user_id.to_string(),
            question: question.to_string(),
            top_k,
        });
        self.query_started.notify_one();
        if self.panic_on_query.load(Ordering::SeqCst) {
            panic!("backend client bug");
        }
        if self.hold_queries.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let answer = self.answer.lock().unwrap().clone();
        self.outcome(answer)
    }

    async fn direct_query(&self, question: &str, _deadline: Duration) -> felis_qna::Result<String> {
        self.record(Call::Direct {
            question: question.to_string(),
        });
        let answer = self.direct_answer.lock().unwrap().clone();
        self.outcome(answer)
    }

    async fn list_documents(
        &self,
        user_id: &str,
        _deadline: Duration,
    ) -> felis_qna::Result<Vec<String>> {
        self.record(Call::List {
            user_id: user_id.to_string(),
        });
        let titles = self.titles.lock().unwrap().clone();
        self.outcome(titles)
    }

    async fn clear_documents(&self, user_id: &str, _deadline: Duration) -> felis_qna::Result<()> {
        self.record(Call::Clear {
            user_id: user_id.to_string(),
        });
        self.outcome(())
    }

    async fn set_mode(&self, mode: Mode, _deadline: Duration) -> felis_qna::Result<()> {
        self.record(Call::SetMode { mode });
        if self.fail_set_mode.load(Ordering::SeqCst) {
            return Err(felis_qna::Error::message("set mode rejected"));
        }
        self.outcome(())
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub backend: Arc<MockBackend>,
    pub store: Arc<UserStateStore>,
    pub relay: Arc<Relay>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(RelaySettings::default())
    }

    pub fn with_settings(settings: RelaySettings) -> Self {
        let transport = Arc::new(MockTransport::default());
        let backend = Arc::new(MockBackend::default());
        let store = Arc::new(UserStateStore::new(settings.default_mode));
        let relay = Arc::new(Relay::new(
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::clone(&backend) as Arc<dyn QnaBackend>,
            Arc::clone(&store),
            settings,
        ));
        Self {
            transport,
            backend,
            store,
            relay,
        }
    }
}
