use crate::proto;

/// A ranked excerpt the backend used to support an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnippet {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Answer plus supporting snippets, ordered by relevance (backend-determined).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub answer: String,
    pub contexts: Vec<ContextSnippet>,
}

impl From<proto::Chunk> for ContextSnippet {
    fn from(chunk: proto::Chunk) -> Self {
        Self {
            id: chunk.chunk_id,
            text: chunk.text,
            score: chunk.score,
        }
    }
}

impl From<proto::QueryResponse> for QueryResult {
    fn from(resp: proto::QueryResponse) -> Self {
        Self {
            answer: resp.answer,
            contexts: resp.contexts.into_iter().map(ContextSnippet::from).collect(),
        }
    }
}
