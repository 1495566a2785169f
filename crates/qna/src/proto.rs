//! Wire messages of the `fm` protobuf package.
//!
//! Field numbers follow declaration order in `fm.proto`.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadDocRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub title: String,
    #[prost(bytes = "vec", tag = "3")]
    pub file_bytes: Vec<u8>,
    #[prost(string, tag = "4")]
    pub filename: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadDocResponse {
    #[prost(string, tag = "1")]
    pub doc_id: String,
    #[prost(string, tag = "2")]
    pub status: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub question: String,
    #[prost(int32, tag = "3")]
    pub top_k: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chunk {
    #[prost(string, tag = "1")]
    pub chunk_id: String,
    #[prost(string, tag = "2")]
    pub text: String,
    #[prost(float, tag = "3")]
    pub score: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponse {
    #[prost(string, tag = "1")]
    pub answer: String,
    #[prost(message, repeated, tag = "2")]
    pub contexts: Vec<Chunk>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListDocsRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListDocsResponse {
    #[prost(string, repeated, tag = "1")]
    pub titles: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearDocsRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearDocsResponse {
    #[prost(string, tag = "1")]
    pub status: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetModeRequest {
    #[prost(string, tag = "1")]
    pub mode: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetModeResponse {
    #[prost(string, tag = "1")]
    pub status: String,
}

/// Fully qualified gRPC method paths of the `fm.QnA` service.
pub mod paths {
    pub const UPLOAD_DOCUMENT: &str = "/fm.QnA/UploadDocument";
    pub const QUERY: &str = "/fm.QnA/Query";
    pub const DIRECT_QUERY: &str = "/fm.QnA/DirectQuery";
    pub const LIST_DOCUMENTS: &str = "/fm.QnA/ListDocuments";
    pub const CLEAR_DOCUMENTS: &str = "/fm.QnA/ClearDocuments";
    pub const SET_MODE: &str = "/fm.QnA/SetMode";
}
