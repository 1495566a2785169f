use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown mode '{value}' (expected 'offline' or 'online')")]
    InvalidMode { value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
