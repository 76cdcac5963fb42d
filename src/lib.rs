pub mod builder;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod episode;
pub mod keywords;
pub mod message;
pub mod row;
pub mod teacher;

#[derive(Debug)]
pub enum EdError {
    Format(String),
    Config(String),
    Index(String),
    Embedding(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for EdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdError::Format(msg) => write!(f, "format: {msg}"),
            EdError::Config(msg) => write!(f, "config: {msg}"),
            EdError::Index(msg) => write!(f, "index: {msg}"),
            EdError::Embedding(msg) => write!(f, "embedding: {msg}"),
            EdError::Io(e) => write!(f, "io: {e}"),
            EdError::Json(e) => write!(f, "json: {e}"),
            EdError::Csv(e) => write!(f, "csv: {e}"),
        }
    }
}

impl std::error::Error for EdError {}

impl From<std::io::Error> for EdError {
    fn from(e: std::io::Error) -> Self {
        EdError::Io(e)
    }
}

impl From<serde_json::Error> for EdError {
    fn from(e: serde_json::Error) -> Self {
        EdError::Json(e)
    }
}

impl From<csv::Error> for EdError {
    fn from(e: csv::Error) -> Self {
        EdError::Csv(e)
    }
}
