use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lexical, syntactic or semantic fault; the whole parse transaction
    /// aborts and no partial output is exposed.
    #[error("Line {line}: {msg}")]
    Parse { msg: String, line: usize },

    #[error("Decode error: {0}")]
    Decode(String),
}
