use thiserror::Error;

/// Result type for ajfront operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the ajfront front end
///
/// Syntax problems in user code are not errors: they are collected as
/// diagnostics on the unit. An `Error` means the front end itself could not
/// continue (I/O, a broken grammar, or a violated stack invariant).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at offset {offset}: {message}")]
    Parse {
        offset: usize,
        message: String,
    },

    #[error("Lexical error: {message}")]
    Lexical { message: String },

    #[error("Grammar error: {message}")]
    Grammar { message: String },

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal front end error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a parse error at a source offset
    pub fn parse_error(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Create a lexical error
    pub fn lexical_error(message: impl Into<String>) -> Self {
        Self::Lexical { message: message.into() }
    }

    /// Create a grammar (table construction) error
    pub fn grammar_error(message: impl Into<String>) -> Self {
        Self::Grammar { message: message.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
