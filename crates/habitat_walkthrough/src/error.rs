use std::io;

/// Walkthrough related errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("scene error: {0}")]
    Scene(#[from] habitat_scene::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("generic error: {0}")]
    Generic(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
