use std::io;

/// Scene loading errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("gltf error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("asset has no scene")]
    NoScene,

    #[error("unsupported asset source: {0}")]
    Unsupported(String),
}
