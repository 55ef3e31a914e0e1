use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("filesystem operation failed ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image operation failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("font at {} is not a usable TrueType/OpenType font", .path.display())]
    Font { path: PathBuf },

    #[error("invalid config ({}): {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid sign records ({}): {source}", .path.display())]
    Records {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown user {0}")]
    UnknownUser(String),
}

impl CardError {
    /// Adapter for `map_err` on filesystem calls touching `path`.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> CardError + '_ {
        move |source| CardError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
