use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("couldnt create output sink {}: {source}", path.display())]
    SinkCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldnt serialize metrics: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("IO error in metrics reporter: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid {0} interval: must be greater than zero")]
    InvalidInterval(&'static str),
    #[error("{0} loop panicked")]
    Panicked(&'static str),
}
