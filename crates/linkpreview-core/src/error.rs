use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("{pending} link preview(s) still pending after {waited:?}")]
    Timeout { pending: usize, waited: Duration },
    #[error("invalid preview catalog: {0}")]
    Catalog(#[from] toml::de::Error),
    #[error("failed to read preview catalog {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
