use thiserror::Error;

/// Errors from the OPhim catalog client.
#[derive(Debug, Error)]
pub enum OphimError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("envelope error: {message}")]
    Envelope { message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl OphimError {
    /// Whether the upstream reported the resource as missing.
    ///
    /// OPhim answers unknown slugs either with a 404 or with a
    /// non-success envelope, so both count.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 404,
            Self::Envelope { .. } => true,
            _ => false,
        }
    }
}
