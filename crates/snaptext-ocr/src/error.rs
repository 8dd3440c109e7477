#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("No API key configured")]
    MissingCredential,

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape")]
    MalformedResponse { snippet: String },

    #[error("Recognized text is empty")]
    EmptyResult,
}

impl OcrError {
    /// Failures on the way to or from the endpoint, as opposed to content problems
    pub fn is_transport(&self) -> bool {
        matches!(self, OcrError::Transport(_) | OcrError::Api { .. })
    }
}
