use thiserror::Error;

/// Startup configuration failures. These are fatal: the pipeline refuses to
/// construct without a usable credential, so a misconfiguration can never
/// surface as a per-turn error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no API key configured: set `api_key` in config.toml or the \
         SAATHI_API_KEY / GEMINI_API_KEY environment variable"
    )]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Per-turn transport failures. Terminal for the turn, never for the
/// session: history and language survive so the user can resubmit.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a usable HTTP response.
    #[error("request failed: {0}")]
    Network(String),

    /// The API answered with a non-2xx status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx reply that did not carry completion text where expected.
    #[error("reply did not contain completion text")]
    MalformedReply,
}

/// Returned when a session-level operation (language switch, reset) is
/// attempted while a turn is in flight. Callers must cancel first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a turn is in flight; cancel it before changing the session")]
pub struct SessionBusy;
