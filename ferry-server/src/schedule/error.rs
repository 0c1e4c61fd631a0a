//! Schedule acquisition error types.
//!
//! Transport failures and unrecognized page structure are distinct kinds;
//! both carry the URL involved so store-boundary logging can name it.

use reqwest::Url;

/// Errors from downloading or parsing a schedule page.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// HTTP transport failure or non-success status.
    #[error("error downloading schedule at {url}: {message}")]
    Download { url: String, message: String },

    /// Unrecognized page structure or a date outside the published ranges.
    #[error("error parsing schedule at {url}: {message}")]
    Parse { url: String, message: String },

    /// The redirect chain exceeded the bounded count.
    #[error("too many redirects while downloading schedule at {url}")]
    TooManyRedirects { url: String },

    /// A redirect revisited a URL already fetched in this attempt.
    #[error("redirect loop while downloading schedule at {url}")]
    RedirectLoop { url: String },
}

impl ScheduleError {
    /// The URL this error concerns.
    pub fn url(&self) -> &str {
        match self {
            ScheduleError::Download { url, .. }
            | ScheduleError::Parse { url, .. }
            | ScheduleError::TooManyRedirects { url }
            | ScheduleError::RedirectLoop { url } => url,
        }
    }
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        ScheduleError::Download {
            url: err.url().map(Url::to_string).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}
