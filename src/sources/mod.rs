//! External content sources: the word-list site and the dictionary API.

pub mod dictionary;
pub mod parser;
pub mod words;

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

pub use dictionary::DictionaryClient;
pub use words::WordsClient;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("letter '{0}' is not a valid letter")]
    InvalidLetter(String),

    #[error("source rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("source error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Numeric code for logs: the HTTP status when there is one, 500 otherwise.
    pub fn code(&self) -> u16 {
        match self {
            SourceError::RateLimited => 429,
            SourceError::Api { code, .. } => *code,
            _ => 500,
        }
    }
}

/// Lists every word that starts with a letter.
/// Implemented by `WordsClient`; tests use in-memory fakes.
pub trait WordSource {
    /// Raw markup of the word listing for `letter`. Letters outside
    /// [`crate::corpus::LETTERS`] fail without a remote call.
    async fn list_words(&self, letter: &str) -> Result<String, SourceError>;
}

/// Looks up dictionary entries for a word.
pub trait DefinitionSource {
    /// Entry ids matching `word`. No match is `Ok(vec![])`.
    async fn search_candidates(&self, word: &str) -> Result<Vec<String>, SourceError>;

    /// Raw markup of one dictionary entry.
    async fn fetch_definition_body(&self, id: &str) -> Result<String, SourceError>;
}

pub(crate) const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Run `op` again on rate limiting and 5xx, up to `attempts` times in total.
pub(crate) async fn with_retry<T, F, Fut>(
    label: &str,
    attempts: u32,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retriable(&e) => {
                last_err = Some(e);
                if attempt + 1 < attempts {
                    let delay_ms = jittered_backoff(attempt);
                    debug!(
                        label,
                        attempt = attempt + 1,
                        delay_ms,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(SourceError::RateLimited))
}

fn is_retriable(e: &SourceError) -> bool {
    matches!(
        e,
        SourceError::RateLimited
            | SourceError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

pub(crate) async fn throttle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Send `request` and return the body decoded as UTF-8, whatever the headers claim.
pub(crate) async fn send_text(
    request: RequestBuilder,
    context: &str,
) -> Result<String, SourceError> {
    let response = request
        .header("User-Agent", crate::USER_AGENT)
        .send()
        .await?;
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        warn!(context, "source rate limited");
        return Err(SourceError::RateLimited);
    }
    let body = decode_utf8(response).await?;
    if !status.is_success() {
        let snippet: String = body.chars().take(200).collect();
        return Err(SourceError::Api {
            code: status.as_u16(),
            message: format!("{context}: {snippet}"),
        });
    }
    Ok(body)
}

async fn decode_utf8(response: Response) -> Result<String, SourceError> {
    let bytes = response.bytes().await?;
    let (text, _) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn code_reports_status_or_500() {
        assert_eq!(SourceError::RateLimited.code(), 429);
        assert_eq!(
            SourceError::Api {
                code: 404,
                message: "x".into()
            }
            .code(),
            404
        );
        assert_eq!(SourceError::InvalidLetter("1".into()).code(), 500);
        assert_eq!(SourceError::Decode("bad".into()).code(), 500);
    }

    #[test]
    fn server_errors_and_rate_limits_are_retriable() {
        assert!(is_retriable(&SourceError::RateLimited));
        assert!(is_retriable(&SourceError::Api {
            code: 503,
            message: String::new()
        }));
        assert!(!is_retriable(&SourceError::Api {
            code: 404,
            message: String::new()
        }));
        assert!(!is_retriable(&SourceError::InvalidLetter("?".into())));
    }

    #[test]
    fn backoff_stays_within_equal_jitter_bounds() {
        for attempt in 0..3 {
            let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
            let delay = jittered_backoff(attempt);
            assert!(delay >= base / 2 && delay < base, "attempt {attempt}: {delay}");
        }
    }

    #[tokio::test]
    async fn with_retry_stops_on_permanent_error() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry("test", MAX_RETRIES, || {
            calls.set(calls.get() + 1);
            async {
                Err(SourceError::Api {
                    code: 404,
                    message: "missing".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(SourceError::Api { code: 404, .. })));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn with_retry_recovers_after_transient_error() {
        let calls = Cell::new(0);
        let result = with_retry("test", MAX_RETRIES, || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt == 1 {
                    Err(SourceError::RateLimited)
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn with_retry_single_attempt_returns_transient_error() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry("test", 1, || {
            calls.set(calls.get() + 1);
            async { Err(SourceError::RateLimited) }
        })
        .await;
        assert!(matches!(result, Err(SourceError::RateLimited)));
        assert_eq!(calls.get(), 1);
    }
}
