use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::{MAX_RETRIES, SourceError, WordSource, send_text, throttle, with_retry};
use crate::config::Config;
use crate::corpus::is_letter;

/// HTTP client for the word-list site (`palabras-con.php?letra=<l>&total=s`).
#[derive(Clone)]
pub struct WordsClient {
    http: Client,
    base_url: String,
    request_delay: Duration,
    attempts: u32,
}

impl WordsClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.words_url.clone(),
            request_delay: config.request_delay,
            attempts: MAX_RETRIES,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            request_delay: Duration::ZERO,
            attempts: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_retries(mut self, attempts: u32, request_delay: Duration) -> Self {
        self.attempts = attempts;
        self.request_delay = request_delay;
        self
    }
}

impl WordSource for WordsClient {
    async fn list_words(&self, letter: &str) -> Result<String, SourceError> {
        let upper = letter.to_uppercase();
        if !is_letter(&upper) {
            return Err(SourceError::InvalidLetter(letter.to_string()));
        }

        let url = url::Url::parse_with_params(
            &self.base_url,
            &[("letra", letter.to_lowercase().as_str()), ("total", "s")],
        )?;
        let context = format!("listing words with letter {upper}");

        let (http, url, ctx, delay) = (&self.http, &url, context.as_str(), self.request_delay);
        let body = with_retry(ctx, self.attempts, move || async move {
            throttle(delay).await;
            send_text(http.get(url.clone()), ctx).await
        })
        .await?;

        debug!(letter = %upper, bytes = body.len(), "word listing fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn list_words_sends_lowercase_letter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("letra", "ñ"))
            .and(query_param("total", "s"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ñandú</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = WordsClient::with_base_url(Client::new(), &server.uri());
        let body = client.list_words("Ñ").await.unwrap();
        assert!(body.contains("ñandú"));
    }

    #[tokio::test]
    async fn invalid_letter_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = WordsClient::with_base_url(Client::new(), &server.uri());
        for letter in ["1", "AB", "", "ç"] {
            let result = client.list_words(letter).await;
            assert!(
                matches!(result, Err(SourceError::InvalidLetter(_))),
                "should reject {letter:?}"
            );
        }
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such page"))
            .mount(&server)
            .await;

        let client = WordsClient::with_base_url(Client::new(), &server.uri());
        match client.list_words("a").await {
            Err(SourceError::Api { code: 404, message }) => {
                assert!(message.contains("letter A"), "got: {message}");
                assert!(message.contains("no such page"), "got: {message}");
            }
            other => panic!("expected Api(404), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_retried_after_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a>boca</a>"))
            .expect(1)
            .mount(&server)
            .await;

        let delay = Duration::from_millis(20);
        let client =
            WordsClient::with_base_url(Client::new(), &server.uri()).with_retries(MAX_RETRIES, delay);
        let started = std::time::Instant::now();
        let body = client.list_words("b").await.unwrap();

        assert!(body.contains("boca"));
        let min_wait = delay * 2 + Duration::from_millis(crate::sources::INITIAL_BACKOFF_MS / 2);
        assert!(started.elapsed() >= min_wait, "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = WordsClient::with_base_url(Client::new(), &server.uri());
        let result = client.list_words("b").await;
        assert!(matches!(result, Err(SourceError::RateLimited)));
    }

    #[tokio::test]
    async fn body_is_decoded_as_utf8_regardless_of_charset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        "<a>pingüino</a>".as_bytes().to_vec(),
                        "text/html; charset=iso-8859-1",
                    ),
            )
            .mount(&server)
            .await;

        let client = WordsClient::with_base_url(Client::new(), &server.uri());
        let body = client.list_words("p").await.unwrap();
        assert!(body.contains("pingüino"), "got: {body}");
    }
}
