use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use super::{DefinitionSource, MAX_RETRIES, SourceError, send_text, throttle, with_retry};
use crate::config::Config;

/// Body of `GET {base}/search?w=<word>`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    res: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    header: String,
    id: serde_json::Value,
}

impl SearchHit {
    fn id(&self) -> Option<String> {
        match &self.id {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// HTTP client for the dictionary API: `search` resolves a word to entry ids,
/// `fetch` returns one entry as HTML.
#[derive(Clone)]
pub struct DictionaryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    request_delay: Duration,
    attempts: u32,
}

impl std::fmt::Debug for DictionaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl DictionaryClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.dictionary_url.trim_end_matches('/').to_string(),
            token: config.dictionary_token().map(str::to_string),
            request_delay: config.request_delay,
            attempts: MAX_RETRIES,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str, token: Option<&str>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            token: token.map(str::to_string),
            request_delay: Duration::ZERO,
            attempts: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    fn request(&self, url: url::Url) -> RequestBuilder {
        let req = self.http.get(url);
        match &self.token {
            Some(token) => req.header("Authorization", format!("Basic {token}")),
            None => req,
        }
    }

    async fn get_text(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> Result<String, SourceError> {
        let url = url::Url::parse_with_params(&format!("{}/{endpoint}", self.base_url), params)?;
        let (url, delay) = (&url, self.request_delay);
        with_retry(context, self.attempts, move || async move {
            throttle(delay).await;
            send_text(self.request(url.clone()), context).await
        })
        .await
    }
}

impl DefinitionSource for DictionaryClient {
    async fn search_candidates(&self, word: &str) -> Result<Vec<String>, SourceError> {
        let context = format!("searching word '{word}'");
        let body = self.get_text("search", &[("w", word)], &context).await?;

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::Decode(format!("{context}: {e}")))?;

        let ids: Vec<String> = parsed
            .res
            .iter()
            .filter(|hit| hit.header.contains(word))
            .filter_map(SearchHit::id)
            .collect();
        debug!(word, candidates = ids.len(), "dictionary search complete");
        Ok(ids)
    }

    async fn fetch_definition_body(&self, id: &str) -> Result<String, SourceError> {
        let context = format!("fetching entry '{id}'");
        self.get_text("fetch", &[("id", id)], &context).await
    }
}
