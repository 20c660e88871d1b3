//! Romanized → Devanagari lookup against Google Input Tools.
//!
//! Lookups never fail from the caller's point of view: any transport or payload
//! problem falls back to the word that was typed.

mod tasks;

pub use tasks::TransliterationTasks;

use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use super::domain::FieldName;

pub const DEFAULT_ENDPOINT: &str = "https://inputtools.google.com/request";

const NEPALI_INPUT_TOOL: &str = "ne-t-i0-und";

/// Converts one romanized word into its best native-script guess.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, word: &str) -> impl Future<Output = String> + Send;
}

/// A word-boundary event captured from a field, stamped with the field's
/// generation so later events supersede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransliterationRequest {
    pub field: FieldName,
    pub generation: u64,
    pub prefix: String,
    pub word: String,
}

impl TransliterationRequest {
    /// Field text after the word is replaced and the boundary space is typed.
    pub fn completed_text(&self, converted: &str) -> String {
        format!("{}{} ", self.prefix, converted)
    }
}

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("response did not carry a SUCCESS candidate")]
    Unsuccessful,
}

/// HTTP client for the Google Input Tools transliteration endpoint.
#[derive(Debug, Clone)]
pub struct GoogleInputTools {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for GoogleInputTools {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl GoogleInputTools {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn lookup(&self, word: &str) -> Result<String, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("text", word),
                ("itc", NEPALI_INPUT_TOOL),
                ("num", "1"),
                ("cp", "0"),
                ("cs", "1"),
                ("ie", "utf-8"),
                ("oe", "utf-8"),
                ("app", "demopage"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        first_candidate(&body)
            .map(str::to_owned)
            .ok_or(LookupError::Unsuccessful)
    }
}

impl Transliterator for GoogleInputTools {
    async fn transliterate(&self, word: &str) -> String {
        if word.trim().is_empty() {
            return word.to_string();
        }

        match self.lookup(word).await {
            Ok(converted) => {
                debug!(%word, %converted, "transliterated word");
                converted
            }
            Err(LookupError::Unsuccessful) => {
                debug!(%word, "no transliteration candidate; keeping input");
                word.to_string()
            }
            Err(err) => {
                warn!(%word, error = %err, "transliteration lookup failed; keeping input");
                word.to_string()
            }
        }
    }
}

/// Pull the first candidate out of `["SUCCESS", [[word, [candidate, ...], ...]]]`.
pub fn first_candidate(body: &Value) -> Option<&str> {
    if body.get(0)?.as_str()? != "SUCCESS" {
        return None;
    }
    body.get(1)?
        .get(0)?
        .get(1)?
        .get(0)?
        .as_str()
        .filter(|candidate| !candidate.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });
        format!("http://{addr}/request")
    }

    #[test]
    fn extracts_first_candidate() {
        let body = json!(["SUCCESS", [["namaste", ["नमस्ते", "नमस्ती"], [], {}]]]);
        assert_eq!(first_candidate(&body), Some("नमस्ते"));
    }

    #[test]
    fn rejects_payloads_without_success_marker() {
        assert_eq!(first_candidate(&json!(["FAILED_TO_PROCESS", []])), None);
        assert_eq!(first_candidate(&json!({"status": "SUCCESS"})), None);
        assert_eq!(first_candidate(&json!(["SUCCESS", [["ram", []]]])), None);
        assert_eq!(first_candidate(&json!(["SUCCESS", [["ram", [""]]]])), None);
    }

    #[test]
    fn completed_text_replaces_the_last_word() {
        let request = TransliterationRequest {
            field: FieldName::FullNameNp,
            generation: 3,
            prefix: "राम ".to_string(),
            word: "shrestha".to_string(),
        };
        assert_eq!(request.completed_text("श्रेष्ठ"), "राम श्रेष्ठ ");
    }

    #[tokio::test]
    async fn unreachable_endpoint_returns_input() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let client = GoogleInputTools::new(format!("http://{addr}/request"));
        assert_eq!(client.transliterate("ram").await, "ram");
    }

    #[tokio::test]
    async fn uses_remote_candidate_on_success() {
        let router = Router::new().route(
            "/request",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("itc").map(String::as_str), Some(NEPALI_INPUT_TOOL));
                let word = params.get("text").cloned().unwrap_or_default();
                let candidate = if word == "ram" { "राम" } else { "?" };
                Json(json!(["SUCCESS", [[word, [candidate], [], {}]]]))
            }),
        );
        let client = GoogleInputTools::new(serve(router).await);

        assert_eq!(client.transliterate("ram").await, "राम");
    }

    #[tokio::test]
    async fn server_errors_fall_back_to_input() {
        let router = Router::new().route(
            "/request",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = GoogleInputTools::new(serve(router).await);

        assert_eq!(client.transliterate("sita").await, "sita");
    }

    #[tokio::test]
    async fn malformed_body_falls_back_to_input() {
        let router = Router::new().route("/request", get(|| async { "not json" }));
        let client = GoogleInputTools::new(serve(router).await);

        assert_eq!(client.transliterate("hari").await, "hari");
    }
}
