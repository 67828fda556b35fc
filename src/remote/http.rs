//! HTTP client for a `notewell serve` instance.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::{NoteFilter, RemoteDataService, RemoteError, Subscription, NOTES_COLLECTION};
use crate::config::ClientConfig;
use crate::models::*;

/// HTTP client for the notewell API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpRemote {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone(), config.token.clone())
    }

    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    /// Build a request with the bearer token attached.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn note_path(id: &str) -> String {
        format!("/{}/{}", NOTES_COLLECTION, urlencode(id))
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), RemoteError> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(body)),
            StatusCode::BAD_REQUEST => Err(RemoteError::BadRequest(body)),
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthenticated),
            _ => Err(RemoteError::Failure(format!("{}: {}", status, body))),
        }
    }
}

#[async_trait]
impl RemoteDataService for HttpRemote {
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError> {
        if self.token.is_none() {
            return Ok(None);
        }
        let response = self.request(Method::GET, "/user").send().await?;
        match self.handle_response(response).await {
            Ok(user) => Ok(Some(user)),
            Err(RemoteError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query(&self, filter: &NoteFilter) -> Result<Vec<RemoteNoteRecord>, RemoteError> {
        let response = self
            .request(Method::GET, &format!("/{}", NOTES_COLLECTION))
            .query(&[
                ("user_id", filter.user_id.as_str()),
                ("order", filter.order.as_str()),
            ])
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNoteRecord>, RemoteError> {
        let response = self
            .request(Method::GET, &Self::note_path(id))
            .send()
            .await?;
        match self.handle_response(response).await {
            Ok(record) => Ok(Some(record)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert(&self, record: RemoteNoteInsert) -> Result<RemoteNoteRecord, RemoteError> {
        let response = self
            .request(Method::POST, &format!("/{}", NOTES_COLLECTION))
            .json(&record)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn update(&self, id: &str, patch: RemoteNotePatch) -> Result<(), RemoteError> {
        let response = self
            .request(Method::PATCH, &Self::note_path(id))
            .json(&patch)
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .request(Method::DELETE, &Self::note_path(id))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    async fn subscribe(&self) -> Result<Subscription, RemoteError> {
        let response = self
            .request(Method::GET, &format!("/{}/events", NOTES_COLLECTION))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut parser = SseParser::default();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!("Note event stream failed: {}", e);
                        break;
                    }
                };
                for data in parser.push(&chunk) {
                    match serde_json::from_str::<NoteChange>(&data) {
                        Ok(change) => {
                            if tx.send(change).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!("Skipping malformed note event: {}", e),
                    }
                }
            }
            tracing::info!("Note event stream closed");
        });

        Ok(Subscription::new(rx, move || task.abort()))
    }

    async fn summarize(&self, text: &str) -> Result<String, RemoteError> {
        let response = self
            .request(Method::POST, "/summarize")
            .json(&SummarizeRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        let body: SummarizeResponse = self.handle_response(response).await?;
        Ok(body.summary)
    }
}

/// Incremental Server-Sent Events parser. Yields the `data` payload of each
/// complete event; comments and other fields are dropped.
///
/// Buffers raw bytes so a chunk boundary inside a multi-byte character is harmless.
#[derive(Debug, Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let block = String::from_utf8_lossy(&block);
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }
}

/// Percent-encode a path segment.
fn urlencode(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_parser_handles_split_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"event: delete\ndata: {\"kind\":").is_empty());
        let events = parser.push(b"\"delete\",\"id\":\"n1\"}\n\n");
        assert_eq!(events, vec!["{\"kind\":\"delete\",\"id\":\"n1\"}".to_string()]);
    }

    #[test]
    fn sse_parser_skips_keepalive_comments() {
        let mut parser = SseParser::default();
        let events = parser.push(b":keepalive\n\ndata: {}\n\n");
        assert_eq!(events, vec!["{}".to_string()]);
    }

    #[test]
    fn sse_parser_accepts_crlf_line_endings() {
        let mut parser = SseParser::default();
        let events = parser.push(b"data: a\r\n\r\n");
        assert_eq!(events, vec!["a".to_string()]);
    }

    #[test]
    fn sse_parser_joins_multibyte_characters_split_across_chunks() {
        let mut parser = SseParser::default();
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.len() - 3;
        assert!(parser.push(&bytes[..split]).is_empty());
        assert_eq!(parser.push(&bytes[split..]), vec!["café".to_string()]);
    }

    #[test]
    fn note_ids_are_percent_encoded() {
        assert_eq!(HttpRemote::note_path("a b/c"), "/notes/a%20b%2Fc");
        assert_eq!(HttpRemote::note_path("42"), "/notes/42");
    }

    #[tokio::test]
    async fn no_token_means_no_identity() {
        let remote = HttpRemote::new("http://127.0.0.1:9/api/v1", None);
        assert_eq!(remote.current_user().await.unwrap(), None);
    }
}
