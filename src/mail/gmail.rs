//! Gmail REST client (messages.get, history.list) over reqwest.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::config::MailConfig;
use crate::error::MailError;
use crate::mail::MailClient;
use crate::mail::types::{HistoryPage, HistoryRecord, RawMessage};

/// Upper bound on history pages followed for one delta.
const MAX_HISTORY_PAGES: usize = 50;

/// Gmail API client using a pre-issued bearer token.
pub struct GmailClient {
    http: reqwest::Client,
    config: MailConfig,
}

impl GmailClient {
    pub fn new(config: MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// `{api_base}/users/{user_id}/{segments..}`. Each segment is escaped on
    /// its own, so ids cannot add path components, a query, or a fragment.
    fn user_url(&self, segments: &[&str]) -> Result<Url, MailError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| MailError::Http(format!("Invalid mail API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| MailError::Http("Mail API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .push("users")
            .push(&self.config.user_id)
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<reqwest::Response, MailError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.config.access_token.expose_secret())
            .query(query)
            .send()
            .await?;
        Ok(resp)
    }
}

async fn error_for_status(resp: reqwest::Response) -> MailError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    MailError::Status { status, body }
}

#[async_trait]
impl MailClient for GmailClient {
    async fn get_message(&self, id: &str) -> Result<Option<RawMessage>, MailError> {
        let url = self.user_url(&["messages", id])?;
        let resp = self.get(url, &[("format", "full".to_string())]).await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json::<RawMessage>().await?)),
            _ => Err(error_for_status(resp).await),
        }
    }

    async fn get_history(&self, start_history_id: u64) -> Result<Vec<HistoryRecord>, MailError> {
        let url = self.user_url(&["history"])?;
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        for page_no in 1..=MAX_HISTORY_PAGES {
            let mut query = vec![
                ("startHistoryId", start_history_id.to_string()),
                ("historyTypes", "messageAdded".to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let resp = self.get(url.clone(), &query).await?;
            if !resp.status().is_success() {
                return Err(error_for_status(resp).await);
            }

            let page: HistoryPage = resp.json().await?;
            debug!(page = page_no, records = page.history.len(), "Fetched history page");
            records.extend(page.history);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(records),
            }
        }

        warn!(
            start_history_id,
            pages = MAX_HISTORY_PAGES,
            records = records.len(),
            "History page limit reached, later records not fetched"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::Query, http::Uri, routing::get};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    fn client(api_base: &str) -> GmailClient {
        GmailClient::new(MailConfig {
            api_base: api_base.into(),
            user_id: "me".into(),
            access_token: SecretString::from("t".to_string()),
        })
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/gmail/v1")
    }

    /// Fake API that records every request URI and answers 404.
    async fn recording_server() -> (String, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let app = Router::new().fallback(move |uri: Uri| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(uri.to_string());
                axum::http::StatusCode::NOT_FOUND
            }
        });
        (serve(app).await, seen)
    }

    /// History endpoint serving `pages` pages; page N links to N+1.
    async fn paged_history_server(pages: usize) -> (String, Arc<Mutex<Vec<String>>>) {
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&tokens);
        let app = Router::new().route(
            "/gmail/v1/users/me/history",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let log = Arc::clone(&log);
                async move {
                    let page: usize = q
                        .get("pageToken")
                        .map(|t| t.trim_start_matches("p").parse().unwrap())
                        .unwrap_or(1);
                    log.lock().unwrap().push(q.get("pageToken").cloned().unwrap_or_default());
                    let mut body = json!({
                        "history": [{
                            "id": (100 + page).to_string(),
                            "messagesAdded": [{"message": {"id": format!("m{page}")}}]
                        }],
                        "historyId": "999"
                    });
                    if page < pages {
                        body["nextPageToken"] = Value::from(format!("p{}", page + 1));
                    }
                    Json(body)
                }
            }),
        );
        (serve(app).await, tokens)
    }

    #[test]
    fn user_url_joins_base() {
        let url = client("https://gmail.example/gmail/v1/")
            .user_url(&["messages", "abc"])
            .unwrap();
        assert_eq!(url.as_str(), "https://gmail.example/gmail/v1/users/me/messages/abc");
    }

    #[test]
    fn user_url_escapes_message_id() {
        let url = client("https://gmail.example/gmail/v1")
            .user_url(&["messages", "../../../admin/secret?x=1#"])
            .unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 6);
        assert_eq!(&segments[..5], &["gmail", "v1", "users", "me", "messages"]);
        assert!(segments[5].contains("%2F"));
    }

    #[test]
    fn invalid_base_is_an_error() {
        assert!(client("not a url").user_url(&["history"]).is_err());
    }

    #[tokio::test]
    async fn message_id_stays_in_one_segment() {
        let (base, seen) = recording_server().await;
        let gmail = client(&base);

        assert!(gmail.get_message("../../../admin/secret?x=1#").await.unwrap().is_none());
        assert!(gmail.get_message("abc?format=raw&").await.unwrap().is_none());

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        for uri in &seen {
            assert!(uri.starts_with("/gmail/v1/users/me/messages/"), "{uri}");
            let (path, query) = uri.split_once('?').unwrap();
            assert_eq!(query, "format=full");
            assert_eq!(path.matches('/').count(), 6, "{path}");
        }
    }

    #[tokio::test]
    async fn history_follows_page_tokens() {
        let (base, tokens) = paged_history_server(3).await;
        let records = client(&base).get_history(100).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(101), Some(102), Some(103)]);
        assert_eq!(*tokens.lock().unwrap(), vec!["", "p2", "p3"]);
    }

    #[tokio::test]
    async fn history_stops_at_page_limit() {
        let (base, tokens) = paged_history_server(MAX_HISTORY_PAGES + 5).await;
        let records = client(&base).get_history(100).await.unwrap();

        assert_eq!(records.len(), MAX_HISTORY_PAGES);
        assert_eq!(tokens.lock().unwrap().len(), MAX_HISTORY_PAGES);
    }

    #[tokio::test]
    async fn history_error_status_propagates() {
        let (base, _) = recording_server().await;
        let err = client(&base).get_history(1).await.unwrap_err();
        assert!(matches!(err, MailError::Status { status: 404, .. }));
    }
}
