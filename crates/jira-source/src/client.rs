//! Rate-limited Jira search client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::{build_search_jql, IssueSource, SearchPage, SourceError, Throttle};

const SEARCH_PATH: &str = "/rest/api/2/search";

#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    pub base_url: String,
    /// Basic auth is sent only when a username is set.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Minimum interval between two search requests.
    pub rate_limit: Duration,
    pub timeout: Duration,
}

impl Default for JiraClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            username: None,
            password: None,
            rate_limit: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct JiraClient {
    client: Client,
    config: JiraClientConfig,
    throttle: Throttle,
}

impl JiraClient {
    pub fn new(config: JiraClientConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SourceError::Client)?;
        let throttle = Throttle::new(config.rate_limit);
        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    pub fn config(&self) -> &JiraClientConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!(
            "{}{SEARCH_PATH}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Run one search request with change history, comments and all fields
    /// expanded, skipping the first `start_at` matches.
    ///
    /// Any 4xx/5xx status, transport failure, undecodable body or non-empty
    /// `errorMessages` is returned as an error. There are no retries.
    pub async fn search(&mut self, jql: &str, start_at: u64) -> Result<SearchPage, SourceError> {
        self.throttle.acquire().await;

        let url = self.search_url();
        tracing::debug!("GET {url} jql={jql} startAt={start_at}");

        let start_at = start_at.to_string();
        let mut request = self.client.get(&url).query(&[
            ("jql", jql),
            ("startAt", start_at.as_str()),
            ("expand", "changelog,comments"),
            ("fields", "*all"),
        ]);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let transport = |source| SourceError::Transport {
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_client_error() || status.is_server_error() {
            return Err(SourceError::HttpStatus { status, body });
        }

        let page: SearchPage = serde_json::from_str(&body).map_err(SourceError::Decode)?;
        if let Some(message) = page.error_messages.first() {
            return Err(SourceError::Reported(message.clone()));
        }

        tracing::debug!(
            "Search returned {} issues (maxResults={}, total={})",
            page.issues.len(),
            page.max_results,
            page.total
        );
        Ok(page)
    }
}

#[async_trait::async_trait]
impl IssueSource for JiraClient {
    async fn fetch_page(
        &mut self,
        since: DateTime<Utc>,
        start_at: u64,
        filter: &str,
    ) -> Result<SearchPage, SourceError> {
        let jql = build_search_jql(since, filter);
        self.search(&jql, start_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> JiraClientConfig {
        JiraClientConfig {
            base_url: base_url.to_string(),
            rate_limit: Duration::ZERO,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn since() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn fetch_page_sends_incremental_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param(
                "jql",
                "(project = PRJ) AND updated > 1700000000000 ORDER BY updated ASC",
            ))
            .and(query_param("startAt", "0"))
            .and(query_param("expand", "changelog,comments"))
            .and(query_param("fields", "*all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 0,
                "maxResults": 50,
                "total": 1,
                "issues": [{"key": "PRJ-1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let page = client.fetch_page(since(), 0, "project = PRJ").await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.issues.len(), 1);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn fetch_page_sends_start_at() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param("startAt", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 50, "maxResults": 50, "total": 120, "issues": [{"key": "PRJ-51"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let page = client.fetch_page(since(), 50, "").await.unwrap();

        assert_eq!(page.start_at, 50);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn sends_basic_auth_when_username_set() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(basic_auth("ann", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "maxResults": 50, "total": 0, "issues": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.username = Some("ann".to_string());
        config.password = Some("secret".to_string());
        let mut client = JiraClient::new(config).unwrap();

        client.fetch_page(since(), 0, "").await.unwrap();
    }

    #[tokio::test]
    async fn http_error_status_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let err = client.fetch_page(since(), 0, "").await.unwrap_err();

        match err {
            SourceError::HttpStatus { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errorMessages": ["The value 'NOPE' does not exist for the field 'project'."]
            })))
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let err = client.fetch_page(since(), 0, "project = NOPE").await.unwrap_err();
        assert!(matches!(err, SourceError::HttpStatus { .. }));
    }

    #[tokio::test]
    async fn reported_error_messages_are_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorMessages": ["first problem", "second problem"]
            })))
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let err = client.fetch_page(since(), 0, "").await.unwrap_err();
        assert!(matches!(err, SourceError::Reported(ref m) if m == "first problem"));
    }

    #[tokio::test]
    async fn undecodable_body_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let mut client = JiraClient::new(test_config(&server.uri())).unwrap();
        let err = client.fetch_page(since(), 0, "").await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let mut client = JiraClient::new(test_config("http://127.0.0.1:9")).unwrap();
        let err = client.fetch_page(since(), 0, "").await.unwrap_err();
        assert!(matches!(err, SourceError::Transport { .. }));
    }
}
