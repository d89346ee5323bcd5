//! HTTP client wrapper with retry logic.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{Value, json};

use super::config::{ElasticsearchConfig, RetryConfig};
use super::error::ElasticsearchError;

/// Request body variants understood by the cluster.
#[derive(Debug, Clone, Copy)]
pub(super) enum Body<'a> {
    Empty,
    Json(&'a Value),
    NdJson(&'a str),
}

/// A completed response with a non-retryable status.
#[derive(Debug)]
pub(super) struct EsResponse {
    pub status: StatusCode,
    pub body: String,
}

impl EsResponse {
    /// Parse the body when the status is a success, otherwise report it.
    pub fn into_json<T: serde::de::DeserializeOwned>(self) -> Result<T, ElasticsearchError> {
        if !self.status.is_success() {
            return Err(self.into_api_error());
        }
        serde_json::from_str(&self.body).map_err(|e| ElasticsearchError::JsonParse(e.to_string()))
    }

    pub fn into_api_error(self) -> ElasticsearchError {
        ElasticsearchError::Api {
            status: self.status.as_u16(),
            message: self.body,
        }
    }
}

/// HTTP client for the Elasticsearch REST API.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: Url,
    retry_config: RetryConfig,
}

impl ElasticsearchClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, ElasticsearchError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ElasticsearchError::Network(format!("invalid URL {}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ElasticsearchError::Network(format!(
                "invalid URL {}: not a base URL",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ElasticsearchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            retry_config: config.retry.clone(),
        })
    }

    /// Single-shot liveness check against the cluster root.
    pub async fn ping(&self) -> Result<(), ElasticsearchError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| ElasticsearchError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(ElasticsearchError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    /// Ping until the cluster answers, up to `attempts` times with `delay`
    /// between tries.
    pub async fn wait_until_ready(
        &self,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), ElasticsearchError> {
        let attempts = attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.ping().await {
                Ok(()) => {
                    tracing::info!(url = %self.base_url, "Connected to Elasticsearch");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, attempts, "Elasticsearch not ready");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or(ElasticsearchError::MaxRetriesExceeded { attempts }))
    }

    /// Create `index` with `mappings` unless it already exists.
    pub async fn ensure_index(&self, index: &str, mappings: &Value) -> Result<(), ElasticsearchError> {
        let exists = self.send(Method::HEAD, &[index], &[], Body::Empty).await?;
        match exists.status {
            StatusCode::OK => return Ok(()),
            StatusCode::NOT_FOUND => {}
            _ => return Err(exists.into_api_error()),
        }

        let body = json!({ "mappings": mappings });
        let created = self
            .send(Method::PUT, &[index], &[], Body::Json(&body))
            .await?;

        if created.status.is_success() {
            tracing::info!(index, "Created Elasticsearch index");
            return Ok(());
        }
        // Another instance may have created it in between.
        if created.body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(created.into_api_error())
    }

    /// Send a request, retrying network failures and transient statuses.
    ///
    /// Any other status, including 404, is returned to the caller.
    pub(super) async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Body<'_>,
    ) -> Result<EsResponse, ElasticsearchError> {
        let url = self.url(segments, query)?;
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            let request = self.client.request(method.clone(), url.clone());
            let request = match body {
                Body::Empty => request,
                Body::Json(value) => request.json(value),
                Body::NdJson(text) => request
                    .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                    .body(text.to_owned()),
            };

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ElasticsearchError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            };

            let status = response.status();
            if !is_retryable(status) {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ElasticsearchError::Network(e.to_string()))?;
                return Ok(EsResponse { status, body });
            }

            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            match backoff.next_backoff() {
                Some(delay) => {
                    let delay = retry_after.map_or(delay, Duration::from_secs);
                    tracing::warn!(
                        status = status.as_u16(),
                        delay_ms = delay.as_millis(),
                        attempt = backoff.attempt,
                        "Retryable status, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(ElasticsearchError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            }
        }
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ElasticsearchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ElasticsearchError::Network("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

/// Statuses worth retrying within one call.
const fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(url: &str) -> ElasticsearchConfig {
        ElasticsearchConfig::new(url).with_retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        })
    }

    #[test]
    fn retryable_statuses() {
        for code in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [200, 201, 400, 404, 409] {
            assert!(!is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn exponential_backoff_increments_and_caps() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        };
        let mut backoff = ExponentialBackoff::new(&config);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn url_encodes_segments_and_query() {
        let client = ElasticsearchClient::new(&fast_config("http://es:9200/")).unwrap();
        let url = client
            .url(&["portfolios", "_doc", "a/b c"], &[("refresh", "wait_for")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://es:9200/portfolios/_doc/a%2Fb%20c?refresh=wait_for"
        );
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            ElasticsearchClient::new(&fast_config("not a url")),
            Err(ElasticsearchError::Network(_))
        ));
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/idx/_doc/1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/idx/_doc/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        let response = client
            .send(Method::GET, &["idx", "_doc", "1"], &[], Body::Empty)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        let err = client
            .send(Method::GET, &["idx"], &[], Body::Empty)
            .await
            .unwrap_err();

        assert_eq!(err, ElasticsearchError::MaxRetriesExceeded { attempts: 3 });
    }

    #[tokio::test]
    async fn passes_not_found_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("refresh", "wait_for"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        let response = client
            .send(Method::GET, &["idx"], &[("refresh", "wait_for")], Body::Empty)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, "missing");
    }

    #[tokio::test]
    async fn ensure_index_creates_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/idx"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/idx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"acknowledged":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        client
            .ensure_index("idx", &json!({"properties": {}}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_index_skips_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/idx"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        client
            .ensure_index("idx", &json!({"properties": {}}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_until_ready_reports_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .expect(2)
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        let err = client
            .wait_until_ready(2, Duration::from_millis(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ElasticsearchError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn wait_until_ready_succeeds_on_live_cluster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version":{}}"#))
            .mount(&server)
            .await;

        let client = ElasticsearchClient::new(&fast_config(&server.uri())).unwrap();
        client
            .wait_until_ready(3, Duration::from_millis(1))
            .await
            .unwrap();
    }
}
