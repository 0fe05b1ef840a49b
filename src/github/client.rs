use reqwest::header::{AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::cache::RevalidationCache;
use crate::config::GitHubConfig;
use crate::error::ApiError;

/// Issues conditional GETs against the GitHub API.
///
/// Every request carries `Authorization: token <token>` and, when an ETag is
/// held for the URL, `If-None-Match`. Successful responses refresh the cache.
pub struct UpstreamClient {
    http: reqwest::Client,
    token: String,
    cache: RevalidationCache,
}

impl UpstreamClient {
    pub fn new(config: &GitHubConfig, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            cache: RevalidationCache::new(),
        })
    }

    #[cfg(test)]
    pub fn cache(&self) -> &RevalidationCache {
        &self.cache
    }

    /// GET `url` and return its body.
    ///
    /// A 304 is answered from the body stored with the ETag that produced it.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> Result<String, ApiError> {
        let mut request = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.token));
        if let Some(etag) = self.cache.etag(url) {
            debug!(%etag, "sending conditional request");
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(|e| {
            let err = ApiError::transport(url, e);
            warn!(error = %err.message, "upstream request failed");
            err
        })?;

        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        debug!(%status, etag = ?etag, "upstream responded");

        let body = match status {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ApiError::transport(url, e))?;
                let trimmed = body.trim();
                if trimmed.is_empty() || trimmed == "null" {
                    return Err(self.reject(ApiError::empty_response(url)));
                }
                body
            }
            StatusCode::NOT_MODIFIED => self
                .cache
                .body(url)
                .ok_or_else(|| self.reject(ApiError::empty_response(url)))?,
            StatusCode::NO_CONTENT => return Err(self.reject(ApiError::empty_response(url))),
            other => return Err(self.reject(ApiError::from_upstream_status(url, other))),
        };

        if let Some(etag) = etag {
            self.cache.store(url, etag, body.clone());
            debug!(cached_urls = self.cache.len(), "stored revalidation token");
        }

        Ok(body)
    }

    /// GET `url` and decode the body as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.fetch(url).await?;
        serde_json::from_str(&body).map_err(|e| self.reject(ApiError::undecodable(url, e)))
    }

    fn reject(&self, err: ApiError) -> ApiError {
        warn!(http_code = err.http_code(), error = %err.message, "upstream call rejected");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> UpstreamClient {
        UpstreamClient::new(&GitHubConfig::default(), "test-token").unwrap()
    }

    #[tokio::test]
    async fn test_sends_token_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .and(query_param("state", "open"))
            .and(header("authorization", "token test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/repos/o/r/pulls?state=open", server.uri());
        let body = client().fetch(&url).await.unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_etag_is_stored_and_sent_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls/1/commits"))
            .and(header("if-none-match", "\"v1\""))
            .respond_with(ResponseTemplate::new(304))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls/1/commits"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v1\"")
                    .set_body_string(r#"[{"sha":"a"}]"#),
            )
            .mount(&server)
            .await;

        let client = client();
        let url = format!("{}/repos/o/r/pulls/1/commits", server.uri());

        let first = client.fetch(&url).await.unwrap();
        assert_eq!(client.cache().etag(&url).as_deref(), Some("\"v1\""));

        // 304 is served from the body stored alongside the ETag.
        let second = client.fetch(&url).await.unwrap();
        assert_eq!(first, second);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].headers.get("if-none-match").is_none());
        assert_eq!(
            requests[1].headers.get("if-none-match").unwrap(),
            "\"v1\""
        );
    }

    #[tokio::test]
    async fn test_new_etag_overwrites_old() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v1\"")
                    .set_body_string("[1]"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v2\"")
                    .set_body_string("[2]"),
            )
            .mount(&server)
            .await;

        let client = client();
        let url = format!("{}/x", server.uri());
        client.fetch(&url).await.unwrap();
        client.fetch(&url).await.unwrap();

        assert_eq!(client.cache().len(), 1);
        assert_eq!(client.cache().etag(&url).as_deref(), Some("\"v2\""));
        assert_eq!(client.cache().body(&url).as_deref(), Some("[2]"));
    }

    #[tokio::test]
    async fn test_response_without_etag_leaves_cache_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let client = client();
        client.fetch(&format!("{}/x", server.uri())).await.unwrap();
        assert_eq!(client.cache().len(), 0);
    }

    #[tokio::test]
    async fn test_not_modified_without_cached_body_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let err = client()
            .fetch(&format!("{}/x", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::EmptyUpstreamResponse);
        assert_eq!(err.http_code(), 204);
    }

    #[tokio::test]
    async fn test_empty_ok_body_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client()
            .fetch(&format!("{}/x", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::EmptyUpstreamResponse);
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let cases = [
            (400, ApiErrorKind::BadRequest),
            (401, ApiErrorKind::Unauthorized),
            (403, ApiErrorKind::Forbidden),
            (404, ApiErrorKind::NotFound),
            (422, ApiErrorKind::InternalServerError),
            (502, ApiErrorKind::InternalServerError),
        ];
        let server = MockServer::start().await;
        for (status, _) in cases {
            Mock::given(method("GET"))
                .and(path(format!("/status/{status}")))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }

        let client = client();
        for (status, kind) in cases {
            let url = format!("{}/status/{status}", server.uri());
            let err = client.fetch(&url).await.unwrap_err();
            assert_eq!(err.kind, kind, "status {status}");
        }
        assert_eq!(client.cache().len(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_internal_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/repos/o/r/pulls?state=open");
        let err = client().fetch(&url).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InternalServerError);
        assert!(err
            .message
            .starts_with(&format!("Error when calling {url}. Reason: ")));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\":true}"))
            .mount(&server)
            .await;

        let url = format!("{}/x", server.uri());
        let err = client()
            .fetch_json::<Vec<crate::github::Commit>>(&url)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InternalServerError);
        assert!(err
            .message
            .starts_with(&format!("Failed to decode response from {url}.")));
    }
}
