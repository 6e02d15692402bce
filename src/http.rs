//! HTTP access.
//!
//! The loops only need two verbs, so they depend on the small [`HttpClient`]
//! trait rather than on `reqwest` directly. [`ReqwestClient`] is the real
//! implementation; it keeps a cookie store so a login made through
//! [`HttpClient::post_form`] carries over to later GETs on the same client.
//!
//! Non-2xx statuses are *not* errors here. They come back as an
//! [`HttpResponse`] and the caller classifies them with
//! [`crate::classify::check_status`].

use crate::error::ScrapeError;
use crate::models::HttpResponse;
use reqwest::{Client, ClientBuilder};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Minimal async HTTP surface used by the scrapers.
pub trait HttpClient {
    /// GET `url` and read the whole body.
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError>;

    /// POST `form` as `application/x-www-form-urlencoded` to `url`.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, ScrapeError>;
}

/// `reqwest`-backed client with cookie persistence.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: Client,
}

impl ReqwestClient {
    /// Build a client with a cookie store.
    ///
    /// There is no limit on the total duration of a request, only on
    /// connecting and on each read, so a large archive on a slow link still
    /// completes while a stalled server does not hang the run.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Transport`] if the TLS backend cannot be initialised.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, ScrapeError> {
        Self::build(Client::builder(), connect_timeout, read_timeout)
    }

    fn build(
        builder: ClientBuilder,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let inner = builder
            .cookie_store(true)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScrapeError::Transport {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    async fn finish(
        url: &str,
        sent: Result<reqwest::Response, reqwest::Error>,
        t0: Instant,
    ) -> Result<HttpResponse, ScrapeError> {
        let transport = |e: reqwest::Error| {
            warn!(%url, error = %e, "Request failed");
            ScrapeError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        };
        let resp = sent.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(transport)?.to_vec();
        debug!(
            %url,
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Response received"
        );
        Ok(HttpResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse, ScrapeError> {
        let t0 = Instant::now();
        let sent = self.inner.get(url).send().await;
        Self::finish(url, sent, t0).await
    }

    #[instrument(level = "debug", skip(self, form))]
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, ScrapeError> {
        let t0 = Instant::now();
        let sent = self.inner.post(url).form(form).send().await;
        Self::finish(url, sent, t0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one response on a local port, writing the body in `chunks`
    /// with `pause` between them. Returns the URL.
    async fn trickle_server(chunks: usize, pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = sock.read(&mut request).await.unwrap();
            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {chunks}\r\nConnection: close\r\n\r\n");
            sock.write_all(head.as_bytes()).await.unwrap();
            for _ in 0..chunks {
                tokio::time::sleep(pause).await;
                // The client may already have given up.
                if sock.write_all(b"x").await.is_err() || sock.flush().await.is_err() {
                    return;
                }
            }
        });
        format!("http://{addr}/archive.zip")
    }

    fn local_client(read_timeout: Duration) -> ReqwestClient {
        ReqwestClient::build(Client::builder().no_proxy(), Duration::from_secs(5), read_timeout).unwrap()
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestClient::new(Duration::from_secs(5), Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn test_slow_download_longer_than_read_timeout_completes() {
        // 6 x 100ms of body, each gap well inside the 400ms read timeout.
        let url = trickle_server(6, Duration::from_millis(100)).await;
        let resp = local_client(Duration::from_millis(400)).get(&url).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"xxxxxx");
    }

    #[tokio::test]
    async fn test_stalled_body_hits_read_timeout() {
        let url = trickle_server(1, Duration::from_secs(2)).await;
        let err = local_client(Duration::from_millis(200)).get(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport { .. }), "{err:?}");
    }
}
