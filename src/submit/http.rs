//! Transports: a real HTTP client and a dry-run stand-in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};

use super::{SubmitError, SubmitResult, Transport};

/// Posts over HTTP(S) with `reqwest`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> SubmitResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| SubmitError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, token: &str, body: &str) -> SubmitResult<u16> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(
                USER_AGENT,
                HeaderValue::from_static(concat!("nyrkio-reporter/", env!("CARGO_PKG_VERSION"))),
            )
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Transport(format!("Request timed out: {}", e))
                } else {
                    SubmitError::Transport(e.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Prints each request instead of sending it and pretends it succeeded.
pub struct DryRunTransport;

#[async_trait]
impl Transport for DryRunTransport {
    async fn post_json(&self, url: &str, _token: &str, body: &str) -> SubmitResult<u16> {
        println!("{} {}", console::style("POST").cyan().bold(), url);
        println!("  {}", console::style(body).dim());
        Ok(200)
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Accepts one connection, captures the raw request, answers `status`.
    async fn one_shot_server(status: u16) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn local_transport() -> HttpTransport {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap();
        HttpTransport::from_client(client)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .find_map(|l| {
                let lower = l.to_ascii_lowercase();
                lower
                    .strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + length
    }

    #[tokio::test]
    async fn test_post_sends_headers_and_body() {
        let (base, server) = one_shot_server(200).await;
        let transport = local_transport();

        let status = transport
            .post_json(
                &format!("{}/api/v0/result/P/main/renders%20logo", base),
                "tok123",
                r#"[{"timestamp":1}]"#,
            )
            .await
            .unwrap();
        assert_eq!(status, 200);

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/v0/result/P/main/renders%20logo HTTP/1.1"));
        assert!(lower.contains("authorization: bearer tok123"));
        assert!(lower.contains("content-type: application/json"));
        assert!(request.ends_with(r#"[{"timestamp":1}]"#));
    }

    #[tokio::test]
    async fn test_post_returns_error_status() {
        let (base, server) = one_shot_server(401).await;
        let transport = local_transport();

        let status = transport
            .post_json(&format!("{}/api/v0/result/x", base), "t", "[]")
            .await
            .unwrap();
        assert_eq!(status, 401);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = local_transport();
        let err = transport
            .post_json(&format!("http://{}/api/v0/result/x", addr), "t", "[]")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
    }

    #[tokio::test]
    async fn test_dry_run_always_succeeds() {
        let status = DryRunTransport
            .post_json("https://nyrkio.com/api/v0/result/x", "t", "[]")
            .await
            .unwrap();
        assert_eq!(status, 200);
    }
}
