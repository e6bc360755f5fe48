use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// HTTP request used by exchange adapters. Adapters only read public data,
/// so GET is the only method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Retryable,
    TimedOut,
    Fatal,
}

/// Transport-level HTTP error: the request never produced a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    failure: Failure,
}

impl HttpError {
    /// Retryable transport failure (connection reset, refused, dropped body).
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_failure(message, Failure::Retryable)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_failure(message, Failure::TimedOut)
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::with_failure(message, Failure::Fatal)
    }

    fn with_failure(message: impl Into<String>, failure: Failure) -> Self {
        Self {
            message: message.into(),
            failure,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timed_out(&self) -> bool {
        self.failure == Failure::TimedOut
    }

    pub fn retryable(&self) -> bool {
        self.failure != Failure::Fatal
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport seam; tests substitute scripted clients.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production client. `reqwest::Client` is internally reference counted, so
/// clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinmarkets/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(error: &reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::timeout(format!("no response in time: {error}"))
    } else if error.is_builder() {
        HttpError::non_retryable(format!("request could not be built: {error}"))
    } else if error.is_connect() {
        HttpError::new(format!("could not connect: {error}"))
    } else {
        HttpError::new(format!("transfer failed: {error}"))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let response = request
                .headers
                .iter()
                .fold(
                    self.client.get(&request.url).timeout(request.timeout),
                    |builder, (name, value)| builder.header(name, value),
                )
                .send()
                .await
                .map_err(|error| classify(&error))?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|error| classify(&error))?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_lowercased() {
        let request = HttpRequest::get("https://example.test/product").with_header("Accept", "json");
        assert_eq!(request.headers.get("accept").map(String::as_str), Some("json"));
    }

    #[test]
    fn error_flags_follow_constructor() {
        assert!(HttpError::new("reset").retryable());
        assert!(HttpError::timeout("slow").timed_out());
        assert!(HttpError::timeout("slow").retryable());
        assert!(!HttpError::non_retryable("bad url").retryable());
        assert!(!HttpError::non_retryable("bad url").timed_out());
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::ok_json("{}").is_success());
        assert!(!HttpResponse::with_status(302, "").is_success());
        assert!(!HttpResponse::with_status(500, "").is_success());
    }
}
