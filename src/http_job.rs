use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::binder::{BindingError, Bindings};
use crate::context::InvocationContext;
use crate::job::{Job, JobError};
use crate::params::Parameters;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("missing required parameter: Url")]
    MissingUrl,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Makes one HTTP request.
///
/// Fields:
/// - `Url` (required)
/// - `Method`: GET, POST, PUT, DELETE, PATCH, HEAD (default GET)
/// - `Headers`: JSON object of header name to value
/// - `Body`: request body
/// - `Timeout`: seconds, default 30
///
/// A non-2xx response is a failure carrying the status and body.
#[derive(Debug)]
pub struct HttpJob {
    pub url: Option<Url>,
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
    /// Status and body of the last successful response.
    pub response: Option<(u16, String)>,
    client: Client,
}

impl Default for HttpJob {
    fn default() -> Self {
        Self {
            url: None,
            method: Method::GET,
            headers: HashMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            response: None,
            client: Client::new(),
        }
    }
}

static FIELDS: LazyLock<Bindings<HttpJob>> = LazyLock::new(|| {
    Bindings::new()
        .field("Url", |job: &mut HttpJob, v: Url| job.url = Some(v))
        .field_with("Method", parse_method, |job: &mut HttpJob, v: Method| {
            job.method = v
        })
        .field_with("Headers", parse_headers, |job: &mut HttpJob, v| {
            job.headers = v
        })
        .field("Body", |job: &mut HttpJob, v: String| job.body = Some(v))
        .field("Timeout", |job: &mut HttpJob, v: Duration| job.timeout = v)
});

fn parse_method(s: &str) -> Result<Method, String> {
    match s.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        "HEAD" => Ok(Method::HEAD),
        other => Err(format!("unsupported HTTP method: {other}")),
    }
}

fn parse_headers(json_str: &str) -> Result<HashMap<String, String>, String> {
    serde_json::from_str::<HashMap<String, String>>(json_str)
        .map_err(|e| format!("invalid headers JSON: {e}"))
}

impl HttpJob {
    pub const JOB_TYPE: &'static str = "http";
}

#[async_trait]
impl Job for HttpJob {
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        FIELDS.bind(self, params)
    }

    async fn execute(&mut self, _ctx: &InvocationContext) -> Result<(), JobError> {
        let url = self.url.clone().ok_or(HttpError::MissingUrl)?;
        debug!(%url, method = %self.method, "executing HTTP request");

        let mut req = self
            .client
            .request(self.method.clone(), url)
            .timeout(self.timeout);
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        let response = req.send().await.map_err(HttpError::from)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(HttpError::from)?;

        if !(200..300).contains(&status) {
            info!(status, "HTTP request returned non-2xx");
            return Err(HttpError::Status { status, body }.into());
        }

        info!(status, "HTTP request completed");
        self.response = Some((status, body));
        Ok(())
    }
}
