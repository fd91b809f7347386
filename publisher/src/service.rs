use crate::config::Config;
use crate::errors::PublishError;
use crate::github::GithubContentStore;
use crate::metrics_defs;
use crate::payload::PushPayload;
use crate::publisher::{PublishDefaults, Publisher, PublishReceipt};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderMap, HeaderValue,
};
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type ServiceBody = BoxBody<Bytes, PublishError>;

/// Shared-secret header gating the publish endpoint. Header-name casing is
/// normalized by hyper; the underscore spelling is tolerated for callers
/// whose platform rewrites hyphens.
const SECRET_HEADER: &str = "x-push-secret";
const SECRET_HEADER_UNDERSCORE: &str = "x_push_secret";

const INFO_BODY: &str =
    r#"{"service":"pushgate","usage":"POST a JSON payload with the x-push-secret header"}"#;

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct Inner {
    publisher: Option<Publisher>,
    secret: Option<String>,
}

/// Hyper service implementing the publish endpoint.
///
/// Per-request flow on POST: authenticate, parse the body, then hand the
/// payload to the [`Publisher`]. OPTIONS and GET are answered without
/// authentication; every other method is rejected. Invocations share only
/// immutable state.
#[derive(Clone)]
pub struct PublisherService {
    inner: Arc<Inner>,
}

impl PublisherService {
    pub fn new(publisher: Option<Publisher>, secret: Option<String>) -> Self {
        PublisherService {
            inner: Arc::new(Inner { publisher, secret }),
        }
    }

    /// Builds the service from loaded config. A partially configured target
    /// repository still serves; publish requests then answer 500.
    pub fn from_config(config: &Config) -> Self {
        let publisher = GithubContentStore::from_config(&config.github).map(|store| {
            Publisher::new(
                Arc::new(store),
                PublishDefaults {
                    path: config.github.default_path.clone(),
                    branch: config.github.default_branch.clone(),
                },
            )
        });

        if publisher.is_none() {
            tracing::warn!("github owner, repo, or token missing; publish requests will fail");
        }
        if config.push_secret.is_none() {
            tracing::warn!("PUSH_SECRET not set; all publish requests will be rejected");
        }

        PublisherService::new(publisher, config.push_secret.clone())
    }
}

impl<B> Service<Request<B>> for PublisherService
where
    B: hyper::body::Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<ServiceBody>;
    type Error = PublishError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let method = req.method().clone();
            let response = if method == Method::OPTIONS {
                preflight_response()
            } else if method == Method::GET {
                info_response()
            } else if method == Method::POST {
                metrics::counter!(metrics_defs::PUBLISH_REQUESTS.name).increment(1);
                match handle_post(&inner, req).await {
                    Ok(receipt) => receipt_response(&receipt),
                    Err(err) => error_response(err),
                }
            } else {
                error_response(PublishError::MethodNotAllowed)
            };

            Ok(response)
        })
    }
}

async fn handle_post<B>(inner: &Inner, req: Request<B>) -> Result<PublishReceipt, PublishError>
where
    B: hyper::body::Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    authenticate(req.headers(), inner.secret.as_deref())?;

    let publisher = inner.publisher.as_ref().ok_or(PublishError::NotConfigured)?;

    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| PublishError::RequestBody(e.to_string()))?
        .to_bytes();
    let payload = PushPayload::from_slice(&bytes)?;

    publisher.publish(&payload).await
}

/// Fails closed: a missing server-side secret rejects every caller.
fn authenticate(headers: &HeaderMap, expected: Option<&str>) -> Result<(), PublishError> {
    let expected = match expected {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Err(PublishError::Unauthorized),
    };

    let presented = headers
        .get(SECRET_HEADER)
        .or_else(|| headers.get(SECRET_HEADER_UNDERSCORE))
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(PublishError::Unauthorized),
    }
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, x-push-secret"),
    );
}

fn base_response(status: StatusCode, body: Bytes) -> Response<ServiceBody> {
    let mut response = Response::new(Full::new(body).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    apply_cors(response.headers_mut());
    response
}

fn json_response(status: StatusCode, body: Bytes) -> Response<ServiceBody> {
    let mut response = base_response(status, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn preflight_response() -> Response<ServiceBody> {
    base_response(StatusCode::OK, Bytes::new())
}

fn info_response() -> Response<ServiceBody> {
    json_response(StatusCode::OK, Bytes::from_static(INFO_BODY.as_bytes()))
}

fn receipt_response(receipt: &PublishReceipt) -> Response<ServiceBody> {
    match serde_json::to_vec(receipt) {
        Ok(body) => json_response(StatusCode::OK, Bytes::from(body)),
        Err(e) => error_response(PublishError::Internal(e.to_string())),
    }
}

fn error_response(err: PublishError) -> Response<ServiceBody> {
    let status = err.status_code();
    metrics::counter!(
        metrics_defs::PUBLISH_FAILED.name,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    tracing::warn!(status = %status, error = %err, "publish request failed");

    let envelope = ErrorEnvelope {
        error: err.to_string(),
        details: err.details(),
    };
    let body = serde_json::to_vec(&envelope)
        .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());

    json_response(status, Bytes::from(body))
}
