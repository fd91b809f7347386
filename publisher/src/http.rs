use crate::errors::PublishError;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Accept loop for the publish service: binds the listener and hands each
/// connection to hyper, auto-detecting h1/h2 on the socket.
pub async fn serve<S>(host: &str, port: u16, service: S) -> Result<(), PublishError>
where
    S: Service<
            Request<Incoming>,
            Response = Response<BoxBody<Bytes, PublishError>>,
            Error = PublishError,
        > + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host = %host, port = port, "listening");

    let service = Arc::new(service);

    loop {
        let (stream, peer) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(peer = %peer, error = %err, "connection closed with error");
            }
        });
    }
}
