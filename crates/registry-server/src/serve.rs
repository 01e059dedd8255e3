//! The hyper http/1.1 bootstrap: accepts connections and translates between
//! `hyper`'s request/response types and `registry-http`'s transport-agnostic
//! ones, one `tokio::spawn`ed task per connection.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use registry_conf::Config;
use registry_http::AppState;
use tokio::net::TcpListener;

use crate::bootstrap::build_app_state;

pub async fn serve(config: Config) -> Result<()> {
	let state = build_app_state(&config).await?;
	let addr: SocketAddr = config.http.bind_address.parse().context("parsing http.bind_address")?;
	let listener = TcpListener::bind(addr).await.context("binding the http listener")?;

	tracing::info!(%addr, "registry-server listening");

	loop {
		let (stream, peer) = listener.accept().await.context("accepting a connection")?;
		let io = TokioIo::new(stream);
		let state = Arc::clone(&state);

		tokio::spawn(async move {
			let service = service_fn(move |req| {
				let state = Arc::clone(&state);
				async move { handle(state, req).await }
			});

			if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
				tracing::warn!(%peer, error = %err, "connection closed with an error");
			}
		});
	}
}

async fn handle(
	state: Arc<AppState>,
	req: hyper::Request<Incoming>,
) -> Result<hyper::Response<Full<Bytes>>, std::convert::Infallible> {
	let method = req.method().clone();
	let uri = req.uri().clone();
	let headers = req.headers().clone();
	let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();

	let request = match registry_http::Request::builder()
		.method(method.clone())
		.uri(&uri.to_string())
		.headers(headers)
		.body(body)
		.build()
	{
		Ok(request) => request,
		Err(_) => {
			return Ok(hyper::Response::builder().status(400).body(Full::new(Bytes::new())).unwrap());
		}
	};

	let span = tracing::info_span!("http_request", %method, path = request.path());
	let _enter = span.enter();

	let response = registry_http::dispatch(&state, request).await;

	tracing::info!(status = response.status, "request handled");

	let mut builder = hyper::Response::builder().status(response.status);
	for (name, value) in response.headers.iter() {
		builder = builder.header(name, value);
	}
	Ok(builder.body(Full::new(response.body)).unwrap())
}
