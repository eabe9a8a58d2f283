//! Liveness listener for the hosting platform's health check.
//!
//! Every request gets `200 OK`. When the Prometheus recorder is installed,
//! `GET /metrics` renders it instead.

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Address on all interfaces for the given port
pub fn bind_address(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

/// Build the response for one request
pub fn liveness_response(
    method: &hyper::Method,
    path: &str,
    metrics_handle: Option<&PrometheusHandle>,
) -> hyper::Response<String> {
    match (method, path, metrics_handle) {
        (&hyper::Method::GET, "/metrics", Some(handle)) => hyper::Response::new(handle.render()),
        _ => hyper::Response::new("OK".to_string()),
    }
}

/// Bind the listener and serve it on a background task
///
/// Returns the bound address, which differs from `addr` when port 0 was
/// requested.
pub async fn start_liveness_listener(
    addr: SocketAddr,
    metrics_handle: Option<PrometheusHandle>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        metrics = %metrics_handle.is_some(),
        "Liveness listener started"
    );

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let response = liveness_response(
                                    req.method(),
                                    req.uri().path(),
                                    metrics_handle.as_ref(),
                                );
                                async move { Ok::<_, std::convert::Infallible>(response) }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            crate::errors::error_logging::log_network_error(
                                &err,
                                "serve_liveness_connection",
                                Some(&peer_addr.to_string()),
                                None,
                            );
                        }
                    });
                }
                Err(e) => {
                    crate::errors::error_logging::log_network_error(
                        &e,
                        "accept_tcp_connection",
                        Some(&local_addr.to_string()),
                        None,
                    );
                }
            }
        }
    });

    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_path_is_ok() {
        let response = liveness_response(&hyper::Method::POST, "/whatever", None);
        assert_eq!(response.status(), hyper::StatusCode::OK);
        assert_eq!(response.body(), "OK");
    }

    #[test]
    fn test_metrics_without_recorder_is_plain_ok() {
        let response = liveness_response(&hyper::Method::GET, "/metrics", None);
        assert_eq!(response.body(), "OK");
    }

    #[test]
    fn test_bind_address_uses_all_interfaces() {
        assert_eq!(bind_address(10000).to_string(), "0.0.0.0:10000");
    }
}
