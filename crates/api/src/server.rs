//! Listener bootstrap: plain HTTP plus optional TLS, both serving one router.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use keystone_infra::{Config, TlsPaths};

use crate::app;

const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Serve until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let app = app::build_app(&config).context("route table is inconsistent")?;

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;
    let bound = listener.local_addr()?;
    tracing::info!(addr = %bound, environment = %config.environment, "http listening");

    let https = if config.tls.exist() {
        let acceptor = load_tls_acceptor(&config.tls)?;
        let https_addr = SocketAddr::from(([0, 0, 0, 0], config.https_port));
        let listener = TcpListener::bind(https_addr)
            .await
            .with_context(|| format!("failed to bind {https_addr}"))?;
        let bound = listener.local_addr()?;
        tracing::info!(addr = %bound, environment = %config.environment, "https listening");
        Some(tokio::spawn(serve_tls(listener, acceptor, app.clone())))
    } else {
        tracing::warn!(
            cert = %config.tls.cert.display(),
            key = %config.tls.key.display(),
            "TLS files not found; https listener disabled"
        );
        None
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed");

    if let Some(task) = https {
        task.abort();
    }
    tracing::info!("shut down");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Build a TLS acceptor from PEM certificate chain and private key files.
pub fn load_tls_acceptor(paths: &TlsPaths) -> anyhow::Result<TlsAcceptor> {
    // Another component may already have installed a provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let certs = CertificateDer::pem_file_iter(&paths.cert)
        .with_context(|| format!("failed to open {}", paths.cert.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid certificate in {}", paths.cert.display()))?;
    let key = PrivateKeyDer::from_pem_file(&paths.key)
        .with_context(|| format!("invalid private key in {}", paths.key.display()))?;

    let mut tls = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .with_context(|| cert_pair_context(&paths.cert, &paths.key))?;
    tls.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(tls)))
}

fn cert_pair_context(cert: &Path, key: &Path) -> String {
    format!(
        "certificate {} does not match key {}",
        cert.display(),
        key.display()
    )
}

/// Accept errors such as fd exhaustion repeat until load drops, so pause
/// before the next attempt instead of spinning.
async fn accept_failed(e: std::io::Error) {
    tracing::warn!(error = %e, "https accept failed");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Accept loop for the TLS listener. Each connection gets its own task.
async fn serve_tls(listener: TcpListener, acceptor: TlsAcceptor, app: Router) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                accept_failed(e).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "tls handshake failed");
                    return;
                }
            };

            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "https connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_tls_files_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = TlsPaths {
            cert: dir.path().join("cert.pem"),
            key: dir.path().join("key.pem"),
        };
        std::fs::write(&paths.cert, "not a certificate").unwrap();
        std::fs::write(&paths.key, "not a key").unwrap();

        assert!(paths.exist());
        assert!(load_tls_acceptor(&paths).is_err());
    }

    #[tokio::test]
    async fn accept_errors_back_off() {
        let started = tokio::time::Instant::now();
        accept_failed(std::io::Error::other("too many open files")).await;
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }

    #[test]
    fn missing_tls_files_disable_https() {
        let paths = TlsPaths {
            cert: "does/not/exist.pem".into(),
            key: "does/not/exist.key".into(),
        };
        assert!(!paths.exist());
    }
}
