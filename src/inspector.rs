use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

use crate::error::CheckError;
use crate::types::{CertificateRecord, Endpoint};

pub const DEFAULT_TLS_PORT: u16 = 443;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fetches and summarizes the leaf certificate of a single endpoint.
#[async_trait]
pub trait CertificateInspector: Send + Sync {
    async fn inspect(&self, endpoint: &Endpoint) -> Result<CertificateRecord, CheckError>;
}

/// Strips the scheme and any path, then ensures an explicit port.
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let (host, port) = split_host_port(authority);
    let port = port.map(str::to_string).unwrap_or_else(|| DEFAULT_TLS_PORT.to_string());
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Splits `host:port`, `[v6]:port`, `[v6]` or a bare host. Brackets are removed from the host.
pub fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':').filter(|p| !p.is_empty())),
            None => (rest, None),
        };
    }
    match authority.rsplit_once(':') {
        // more than one colon means an unbracketed IPv6 literal
        Some((host, port)) if !host.contains(':') => {
            (host, Some(port).filter(|p| !p.is_empty()))
        }
        _ => (authority, None),
    }
}

/// Whole days until `expires_at`, rounded toward negative infinity.
pub fn days_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

pub fn build_record(
    label: &str,
    host_port: &str,
    common_name: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CertificateRecord {
    CertificateRecord {
        label: label.to_string(),
        host_port: host_port.to_string(),
        common_name: common_name.to_string(),
        expires_at,
        days_remaining: days_remaining(expires_at, now),
    }
}

/// Parses a DER leaf certificate into a record. The error is a human readable cause.
pub fn record_from_der(
    label: &str,
    host_port: &str,
    der: &[u8],
    now: DateTime<Utc>,
) -> Result<CertificateRecord, String> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| format!("failed to parse leaf certificate: {}", e))?;

    let not_after = cert.validity().not_after.timestamp();
    let expires_at = DateTime::<Utc>::from_timestamp(not_after, 0)
        .ok_or_else(|| format!("certificate expiry out of range: {}", not_after))?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default();

    Ok(build_record(label, host_port, common_name, expires_at, now))
}

/// Inspector backed by a verifying rustls client.
pub struct TlsInspector {
    connector: TlsConnector,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl TlsInspector {
    pub fn new(timeout: Duration) -> Result<Self, rustls::Error> {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Result<Self, rustls::Error> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(timeout, clock, root_store)
    }

    /// Same as [`TlsInspector::with_clock`] but trusting only `root_store`.
    pub fn with_roots(
        timeout: Duration,
        clock: Arc<dyn Clock>,
        root_store: RootCertStore,
    ) -> Result<Self, rustls::Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
            clock,
        })
    }
}

#[async_trait]
impl CertificateInspector for TlsInspector {
    async fn inspect(&self, endpoint: &Endpoint) -> Result<CertificateRecord, CheckError> {
        let host_port = normalize_target(&endpoint.address);
        let fail = |cause: String| CheckError::inspection(&endpoint.label, &host_port, cause);

        let (host, _) = split_host_port(&host_port);
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| fail(format!("invalid server name '{}': {}", host, e)))?;

        let tcp = tokio::time::timeout(self.timeout, TcpStream::connect(host_port.as_str()))
            .await
            .map_err(|_| fail(format!("connection timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| fail(format!("TCP connection failed: {}", e)))?;

        let mut tls = tokio::time::timeout(self.timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| fail(format!("TLS handshake timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| fail(format!("TLS handshake failed: {}", e)))?;

        let leaf = {
            let (_, conn) = tls.get_ref();
            conn.peer_certificates()
                .and_then(|chain| chain.first())
                .map(|cert| cert.as_ref().to_vec())
        };

        // close_notify; the socket itself is released when `tls` drops
        match tokio::time::timeout(self.timeout, tls.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(label = %endpoint.label, error = %e, "TLS shutdown failed");
            }
            Err(_) => {
                tracing::debug!(label = %endpoint.label, "TLS shutdown timed out");
            }
        }

        let der = leaf.ok_or_else(|| CheckError::NoCertificate {
            label: endpoint.label.clone(),
            address: host_port.clone(),
        })?;

        record_from_der(&endpoint.label, &host_port, &der, self.clock.now()).map_err(fail)
    }
}
