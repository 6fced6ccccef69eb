//! Internal module for establishing TLS connections to IMAP servers.
//!
//! Supports strict (webpki) certificate validation and a relaxed mode for
//! self-hosted or shared mailbox providers whose certificates do not match
//! the configured hostname. The channel is encrypted in both modes.

use crate::error::{Error, Result};
use rustls::ClientConfig;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};
use webpki_roots::TLS_SERVER_ROOTS;

/// A TLS stream over TCP, used for IMAP communication.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Establishes a TLS connection to an IMAP server.
#[instrument(
    name = "connection::establish_tls",
    skip_all,
    fields(
        imap_host = %imap_host,
        target_addr = %target_addr,
        relaxed = relaxed
    )
)]
pub(crate) async fn establish_tls_connection(
    imap_host: &str,
    target_addr: &str,
    relaxed: bool,
) -> Result<TlsStream> {
    let connector = if relaxed {
        create_relaxed_tls_connector()
    } else {
        create_tls_connector()
    };
    let server_name = parse_server_name(imap_host)?;
    let tcp_stream = connect_tcp(target_addr).await?;

    debug!("Performing TLS handshake");

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| Error::TlsConnect {
            target: target_addr.to_string(),
            source,
        })
}

/// Creates a TLS connector with system root certificates.
fn create_tls_connector() -> TlsConnector {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let tls_config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(tls_config))
}

/// Creates a TLS connector that skips certificate validation.
///
/// Shared mailbox providers commonly present certificates for a different
/// hostname than the one the mailbox is configured with.
fn create_relaxed_tls_connector() -> TlsConnector {
    let tls_config = ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(RelaxedVerifier))
        .with_no_client_auth();

    TlsConnector::from(Arc::new(tls_config))
}

/// Certificate verifier that accepts any server certificate.
struct RelaxedVerifier;

impl rustls::client::ServerCertVerifier for RelaxedVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> std::result::Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName> {
    rustls::ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}

/// Direct TCP connection.
#[instrument(name = "connection::tcp_connect", skip_all, fields(target_addr = %target_addr))]
async fn connect_tcp(target_addr: &str) -> Result<TcpStream> {
    debug!(target = %target_addr, "Establishing TCP connection");

    TcpStream::connect(target_addr)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target_addr.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_server_name() {
        let result = parse_server_name("imap.example.com");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_invalid_server_name() {
        // Empty string should fail
        let result = parse_server_name("");
        assert!(result.is_err());
    }
}
