//! TLS handshake and certificate posture.
//!
//! Connects with `tokio-rustls` using a verifier that accepts any chain, so a
//! broken certificate is reported as findings instead of a handshake error.
//! The leaf certificate is parsed with `x509-parser`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, ClientConfig, DigitallySignedStruct, ProtocolVersion, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use x509_parser::extensions::{GeneralName, ParsedExtension};

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::config::{TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};
use crate::error_handling::AnalyzerError;
use crate::models::{Finding, FindingDetails};

const ID: &str = "ssl_tls";
const CATEGORY: &str = "SSL/TLS";
const HTTPS_PORT: u16 = 443;
/// Certificates expiring within this many days are flagged
const EXPIRY_WARNING_DAYS: i64 = 30;

pub struct SslTlsAnalyzer;

impl Analyzer for SslTlsAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Hostname, Artifact::Urls]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move {
            let port = tls_port(input.urls()?.final_url);
            inspect(input.hostname()?, port).await
        })
    }
}

/// Port to inspect: an explicit port on an `https` final URL, otherwise 443.
fn tls_port(final_url: &str) -> u16 {
    url::Url::parse(final_url)
        .ok()
        .filter(|u| u.scheme() == "https")
        .and_then(|u| u.port())
        .unwrap_or(HTTPS_PORT)
}

/// Accepts every certificate; the analyzer judges the chain itself.
#[derive(Debug)]
struct InspectOnlyVerifier;

impl ServerCertVerifier for InspectOnlyVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn client_config() -> Result<ClientConfig, AnalyzerError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| AnalyzerError::InvalidInput(format!("TLS configuration: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InspectOnlyVerifier))
        .with_no_client_auth();
    Ok(config)
}

/// Leaf certificate facts the checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CertSummary {
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub sans: Vec<String>,
    /// Unix seconds
    pub not_before: i64,
    pub not_after: i64,
}

fn summarize(der: &[u8]) -> Result<CertSummary, AnalyzerError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| AnalyzerError::InvalidInput(format!("unparseable certificate: {e}")))?;

    let mut sans = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for name in &san.general_names {
                if let GeneralName::DNSName(dns) = name {
                    sans.push(dns.to_string());
                }
            }
        }
    }

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    Ok(CertSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        common_name,
        sans,
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
    })
}

async fn inspect(hostname: &str, port: u16) -> AnalyzerOutcome {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| AnalyzerError::InvalidInput(format!("Invalid server name {hostname}: {e}")))?;

    debug!("Connecting to {hostname}:{port} for TLS inspection");
    let sock = match tokio::time::timeout(
        Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        TcpStream::connect((hostname, port)),
    )
    .await
    {
        Ok(Ok(sock)) => sock,
        Ok(Err(e)) => {
            debug!("Failed to connect to {hostname}:{port} - {e}");
            return Ok(vec![unavailable(format!(
                "Could not connect to {hostname} on port {port}; HTTPS appears unavailable."
            ))]);
        }
        Err(_) => {
            return Err(AnalyzerError::Timeout(format!(
                "TCP connect to {hostname}:{port} ({TCP_CONNECT_TIMEOUT_SECS}s)"
            )));
        }
    };

    let connector = TlsConnector::from(Arc::new(client_config()?));
    let tls_stream = match tokio::time::timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, sock),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!("TLS handshake failed for {hostname}: {e}");
            return Ok(vec![unavailable(format!(
                "TLS handshake failed ({e}); the server may only offer obsolete protocols."
            ))]);
        }
        Err(_) => {
            return Err(AnalyzerError::Timeout(format!(
                "TLS handshake with {hostname} ({TLS_HANDSHAKE_TIMEOUT_SECS}s)"
            )));
        }
    };

    let connection = tls_stream.get_ref().1;
    let protocol = connection.protocol_version();
    let cipher_suite = connection
        .negotiated_cipher_suite()
        .map(|cs| format!("{:?}", cs.suite()));

    let mut findings = vec![assess_protocol(protocol, cipher_suite)];

    let Some(leaf) = connection.peer_certificates().and_then(|c| c.first()) else {
        findings.push(Finding::fail(
            "ssl_certificate",
            "Certificate",
            CATEGORY,
            "Server presented no certificate.",
        ));
        return Ok(findings);
    };
    let summary = summarize(leaf.as_ref())?;
    findings.extend(assess_certificate(
        &summary,
        hostname,
        chrono::Utc::now().timestamp(),
    ));
    Ok(findings)
}

fn unavailable(description: String) -> Finding {
    Finding::fail("ssl_available", "HTTPS Availability", CATEGORY, description)
}

pub(crate) fn assess_protocol(
    protocol: Option<ProtocolVersion>,
    cipher_suite: Option<String>,
) -> Finding {
    let details = FindingDetails::new(ID)
        .with("protocol", protocol.map(|p| format!("{p:?}")))
        .with("cipher_suite", cipher_suite);
    match protocol {
        Some(ProtocolVersion::TLSv1_3) => Finding::pass(
            "ssl_protocol",
            "TLS Protocol",
            CATEGORY,
            "Server negotiates TLS 1.3.",
        ),
        Some(ProtocolVersion::TLSv1_2) => Finding::pass(
            "ssl_protocol",
            "TLS Protocol",
            CATEGORY,
            "Server negotiates TLS 1.2 (TLS 1.3 is preferred).",
        ),
        _ => Finding::warn(
            "ssl_protocol",
            "TLS Protocol",
            CATEGORY,
            "Negotiated protocol version could not be determined.",
        ),
    }
    .with_details(details)
}

/// Case-insensitive hostname match with single-label wildcard support.
pub(crate) fn hostname_matches(hostname: &str, pattern: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(suffix) => hostname
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
        None => hostname == pattern,
    }
}

pub(crate) fn assess_certificate(cert: &CertSummary, hostname: &str, now: i64) -> Vec<Finding> {
    let days_left = (cert.not_after - now).div_euclid(86_400);
    let validity_details = FindingDetails::new(ID)
        .with("not_before", cert.not_before)
        .with("not_after", cert.not_after)
        .with("days_left", days_left);

    let expiry = if now > cert.not_after {
        Finding::fail(
            "ssl_certificate_expiry",
            "Certificate Expiry",
            CATEGORY,
            "Certificate has expired.",
        )
    } else if now < cert.not_before {
        Finding::fail(
            "ssl_certificate_expiry",
            "Certificate Expiry",
            CATEGORY,
            "Certificate is not yet valid.",
        )
    } else if days_left < EXPIRY_WARNING_DAYS {
        Finding::warn(
            "ssl_certificate_expiry",
            "Certificate Expiry",
            CATEGORY,
            format!("Certificate expires in {days_left} day(s)."),
        )
    } else {
        Finding::pass(
            "ssl_certificate_expiry",
            "Certificate Expiry",
            CATEGORY,
            format!("Certificate is valid for another {days_left} days."),
        )
    }
    .with_details(validity_details);

    let issuer_details = FindingDetails::new(ID)
        .with("subject", cert.subject.as_str())
        .with("issuer", cert.issuer.as_str());
    let issuer = if cert.subject == cert.issuer {
        Finding::fail(
            "ssl_certificate_issuer",
            "Certificate Issuer",
            CATEGORY,
            "Certificate is self-signed and will not be trusted by browsers.",
        )
    } else {
        Finding::pass(
            "ssl_certificate_issuer",
            "Certificate Issuer",
            CATEGORY,
            format!("Certificate issued by {}.", cert.issuer),
        )
    }
    .with_details(issuer_details);

    let names: Vec<&str> = if cert.sans.is_empty() {
        cert.common_name.iter().map(String::as_str).collect()
    } else {
        cert.sans.iter().map(String::as_str).collect()
    };
    let name_details = FindingDetails::new(ID).with("names", names.clone());
    let name_match = if names.iter().any(|n| hostname_matches(hostname, n)) {
        Finding::pass(
            "ssl_certificate_hostname",
            "Certificate Hostname",
            CATEGORY,
            format!("Certificate covers {hostname}."),
        )
    } else {
        Finding::fail(
            "ssl_certificate_hostname",
            "Certificate Hostname",
            CATEGORY,
            format!("Certificate does not cover {hostname}."),
        )
    }
    .with_details(name_details);

    vec![expiry, issuer, name_match]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckStatus;

    const DAY: i64 = 86_400;
    const NOW: i64 = 1_760_000_000;

    fn cert(days_left: i64) -> CertSummary {
        CertSummary {
            subject: "CN=example.com".to_string(),
            issuer: "CN=R11, O=Let's Encrypt, C=US".to_string(),
            common_name: Some("example.com".to_string()),
            sans: vec!["example.com".to_string(), "*.example.com".to_string()],
            not_before: NOW - 60 * DAY,
            not_after: NOW + days_left * DAY,
        }
    }

    #[test]
    fn test_hostname_matches() {
        assert!(hostname_matches("example.com", "EXAMPLE.com"));
        assert!(hostname_matches("www.example.com", "*.example.com"));
        assert!(!hostname_matches("example.com", "*.example.com"));
        assert!(!hostname_matches("a.b.example.com", "*.example.com"));
        assert!(!hostname_matches("example.org", "example.com"));
    }

    #[test]
    fn test_healthy_certificate() {
        let findings = assess_certificate(&cert(90), "www.example.com", NOW);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.status == CheckStatus::Pass));
    }

    #[test]
    fn test_expiring_and_expired() {
        let soon = assess_certificate(&cert(5), "example.com", NOW);
        assert_eq!(soon[0].status, CheckStatus::Warn);
        let expired = assess_certificate(&cert(-1), "example.com", NOW);
        assert_eq!(expired[0].status, CheckStatus::Fail);
        assert!(expired[0].description.contains("expired"));
    }

    #[test]
    fn test_self_signed_and_mismatch() {
        let mut c = cert(90);
        c.issuer = c.subject.clone();
        c.sans = vec!["other.test".to_string()];
        let findings = assess_certificate(&c, "example.com", NOW);
        assert_eq!(findings[1].status, CheckStatus::Fail);
        assert_eq!(findings[2].status, CheckStatus::Fail);
    }

    #[test]
    fn test_common_name_fallback() {
        let mut c = cert(90);
        c.sans.clear();
        let findings = assess_certificate(&c, "example.com", NOW);
        assert_eq!(findings[2].status, CheckStatus::Pass);
    }

    #[test]
    fn test_protocol_assessment() {
        assert_eq!(
            assess_protocol(Some(ProtocolVersion::TLSv1_3), None).status,
            CheckStatus::Pass
        );
        assert_eq!(assess_protocol(None, None).status, CheckStatus::Warn);
    }

    #[test]
    fn test_tls_port() {
        assert_eq!(tls_port("https://example.com/"), 443);
        assert_eq!(tls_port("https://example.com:8443/"), 8443);
        assert_eq!(tls_port("http://example.com:8080/"), 443);
    }

    #[tokio::test]
    async fn test_closed_port_reports_unavailable() {
        let input = AnalyzerInput::default()
            .with_hostname("127.0.0.1")
            .with_urls("https://127.0.0.1:1/", "https://127.0.0.1:1/");
        let findings = SslTlsAnalyzer.analyze(input).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "ssl_available");
        assert_eq!(findings[0].status, CheckStatus::Fail);
    }
}
