//! Mail-authentication and certificate-authority DNS records (SPF, DMARC, CAA).

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use log::warn;

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::config::DNS_TIMEOUT_SECS;
use crate::error_handling::AnalyzerError;
use crate::models::{Finding, FindingDetails};

const ID: &str = "dns_records";
const CATEGORY: &str = "DNS";

pub struct DnsRecordsAnalyzer {
    resolver: Arc<TokioAsyncResolver>,
}

impl DnsRecordsAnalyzer {
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self { resolver }
    }

    /// Records of one type, or an empty list when the name has none.
    ///
    /// Timeouts and transport failures are propagated so the analyzer can be
    /// reported as failed rather than as "no records".
    async fn lookup(&self, name: &str, kind: RecordType) -> Result<Vec<String>, AnalyzerError> {
        // The resolver's own per-attempt timeout is the primary bound; this
        // caps the sum of its attempts.
        let budget = Duration::from_secs(DNS_TIMEOUT_SECS * 2);
        let result = tokio::time::timeout(budget, self.resolver.lookup(name, kind))
            .await
            .map_err(|_| AnalyzerError::Timeout(format!("{kind} lookup for {name}")))?;

        match result {
            Ok(lookup) => Ok(lookup
                .iter()
                .filter_map(|rdata| match rdata {
                    // TXT records can hold several strings; join them
                    RData::TXT(txt) => Some(
                        txt.iter()
                            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                            .collect::<Vec<String>>()
                            .join(""),
                    ),
                    RData::CAA(_) => Some(rdata.to_string()),
                    _ => None,
                })
                .collect()),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("no records found") || error_msg.contains("NXDomain") {
                    Ok(Vec::new())
                } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
                    warn!("{kind} record lookup timed out for {name}: {e}");
                    Err(AnalyzerError::Timeout(format!("{kind} lookup for {name}")))
                } else {
                    warn!("Failed to lookup {kind} records for {name}: {e}");
                    Err(AnalyzerError::Network(error_msg))
                }
            }
        }
    }
}

impl Analyzer for DnsRecordsAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Hostname]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move {
            let hostname = input.hostname()?;
            let domain = registrable_name(hostname);
            if domain.is_empty() || domain.parse::<std::net::IpAddr>().is_ok() {
                return Err(AnalyzerError::InvalidInput(format!(
                    "{hostname} is not a DNS name"
                )));
            }
            let dmarc_name = format!("_dmarc.{domain}");

            let (txt, dmarc, caa) = tokio::join!(
                self.lookup(domain, RecordType::TXT),
                self.lookup(&dmarc_name, RecordType::TXT),
                self.lookup(domain, RecordType::CAA),
            );

            Ok(vec![assess_spf(&txt?), assess_dmarc(&dmarc?), assess_caa(&caa?)])
        })
    }
}

/// Hostname with a leading `www.` removed; mail policy lives on the apex.
pub(crate) fn registrable_name(hostname: &str) -> &str {
    let host = hostname.trim_end_matches('.');
    host.strip_prefix("www.").unwrap_or(host)
}

pub(crate) fn assess_spf(txt_records: &[String]) -> Finding {
    const NAME: &str = "SPF Record";
    let Some(spf) = txt_records
        .iter()
        .find(|r| r.trim_start().to_ascii_lowercase().starts_with("v=spf1"))
    else {
        return Finding::fail(
            "spf",
            NAME,
            CATEGORY,
            "No SPF record; anyone can send mail claiming to be this domain.",
        );
    };

    let lower = spf.to_ascii_lowercase();
    let details = FindingDetails::new(ID).with("record", spf.as_str());
    if lower.contains("+all") || lower.ends_with(" all") {
        Finding::fail(
            "spf",
            NAME,
            CATEGORY,
            "SPF record authorises every sender (+all).",
        )
    } else if lower.contains("?all") {
        Finding::warn(
            "spf",
            NAME,
            CATEGORY,
            "SPF record is neutral (?all) and does not reject spoofed mail.",
        )
    } else if lower.contains("-all") || lower.contains("~all") {
        Finding::pass("spf", NAME, CATEGORY, "SPF record restricts senders.")
    } else {
        Finding::warn(
            "spf",
            NAME,
            CATEGORY,
            "SPF record has no terminating 'all' mechanism.",
        )
    }
    .with_details(details)
}

pub(crate) fn assess_dmarc(txt_records: &[String]) -> Finding {
    const NAME: &str = "DMARC Policy";
    let Some(record) = txt_records
        .iter()
        .find(|r| r.trim_start().to_ascii_lowercase().starts_with("v=dmarc1"))
    else {
        return Finding::fail(
            "dmarc",
            NAME,
            CATEGORY,
            "No DMARC record; spoofed mail is not reported or rejected.",
        );
    };

    let policy = record
        .split(';')
        .map(str::trim)
        .find_map(|tag| tag.strip_prefix("p="))
        .map(|p| p.trim().to_ascii_lowercase());
    let details = FindingDetails::new(ID)
        .with("record", record.as_str())
        .with("policy", policy.clone());

    match policy.as_deref() {
        Some("reject") | Some("quarantine") => Finding::pass(
            "dmarc",
            NAME,
            CATEGORY,
            "DMARC policy enforces authentication.",
        ),
        Some("none") => Finding::warn(
            "dmarc",
            NAME,
            CATEGORY,
            "DMARC policy is p=none (monitoring only).",
        ),
        _ => Finding::warn(
            "dmarc",
            NAME,
            CATEGORY,
            "DMARC record has no valid policy tag.",
        ),
    }
    .with_details(details)
}

pub(crate) fn assess_caa(records: &[String]) -> Finding {
    const NAME: &str = "CAA Record";
    if records.is_empty() {
        Finding::warn(
            "caa",
            NAME,
            CATEGORY,
            "No CAA record; any certificate authority may issue for this domain.",
        )
    } else {
        Finding::pass(
            "caa",
            NAME,
            CATEGORY,
            "CAA record restricts which authorities may issue certificates.",
        )
        .with_details(FindingDetails::new(ID).with("records", records.to_vec()))
    }
}
