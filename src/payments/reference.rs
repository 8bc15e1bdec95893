use rand::RngCore;

use crate::config::EXTERNAL_REFERENCE_SEPARATOR as SEP;
use crate::error_handling::IntegrationError;

/// The `email|||url|||nonce` triple tying a checkout to its payment notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub email: String,
    pub url: String,
    pub nonce: String,
}

impl ExternalReference {
    /// A fresh reference with a random nonce.
    pub fn new(email: impl Into<String>, url: impl Into<String>) -> Self {
        let mut bytes = [0u8; 8];
        rand::rng().fill_bytes(&mut bytes);
        Self {
            email: email.into(),
            url: url.into(),
            nonce: bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{SEP}{}{SEP}{}", self.email, self.url, self.nonce)
    }

    /// Parses the wire form. The nonce is taken from the right and the email
    /// from the left, so a URL containing the separator still round-trips.
    pub fn parse(raw: &str) -> Result<Self, IntegrationError> {
        let malformed = || IntegrationError::Malformed {
            service: "external reference",
            message: format!("expected email{SEP}url{SEP}nonce, got {raw:?}"),
        };
        let (rest, nonce) = raw.rsplit_once(SEP).ok_or_else(malformed)?;
        let (email, url) = rest.split_once(SEP).ok_or_else(malformed)?;
        if email.is_empty() || url.is_empty() || nonce.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            email: email.to_string(),
            url: url.to_string(),
            nonce: nonce.to_string(),
        })
    }
}
