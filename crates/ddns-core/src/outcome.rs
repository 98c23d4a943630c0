//! Update outcomes and the action report built from them
//!
//! An updater never returns an error from `execute`: every failure path is
//! folded into an [`UpdateOutcome`] carrying a typed [`OutcomeCode`].

use crate::request::UpdateRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an update succeeded or failed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutcomeCode {
    /// The master does not know the TSIG key
    BadKey,
    /// The master rejected our TSIG signature
    BadPeerSig,
    /// No response within the update timeout
    Timeout,
    /// The master refused the update by policy
    Refused,
    /// The requested operation is not add, delete or replace
    UnknownOperation,
    /// The response signature failed local verification
    BadSignature,
    /// The request could not be encoded
    Invalid(String),
    /// Transport failure other than a timeout
    Network(String),
    /// Response code (or TSIG error) mnemonic as sent by the master
    Rcode(String),
}

impl OutcomeCode {
    /// Whether this is the literal `NOTAUTH` response code
    pub fn is_notauth(&self) -> bool {
        matches!(self, OutcomeCode::Rcode(code) if code == "NOTAUTH")
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeCode::BadKey => f.write_str("BADKEY"),
            OutcomeCode::BadPeerSig => f.write_str("BADPEERSIG"),
            OutcomeCode::Timeout => f.write_str("TIMEOUT"),
            OutcomeCode::Refused => f.write_str("REFUSED"),
            OutcomeCode::UnknownOperation => f.write_str("UNKNOWNOPERATION"),
            OutcomeCode::BadSignature => f.write_str("BADSIG"),
            OutcomeCode::Invalid(detail) => write!(f, "INVALID: {}", detail),
            OutcomeCode::Network(detail) => write!(f, "NETWORK: {}", detail),
            OutcomeCode::Rcode(code) => f.write_str(code),
        }
    }
}

impl From<String> for OutcomeCode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "BADKEY" => OutcomeCode::BadKey,
            "BADPEERSIG" => OutcomeCode::BadPeerSig,
            "TIMEOUT" => OutcomeCode::Timeout,
            "REFUSED" => OutcomeCode::Refused,
            "UNKNOWNOPERATION" => OutcomeCode::UnknownOperation,
            "BADSIG" => OutcomeCode::BadSignature,
            _ => {
                if let Some(detail) = s.strip_prefix("INVALID: ") {
                    OutcomeCode::Invalid(detail.to_string())
                } else if let Some(detail) = s.strip_prefix("NETWORK: ") {
                    OutcomeCode::Network(detail.to_string())
                } else {
                    OutcomeCode::Rcode(s)
                }
            }
        }
    }
}

impl From<OutcomeCode> for String {
    fn from(code: OutcomeCode) -> Self {
        code.to_string()
    }
}

/// Result of one update invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Whether the update round trip succeeded
    pub success: bool,
    /// Outcome code
    pub code: OutcomeCode,
}

impl UpdateOutcome {
    /// A failed outcome
    pub fn failed(code: OutcomeCode) -> Self {
        Self {
            success: false,
            code,
        }
    }

    /// A successful round trip answered with `rcode`
    pub fn answered(rcode: impl Into<String>) -> Self {
        Self {
            success: true,
            code: OutcomeCode::Rcode(rcode.into()),
        }
    }
}

/// What the action reports to its caller
///
/// This is the layer that treats `NOTAUTH` as a failure even though the
/// updater reports it as a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    /// Whether the zone was changed
    pub changed: bool,
    /// Whether the action failed
    pub failed: bool,
    /// Outcome code as text
    pub code: String,
    /// Human-readable summary
    pub msg: String,
}

impl ActionReport {
    /// Build the report for `outcome` of `request`
    pub fn from_outcome(request: &UpdateRequest, outcome: &UpdateOutcome) -> Self {
        let code = outcome.code.to_string();

        if !outcome.success || outcome.code.is_notauth() {
            return Self {
                changed: false,
                failed: true,
                msg: format!(
                    "DNS update on {} failed: {} ({})",
                    request.master, code, request.zone
                ),
                code,
            };
        }

        Self {
            changed: true,
            failed: false,
            msg: format!(
                "DNS update on {} succeeded: {} ({})",
                request.master, code, request.zone
            ),
            code,
        }
    }
}
