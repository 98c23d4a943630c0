// # RFC 2136 DNS Provider
//
// This crate applies dynamic DNS updates (RFC 2136) directly against an
// authoritative master, authenticated with a TSIG shared secret (RFC 8945).
//
// ## What one `execute` call does
//
// 1. Reject an unknown operation before touching the network
// 2. Derive the TSIG key from (key name, secret, algorithm)
// 3. Build the update message scoped to the zone
// 4. Sign it (HMAC-MD5, -SHA1, -SHA224, -SHA256, -SHA384 or -SHA512)
// 5. Send it over UDP and wait at most 10 seconds for the answer
// 6. Classify the answer into an `UpdateOutcome`
//
// - ✅ Exactly one UDP round trip per call
// - ❌ NO retry logic, NO TCP fallback, NO master discovery
// - ❌ NO state kept between calls
//
// ## Security Requirements
//
// - The TSIG secret NEVER appears in logs or Debug output
// - Responses signed with our key are verified before their rcode is trusted

pub mod message;
pub mod rcode;
pub mod transport;
pub mod tsig;

use async_trait::async_trait;
use ddns_core::{
    DnsUpdater, Operation, OutcomeCode, TransportError, UpdateOutcome, UpdateRequest,
    UpdateTransport,
};
use std::time::Duration;

pub use transport::UdpTransport;
pub use tsig::{ResponseSignature, SignedUpdate, TsigSigner};

/// How long to wait for the master's answer
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Dynamic update client for one authoritative master per request
///
/// # Trust Level: Untrusted
///
/// The client is isolated, stateless, and single-shot. It holds nothing but
/// its transport, so one instance may serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Rfc2136Client<T = UdpTransport> {
    transport: T,
}

impl Rfc2136Client<UdpTransport> {
    /// Create a client speaking real UDP
    pub fn new() -> Self {
        Self::with_transport(UdpTransport::new())
    }
}

impl<T: UpdateTransport> Rfc2136Client<T> {
    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// The client's transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Apply `request` and classify the result
    ///
    /// Never fails: every error path is mapped to an outcome code.
    pub async fn execute(&self, request: &UpdateRequest) -> UpdateOutcome {
        if let Operation::Unknown(op) = &request.operation {
            tracing::warn!("Refusing to send update with unknown operation '{}'", op);
            return UpdateOutcome::failed(OutcomeCode::UnknownOperation);
        }

        let (signer, signed) = match prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!("Cannot build update for {}: {}", request.zone, e);
                return UpdateOutcome::failed(OutcomeCode::Invalid(e.to_string()));
            }
        };

        tracing::info!(
            "Sending update {}: {} {} {:?} in {} to {}:{}",
            signed.id,
            request.operation,
            request.record_name,
            request.records.keys().map(|t| t.as_str()).collect::<Vec<_>>(),
            request.zone,
            request.master,
            request.port
        );

        let response = match self
            .transport
            .send_udp(&request.master, request.port, &signed.wire, UPDATE_TIMEOUT)
            .await
        {
            Ok(response) => response,
            Err(TransportError::Timeout(waited)) => {
                tracing::warn!("No answer from {} within {:?}", request.master, waited);
                return UpdateOutcome::failed(OutcomeCode::Timeout);
            }
            Err(e) => {
                tracing::warn!("Update to {} failed: {}", request.master, e);
                return UpdateOutcome::failed(OutcomeCode::Network(e.to_string()));
            }
        };

        let outcome = classify(&signer, &signed, &response, tsig::unix_now());
        if outcome.success {
            tracing::info!("Update on {} answered {}", request.master, outcome.code);
        } else {
            tracing::warn!("Update on {} failed: {}", request.master, outcome.code);
        }
        outcome
    }
}

#[async_trait]
impl<T: UpdateTransport> DnsUpdater for Rfc2136Client<T> {
    async fn execute(&self, request: &UpdateRequest) -> UpdateOutcome {
        Rfc2136Client::execute(self, request).await
    }

    fn provider_name(&self) -> &'static str {
        "rfc2136"
    }
}

/// Build and sign the update for `request`
pub fn prepare(request: &UpdateRequest) -> ddns_core::Result<(TsigSigner, SignedUpdate)> {
    let key = request.tsig_key()?;
    let signer = TsigSigner::new(&key)?;
    let message = message::build_update(request, rand::random())?;
    let signed = signer.sign(message, tsig::unix_now())?;
    Ok((signer, signed))
}

/// Classify the master's answer to `signed`
///
/// TSIG errors take precedence over the response code.
pub fn classify(
    signer: &TsigSigner,
    signed: &SignedUpdate,
    response: &[u8],
    now: u64,
) -> UpdateOutcome {
    match signer.verify_response(response, &signed.mac, now) {
        ResponseSignature::PeerError(tsig::TSIG_ERROR_BADKEY) => {
            return UpdateOutcome::failed(OutcomeCode::BadKey);
        }
        ResponseSignature::PeerError(tsig::TSIG_ERROR_BADSIG) => {
            return UpdateOutcome::failed(OutcomeCode::BadPeerSig);
        }
        ResponseSignature::PeerError(error) => {
            return UpdateOutcome::failed(OutcomeCode::Rcode(tsig::tsig_error_text(error)));
        }
        ResponseSignature::Expired => {
            return UpdateOutcome::failed(OutcomeCode::Rcode(tsig::tsig_error_text(
                tsig::TSIG_ERROR_BADTIME,
            )));
        }
        ResponseSignature::Invalid => {
            return UpdateOutcome::failed(OutcomeCode::BadSignature);
        }
        ResponseSignature::Unsigned => {
            tracing::warn!("Answer to update {} is not TSIG-signed", signed.id);
        }
        ResponseSignature::Verified => {
            tracing::debug!("Answer to update {} verified", signed.id);
        }
    }

    match rcode::decode_rcode(response) {
        Ok(code) if code == "REFUSED" => UpdateOutcome::failed(OutcomeCode::Refused),
        Ok(code) => UpdateOutcome::answered(code),
        Err(e) => UpdateOutcome::failed(OutcomeCode::Invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::RecordType;

    #[test]
    fn test_provider_name() {
        let client = Rfc2136Client::new();
        assert_eq!(DnsUpdater::provider_name(&client), "rfc2136");
    }

    #[test]
    fn test_timeout_is_ten_seconds() {
        assert_eq!(UPDATE_TIMEOUT, Duration::from_secs(10));
    }

    #[test]
    fn test_prepare_signs_request() {
        let request = UpdateRequest::new("ddns-key", "c2VjcmV0", "127.0.0.1", "example.org", "www")
            .with_record(RecordType::A, "10.0.0.5");

        let (signer, signed) = prepare(&request).unwrap();
        assert_eq!(signer.key_name().to_ascii(), "ddns-key.");
        assert_eq!(signed.mac.len(), 16);
        assert_eq!(u16::from_be_bytes([signed.wire[0], signed.wire[1]]), signed.id);
    }

    #[test]
    fn test_prepare_rejects_bad_secret() {
        let request = UpdateRequest::new("ddns-key", "%%%", "127.0.0.1", "example.org", "www")
            .with_record(RecordType::A, "10.0.0.5");
        assert!(prepare(&request).is_err());
    }
}
