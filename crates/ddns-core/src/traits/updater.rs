// # DNS Updater Trait
//
// Defines the interface for applying one dynamic update to an
// authoritative master.
//
// ## Implementations
//
// - RFC 2136 + TSIG: `ddns-provider-rfc2136` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsUpdater, RecordType, UpdateRequest};
//
// let request = UpdateRequest::new("ddns-key", secret, "ns1.example.org", "example.org", "www")
//     .with_record(RecordType::A, "10.0.0.5");
//
// let outcome = updater.execute(&request).await;
// if !outcome.success {
//     eprintln!("update failed: {}", outcome.code);
// }
// ```

use crate::outcome::UpdateOutcome;
use crate::request::UpdateRequest;
use async_trait::async_trait;

/// Trait for dynamic DNS updaters
///
/// # Trust Level: Untrusted
///
/// Updaters are single-shot:
/// - ✅ Build, sign and send exactly one update per call
/// - ✅ Classify the answer into an [`UpdateOutcome`]
/// - ❌ Retry, back off, or cache anything between calls
/// - ❌ Let an error escape `execute`; every failure becomes an outcome code
#[async_trait]
pub trait DnsUpdater: Send + Sync {
    /// Apply `request` against its master and classify the result
    ///
    /// Unknown operations are rejected with
    /// [`OutcomeCode::UnknownOperation`](crate::OutcomeCode::UnknownOperation)
    /// before anything is sent.
    async fn execute(&self, request: &UpdateRequest) -> UpdateOutcome;

    /// Get the updater name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
