// # ddns-core
//
// Core library for TSIG-signed RFC 2136 dynamic DNS updates.
//
// ## Architecture Overview
//
// This library provides the types every update implementation shares:
// - **UpdateRequest**: What to change, where, and with which TSIG key
// - **UpdateOutcome**: Typed success/failure code of one update
// - **DnsUpdater**: Trait for applying one update against a master
// - **UpdateTransport**: Trait for the single network exchange of an update
// - **ActionArgs / ActionReport**: The action's invocation arguments and
//   the report it gives back to its caller
//
// ## Design Principles
//
// 1. **Single-shot**: One request, one round trip, no retries
// 2. **No escaping errors**: Updaters fold every failure into an outcome code
// 3. **Stateless**: Nothing outlives an invocation
// 4. **Library-First**: The action binary is a thin layer over this crate

pub mod config;
pub mod error;
pub mod outcome;
pub mod request;
pub mod traits;

// Re-export core types for convenience
pub use config::ActionArgs;
pub use error::{Error, Result};
pub use outcome::{ActionReport, OutcomeCode, UpdateOutcome};
pub use request::{KeyAlgorithm, Operation, RecordType, TsigKey, UpdateRequest};
pub use traits::{DnsUpdater, TransportError, UpdateTransport};
