// # nsupdate-action - One-shot TSIG-signed DNS update
//
// This binary is a THIN invocation layer ONLY:
// - DO NOT add DNS logic or retry logic here
// - Message building, signing and classification live in
//   ddns-provider-rfc2136
// - Argument defaults and validation live in ddns-core
//
// The action is responsible for:
// 1. Reading arguments (JSON args file or environment variables)
// 2. Validating them
// 3. Running exactly one update
// 4. Printing the JSON report and exiting with a status code
//
// ## Arguments
//
// Either pass the path of a JSON args file as the only argument, or set:
//
// - `NSUPDATE_KEYNAME`: TSIG key name (required)
// - `NSUPDATE_SECRET`: Base64 TSIG secret (required)
// - `NSUPDATE_KEYALGO`: hmac-md5 (default), hmac-sha1, hmac-sha224,
//   hmac-sha256, hmac-sha384, hmac-sha512
// - `NSUPDATE_MNAME`: Authoritative master (required)
// - `NSUPDATE_PORT`: Master UDP port (default 53)
// - `NSUPDATE_ZONE`: Zone (required)
// - `NSUPDATE_DOMAIN`: Record name (required)
// - `NSUPDATE_A`, `NSUPDATE_AAAA`, `NSUPDATE_CNAME`, `NSUPDATE_TXT`: Record data
// - `NSUPDATE_TTL`: TTL of added records (default 3600)
// - `NSUPDATE_OP`: add (default), delete, replace
// - `NSUPDATE_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export NSUPDATE_KEYNAME=ddns-key
// export NSUPDATE_SECRET=c2VjcmV0
// export NSUPDATE_MNAME=ns1.example.org
// export NSUPDATE_ZONE=example.org
// export NSUPDATE_DOMAIN=www
// export NSUPDATE_A=10.0.0.5
//
// nsupdate-action
// ```

use anyhow::{Context, Result};
use ddns_core::{ActionArgs, ActionReport, UpdateRequest};
use ddns_provider_rfc2136::Rfc2136Client;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the action
///
/// - 0: Update applied
/// - 1: Configuration or startup error
/// - 2: Update failed
#[derive(Debug, Clone, Copy)]
enum ActionExitCode {
    /// The master accepted the update
    Success = 0,
    /// Invalid arguments or startup failure
    ConfigError = 1,
    /// The update was sent but failed, or could not be sent
    UpdateFailed = 2,
}

impl From<ActionExitCode> for ExitCode {
    fn from(code: ActionExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    let log_level = match env::var("NSUPDATE_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the report only
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ActionExitCode::ConfigError.into();
    }

    let request = match load_request() {
        Ok(request) => request,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ActionExitCode::ConfigError.into();
        }
    };

    info!(
        "Updating {} in {} on {} ({})",
        request.record_name, request.zone, request.master, request.operation
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ActionExitCode::ConfigError.into();
        }
    };

    let report = rt.block_on(run_update(&request));

    match serde_json::to_string(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to encode report: {}", e);
            return ActionExitCode::UpdateFailed.into();
        }
    }

    if report.failed {
        error!("{}", report.msg);
        ActionExitCode::UpdateFailed.into()
    } else {
        info!("{}", report.msg);
        ActionExitCode::Success.into()
    }
}

/// Load and validate the arguments
///
/// A JSON args file given as the first argument takes precedence over the
/// environment.
fn load_request() -> Result<UpdateRequest> {
    let args = match env::args_os().nth(1) {
        Some(path) => ActionArgs::from_json_file(&path)
            .with_context(|| format!("cannot load args file {}", path.to_string_lossy()))?,
        None => ActionArgs::from_env().context("cannot load arguments from environment")?,
    };

    tracing::debug!("Arguments: {:?}", args);

    Ok(args.into_request()?)
}

/// Run the update once and build the report
async fn run_update(request: &UpdateRequest) -> ActionReport {
    let client = Rfc2136Client::new();
    let outcome = client.execute(request).await;
    ActionReport::from_outcome(request, &outcome)
}
