//! Test doubles and common utilities for update contract tests
//!
//! The transport double never touches the network. It answers each request
//! with whatever the test's reply function builds from the request bytes,
//! so answers can echo the message id and sign with the request MAC.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ddns_core::{KeyAlgorithm, RecordType, TransportError, UpdateRequest, UpdateTransport};
use ddns_provider_rfc2136::tsig::{compute_mac, parse_tsig, unix_now};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET: &[u8] = b"test-secret-bytes";
pub const KEY_NAME: &str = "ddns-key";

type ReplyFn = dyn Fn(&[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync;

/// Transport double that records every payload it is asked to send
pub struct RecordingTransport {
    reply: Arc<ReplyFn>,
    send_call_count: Arc<AtomicUsize>,
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingTransport {
    /// Answer every request with `reply(request)`
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync + 'static,
    {
        Self {
            reply: Arc::new(reply),
            send_call_count: Arc::new(AtomicUsize::new(0)),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with a plain response carrying `code`
    pub fn answering(code: ResponseCode) -> Self {
        Self::new(move |request| Ok(answer(request, code)))
    }

    /// Never answer
    pub fn silent() -> Self {
        Self::new(|_| Err(TransportError::Timeout(Duration::from_secs(10))))
    }

    /// Get the number of times send_udp() was called
    pub fn send_call_count(&self) -> usize {
        self.send_call_count.load(Ordering::SeqCst)
    }

    /// Every payload sent so far
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }

    /// Create a transport that shares counters with this one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            reply: Arc::clone(&other.reply),
            send_call_count: Arc::clone(&other.send_call_count),
            payloads: Arc::clone(&other.payloads),
        }
    }
}

#[async_trait::async_trait]
impl UpdateTransport for RecordingTransport {
    async fn send_udp(
        &self,
        _master: &str,
        _port: u16,
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.send_call_count.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.to_vec());
        (self.reply)(payload)
    }
}

/// The request every contract test starts from
pub fn www_request() -> UpdateRequest {
    UpdateRequest::new(KEY_NAME, STANDARD.encode(SECRET), "127.0.0.1", "example.org", "www")
        .with_algorithm(KeyAlgorithm::HmacMd5)
        .with_record(RecordType::A, "10.0.0.5")
        .with_ttl(3600)
}

/// Message id of an encoded message
pub fn message_id(wire: &[u8]) -> u16 {
    u16::from_be_bytes([wire[0], wire[1]])
}

/// MAC carried by a signed request
pub fn request_mac(request: &[u8]) -> Vec<u8> {
    parse_tsig(request)
        .unwrap()
        .expect("request is not TSIG-signed")
        .mac
}

fn response_message(request: &[u8], code: ResponseCode) -> Message {
    let mut message = Message::new();
    message
        .set_id(message_id(request))
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Update)
        .set_response_code(code);
    message
}

/// Uncompressed wire name, letters kept as written
pub fn wire_name(name: &str) -> Vec<u8> {
    let mut wire = Vec::new();
    for label in name.trim_end_matches('.').split('.') {
        wire.push(label.len() as u8);
        wire.extend(label.as_bytes());
    }
    wire.push(0);
    wire
}

/// How a stub master signs its answer
pub struct MasterTsig<'a> {
    /// Owner name of the TSIG record
    pub key_name: &'a str,
    /// Algorithm name written into the TSIG record
    pub algorithm_name: &'a str,
    pub algorithm: KeyAlgorithm,
    pub secret: &'a [u8],
    pub time_signed: u64,
    pub error: u16,
}

impl<'a> MasterTsig<'a> {
    /// Sign like BIND: lowercase algorithm name, shared secret, current time
    pub fn bind_style(algorithm: KeyAlgorithm) -> Self {
        Self {
            key_name: KEY_NAME,
            algorithm_name: algorithm_identifier_lowercase(algorithm),
            algorithm,
            secret: SECRET,
            time_signed: unix_now(),
            error: 0,
        }
    }
}

fn algorithm_identifier_lowercase(algorithm: KeyAlgorithm) -> &'static str {
    match algorithm {
        KeyAlgorithm::HmacMd5 => "hmac-md5.sig-alg.reg.int.",
        KeyAlgorithm::HmacSha1 => "hmac-sha1.",
        KeyAlgorithm::HmacSha224 => "hmac-sha224.",
        KeyAlgorithm::HmacSha256 => "hmac-sha256.",
        KeyAlgorithm::HmacSha384 => "hmac-sha384.",
        KeyAlgorithm::HmacSha512 => "hmac-sha512.",
    }
}

fn time_bytes(time: u64) -> Vec<u8> {
    time.to_be_bytes()[2..].to_vec()
}

/// Append a TSIG record to `message` the way a master does
///
/// With `request_mac` the MAC covers it as the prior digest; error answers
/// pass `None` and carry no MAC.
fn signed_by_master(
    message: Message,
    request: &[u8],
    tsig: &MasterTsig<'_>,
    request_mac: Option<&[u8]>,
) -> Vec<u8> {
    let mut wire = message.to_vec().unwrap();
    let key = wire_name(tsig.key_name);
    let algorithm = wire_name(tsig.algorithm_name);

    let mac = match request_mac {
        Some(prior) => {
            let mut tbs = (prior.len() as u16).to_be_bytes().to_vec();
            tbs.extend(prior);
            tbs.extend(&wire);
            tbs.extend(wire_name(&tsig.key_name.to_ascii_lowercase()));
            tbs.extend([0x00, 0xff, 0, 0, 0, 0]);
            tbs.extend(wire_name(&tsig.algorithm_name.to_ascii_lowercase()));
            tbs.extend(time_bytes(tsig.time_signed));
            tbs.extend(300u16.to_be_bytes());
            tbs.extend(tsig.error.to_be_bytes());
            tbs.extend([0, 0]);
            compute_mac(tsig.algorithm, tsig.secret, &tbs).unwrap()
        }
        None => Vec::new(),
    };

    let mut rdata = algorithm;
    rdata.extend(time_bytes(tsig.time_signed));
    rdata.extend(300u16.to_be_bytes());
    rdata.extend((mac.len() as u16).to_be_bytes());
    rdata.extend(&mac);
    rdata.extend(message_id(request).to_be_bytes());
    rdata.extend(tsig.error.to_be_bytes());
    rdata.extend([0, 0]);

    wire[11] += 1;
    wire.extend(key);
    wire.extend([0x00, 0xfa, 0x00, 0xff, 0, 0, 0, 0]);
    wire.extend((rdata.len() as u16).to_be_bytes());
    wire.extend(rdata);
    wire
}

/// Unsigned response to `request`
pub fn answer(request: &[u8], code: ResponseCode) -> Vec<u8> {
    response_message(request, code).to_vec().unwrap()
}

/// Response reporting TSIG `error`, without a MAC, as masters send for
/// BADKEY and BADSIG
pub fn answer_with_tsig_error(request: &[u8], error: u16) -> Vec<u8> {
    let tsig = MasterTsig {
        error,
        ..MasterTsig::bind_style(KeyAlgorithm::HmacMd5)
    };
    signed_by_master(response_message(request, ResponseCode::NotAuth), request, &tsig, None)
}

/// Response signed as described by `tsig`, chained to the request's MAC
pub fn answer_signed_by(request: &[u8], code: ResponseCode, tsig: &MasterTsig<'_>) -> Vec<u8> {
    let prior = request_mac(request);
    signed_by_master(response_message(request, code), request, tsig, Some(&prior))
}

/// Response signed with `secret` as of `time_signed`, chained to the
/// request's MAC
pub fn signed_answer(
    request: &[u8],
    code: ResponseCode,
    algorithm: KeyAlgorithm,
    secret: &[u8],
    time_signed: u64,
) -> Vec<u8> {
    let tsig = MasterTsig {
        secret,
        time_signed,
        ..MasterTsig::bind_style(algorithm)
    };
    answer_signed_by(request, code, &tsig)
}

/// Corrupt the first MAC byte of a response whose TSIG record has no
/// other data
pub fn tamper_mac(response: &mut [u8], mac_len: usize) {
    // RDATA ends with: MAC, original id (2), error (2), other len (2)
    let index = response.len() - 6 - mac_len;
    response[index] ^= 0xff;
}
