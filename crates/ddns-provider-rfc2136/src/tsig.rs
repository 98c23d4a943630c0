//! TSIG signing and response verification (RFC 8945)
//!
//! The TSIG record and the digest input are assembled here byte by byte.
//! Key and algorithm names enter the digest in canonical form (lowercase,
//! uncompressed, §4.3.3), which is what BIND and other masters compute.
//! Names read from a response are compared case-insensitively.
//!
//! ```text
//! digest input, request:  message | variables
//! digest input, response: mac size | request mac | message | variables
//! variables:              key name | class ANY | ttl 0 | algorithm name
//!                         | time signed (48 bit) | fudge | error | other len | other
//! ```

use ddns_core::{Error, KeyAlgorithm, Result, TsigKey};
use hickory_proto::op::Message;
use hickory_proto::rr::Name;
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, Restrict};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

/// Permitted clock skew between us and the master, in seconds
pub const DEFAULT_FUDGE: u16 = 300;

/// TSIG RR type
pub const TSIG_TYPE: u16 = 250;
/// Class ANY, the class of every TSIG record
pub const CLASS_ANY: u16 = 255;

/// TSIG error: signature rejected (RFC 8945 §5.2)
pub const TSIG_ERROR_BADSIG: u16 = 16;
/// TSIG error: key not recognised
pub const TSIG_ERROR_BADKEY: u16 = 17;
/// TSIG error: time signed outside the fudge window
pub const TSIG_ERROR_BADTIME: u16 = 18;
/// TSIG error: truncated MAC not acceptable
pub const TSIG_ERROR_BADTRUNC: u16 = 22;

/// Offset of ARCOUNT in the message header
const ARCOUNT_OFFSET: usize = 10;
/// Length of the fixed message header
const HEADER_LEN: usize = 12;

/// Mnemonic of a TSIG error code
pub fn tsig_error_text(error: u16) -> String {
    match error {
        TSIG_ERROR_BADSIG => "BADSIG".to_string(),
        TSIG_ERROR_BADKEY => "BADKEY".to_string(),
        TSIG_ERROR_BADTIME => "BADTIME".to_string(),
        TSIG_ERROR_BADTRUNC => "BADTRUNC".to_string(),
        other => other.to_string(),
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Canonical wire form of a name: lowercase labels, no compression
pub fn canonical_name(name: &Name) -> Vec<u8> {
    let mut wire = Vec::new();
    for label in name.iter() {
        wire.push(label.len() as u8);
        wire.extend(label.iter().map(u8::to_ascii_lowercase));
    }
    wire.push(0);
    wire
}

/// Canonical wire form of an algorithm's identifier
pub fn algorithm_name(algorithm: KeyAlgorithm) -> Vec<u8> {
    let mut wire = Vec::new();
    for label in algorithm.identifier().trim_end_matches('.').split('.') {
        wire.push(label.len() as u8);
        wire.extend(label.bytes().map(|b| b.to_ascii_lowercase()));
    }
    wire.push(0);
    wire
}

/// A signed update ready for the wire
#[derive(Debug, Clone)]
pub struct SignedUpdate {
    /// Encoded message including the TSIG record
    pub wire: Vec<u8>,
    /// Request MAC, the prior digest when verifying the answer
    pub mac: Vec<u8>,
    /// Message id
    pub id: u16,
}

/// TSIG record as found at the end of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigRecord {
    /// Owner name, the key name
    pub key_name: Name,
    /// Algorithm name as sent
    pub algorithm: Name,
    /// Time signed
    pub time_signed: u64,
    /// Permitted skew
    pub fudge: u16,
    /// MAC, empty on most error answers
    pub mac: Vec<u8>,
    /// Message id before any forwarding
    pub original_id: u16,
    /// Extended RCODE
    pub error: u16,
    /// Other data (server time on BADTIME)
    pub other: Vec<u8>,
    /// Offset of the TSIG record in the message
    pub offset: usize,
}

/// What the response's TSIG record says
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSignature {
    /// The response carries no TSIG record
    Unsigned,
    /// The response MAC verified
    Verified,
    /// The master reported a TSIG error
    PeerError(u16),
    /// The response was signed outside the fudge window
    Expired,
    /// The response MAC, key or algorithm does not match
    Invalid,
}

/// Signs requests and verifies answers with one TSIG key
///
/// The Debug implementation intentionally does NOT expose the secret.
pub struct TsigSigner {
    key_name: Name,
    secret: Vec<u8>,
    algorithm: KeyAlgorithm,
    fudge: u16,
}

impl std::fmt::Debug for TsigSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigSigner")
            .field("key_name", &self.key_name)
            .field("secret", &"<REDACTED>")
            .field("algorithm", &self.algorithm)
            .field("fudge", &self.fudge)
            .finish()
    }
}

impl TsigSigner {
    /// Create a signer for `key` with the default fudge
    ///
    /// The key name is lowercased.
    pub fn new(key: &TsigKey) -> Result<Self> {
        let name = key.name().trim().trim_end_matches('.').to_ascii_lowercase();
        let key_name = Name::from_ascii(format!("{}.", name))
            .map_err(|e| Error::tsig(format!("invalid key name '{}': {}", name, e)))?;

        Ok(Self {
            key_name,
            secret: key.secret().to_vec(),
            algorithm: key.algorithm(),
            fudge: DEFAULT_FUDGE,
        })
    }

    /// Key name as an absolute domain name
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Sign `message` as of `time_signed` and encode it
    ///
    /// The TSIG record is appended as the last additional record.
    pub fn sign(&self, message: Message, time_signed: u64) -> Result<SignedUpdate> {
        let id = message.id();
        let mut wire = message
            .to_vec()
            .map_err(|e| Error::encoding(format!("cannot encode message: {}", e)))?;

        let key_name = canonical_name(&self.key_name);
        let algorithm = algorithm_name(self.algorithm);

        let mut tbs = wire.clone();
        tbs.extend(tsig_variables(&key_name, &algorithm, time_signed, self.fudge, 0, &[]));
        let mac = compute_mac(self.algorithm, &self.secret, &tbs)?;

        let rdata = tsig_rdata(&algorithm, time_signed, self.fudge, &mac, id, 0, &[]);
        append_tsig(&mut wire, &key_name, &rdata)?;

        tracing::debug!(
            "Signed update {} with key {} ({}), {} bytes",
            id,
            self.key_name,
            self.algorithm.identifier(),
            wire.len()
        );

        Ok(SignedUpdate { wire, mac, id })
    }

    /// Check the TSIG record of a response to a request signed with `request_mac`
    pub fn verify_response(&self, response: &[u8], request_mac: &[u8], now: u64) -> ResponseSignature {
        let tsig = match parse_tsig(response) {
            Ok(Some(tsig)) => tsig,
            Ok(None) => return ResponseSignature::Unsigned,
            Err(e) => {
                tracing::debug!("Response carries no usable TSIG record: {}", e);
                return ResponseSignature::Unsigned;
            }
        };

        if tsig.error != 0 {
            return ResponseSignature::PeerError(tsig.error);
        }

        let key_name = canonical_name(&self.key_name);
        let algorithm = algorithm_name(self.algorithm);
        if canonical_name(&tsig.key_name) != key_name || canonical_name(&tsig.algorithm) != algorithm {
            return ResponseSignature::Invalid;
        }

        let mut tbs = Vec::with_capacity(response.len() + request_mac.len() + 2);
        tbs.extend((request_mac.len() as u16).to_be_bytes());
        tbs.extend(request_mac);
        tbs.extend(unsigned_message(response, &tsig));
        tbs.extend(tsig_variables(
            &key_name,
            &algorithm,
            tsig.time_signed,
            tsig.fudge,
            tsig.error,
            &tsig.other,
        ));

        if !verify_mac(self.algorithm, &self.secret, &tbs, &tsig.mac) {
            return ResponseSignature::Invalid;
        }

        if now.abs_diff(tsig.time_signed) > u64::from(tsig.fudge) {
            return ResponseSignature::Expired;
        }

        ResponseSignature::Verified
    }
}

/// TSIG variables covered by the MAC (RFC 8945 §4.3.3)
pub fn tsig_variables(
    key_name: &[u8],
    algorithm: &[u8],
    time_signed: u64,
    fudge: u16,
    error: u16,
    other: &[u8],
) -> Vec<u8> {
    let mut variables = Vec::with_capacity(key_name.len() + algorithm.len() + 22 + other.len());
    variables.extend(key_name);
    variables.extend(CLASS_ANY.to_be_bytes());
    variables.extend(0u32.to_be_bytes());
    variables.extend(algorithm);
    variables.extend(time_bytes(time_signed));
    variables.extend(fudge.to_be_bytes());
    variables.extend(error.to_be_bytes());
    variables.extend((other.len() as u16).to_be_bytes());
    variables.extend(other);
    variables
}

/// RDATA of a TSIG record (RFC 8945 §4.2)
fn tsig_rdata(
    algorithm: &[u8],
    time_signed: u64,
    fudge: u16,
    mac: &[u8],
    original_id: u16,
    error: u16,
    other: &[u8],
) -> Vec<u8> {
    let mut rdata = Vec::with_capacity(algorithm.len() + 16 + mac.len() + other.len());
    rdata.extend(algorithm);
    rdata.extend(time_bytes(time_signed));
    rdata.extend(fudge.to_be_bytes());
    rdata.extend((mac.len() as u16).to_be_bytes());
    rdata.extend(mac);
    rdata.extend(original_id.to_be_bytes());
    rdata.extend(error.to_be_bytes());
    rdata.extend((other.len() as u16).to_be_bytes());
    rdata.extend(other);
    rdata
}

/// Append a TSIG record to an encoded message and bump ARCOUNT
fn append_tsig(wire: &mut Vec<u8>, key_name: &[u8], rdata: &[u8]) -> Result<()> {
    if wire.len() < HEADER_LEN {
        return Err(Error::encoding("message shorter than its header"));
    }
    let arcount = u16::from_be_bytes([wire[ARCOUNT_OFFSET], wire[ARCOUNT_OFFSET + 1]])
        .checked_add(1)
        .ok_or_else(|| Error::encoding("too many additional records"))?;
    let rdlength = u16::try_from(rdata.len())
        .map_err(|_| Error::encoding("TSIG record too long"))?;

    wire[ARCOUNT_OFFSET..ARCOUNT_OFFSET + 2].copy_from_slice(&arcount.to_be_bytes());
    wire.extend(key_name);
    wire.extend(TSIG_TYPE.to_be_bytes());
    wire.extend(CLASS_ANY.to_be_bytes());
    wire.extend(0u32.to_be_bytes());
    wire.extend(rdlength.to_be_bytes());
    wire.extend(rdata);
    Ok(())
}

/// The message as it was before signing: TSIG removed, ARCOUNT decremented,
/// original id restored
fn unsigned_message(message: &[u8], tsig: &TsigRecord) -> Vec<u8> {
    let mut unsigned = message[..tsig.offset].to_vec();
    unsigned[..2].copy_from_slice(&tsig.original_id.to_be_bytes());
    let arcount = u16::from_be_bytes([unsigned[ARCOUNT_OFFSET], unsigned[ARCOUNT_OFFSET + 1]]);
    unsigned[ARCOUNT_OFFSET..ARCOUNT_OFFSET + 2]
        .copy_from_slice(&arcount.saturating_sub(1).to_be_bytes());
    unsigned
}

fn time_bytes(time_signed: u64) -> [u8; 6] {
    let bytes = time_signed.to_be_bytes();
    [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

/// Find the TSIG record of an encoded message
///
/// Returns `None` when the last additional record is not a TSIG.
pub fn parse_tsig(message: &[u8]) -> Result<Option<TsigRecord>> {
    if message.len() < HEADER_LEN {
        return Err(Error::encoding("message shorter than its header"));
    }
    let count = |at: usize| usize::from(u16::from_be_bytes([message[at], message[at + 1]]));
    let (queries, answers, authority, additional) = (count(4), count(6), count(8), count(10));
    if additional == 0 {
        return Ok(None);
    }

    let mut decoder = BinDecoder::new(message);
    decoder.read_slice(HEADER_LEN).map_err(malformed)?;

    for _ in 0..queries {
        Name::read(&mut decoder).map_err(malformed)?;
        read_u16(&mut decoder)?;
        read_u16(&mut decoder)?;
    }
    for _ in 0..answers + authority + additional - 1 {
        Name::read(&mut decoder).map_err(malformed)?;
        read_u16(&mut decoder)?;
        read_u16(&mut decoder)?;
        read_u32(&mut decoder)?;
        let rdlength = read_u16(&mut decoder)?;
        decoder.read_slice(usize::from(rdlength)).map_err(malformed)?;
    }

    let offset = decoder.index();
    let key_name = Name::read(&mut decoder).map_err(malformed)?;
    if read_u16(&mut decoder)? != TSIG_TYPE {
        return Ok(None);
    }
    read_u16(&mut decoder)?;
    read_u32(&mut decoder)?;
    read_u16(&mut decoder)?;

    let algorithm = Name::read(&mut decoder).map_err(malformed)?;
    let time_signed = (u64::from(read_u16(&mut decoder)?) << 32) | u64::from(read_u32(&mut decoder)?);
    let fudge = read_u16(&mut decoder)?;
    let mac_size = read_u16(&mut decoder)?;
    let mac = read_bytes(&mut decoder, mac_size)?;
    let original_id = read_u16(&mut decoder)?;
    let error = read_u16(&mut decoder)?;
    let other_len = read_u16(&mut decoder)?;
    let other = read_bytes(&mut decoder, other_len)?;

    Ok(Some(TsigRecord {
        key_name,
        algorithm,
        time_signed,
        fudge,
        mac,
        original_id,
        error,
        other,
        offset,
    }))
}

fn malformed(e: impl std::fmt::Display) -> Error {
    Error::encoding(format!("malformed message: {}", e))
}

fn read_u16(decoder: &mut BinDecoder<'_>) -> Result<u16> {
    decoder.read_u16().map(Restrict::unverified).map_err(malformed)
}

fn read_u32(decoder: &mut BinDecoder<'_>) -> Result<u32> {
    decoder.read_u32().map(Restrict::unverified).map_err(malformed)
}

fn read_bytes(decoder: &mut BinDecoder<'_>, len: u16) -> Result<Vec<u8>> {
    decoder
        .read_slice(usize::from(len))
        .map(|bytes| bytes.unverified().to_vec())
        .map_err(malformed)
}

/// HMAC of `data` under `secret`
pub fn compute_mac(algorithm: KeyAlgorithm, secret: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        KeyAlgorithm::HmacMd5 => hmac_digest::<Hmac<Md5>>(secret, data),
        KeyAlgorithm::HmacSha1 => hmac_digest::<Hmac<Sha1>>(secret, data),
        KeyAlgorithm::HmacSha224 => hmac_digest::<Hmac<Sha224>>(secret, data),
        KeyAlgorithm::HmacSha256 => hmac_digest::<Hmac<Sha256>>(secret, data),
        KeyAlgorithm::HmacSha384 => hmac_digest::<Hmac<Sha384>>(secret, data),
        KeyAlgorithm::HmacSha512 => hmac_digest::<Hmac<Sha512>>(secret, data),
    }
}

/// Constant-time check of `tag` against the HMAC of `data`
pub fn verify_mac(algorithm: KeyAlgorithm, secret: &[u8], data: &[u8], tag: &[u8]) -> bool {
    match algorithm {
        KeyAlgorithm::HmacMd5 => hmac_verify::<Hmac<Md5>>(secret, data, tag),
        KeyAlgorithm::HmacSha1 => hmac_verify::<Hmac<Sha1>>(secret, data, tag),
        KeyAlgorithm::HmacSha224 => hmac_verify::<Hmac<Sha224>>(secret, data, tag),
        KeyAlgorithm::HmacSha256 => hmac_verify::<Hmac<Sha256>>(secret, data, tag),
        KeyAlgorithm::HmacSha384 => hmac_verify::<Hmac<Sha384>>(secret, data, tag),
        KeyAlgorithm::HmacSha512 => hmac_verify::<Hmac<Sha512>>(secret, data, tag),
    }
}

fn hmac_digest<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(secret)
        .map_err(|e| Error::tsig(format!("unusable secret: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_verify<M: Mac + KeyInit>(secret: &[u8], data: &[u8], tag: &[u8]) -> bool {
    match <M as KeyInit>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(data);
            mac.verify_slice(tag).is_ok()
        }
        Err(_) => false,
    }
}
