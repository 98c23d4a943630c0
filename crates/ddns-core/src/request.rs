// # Update Request Model
//
// Everything an updater needs to build and sign one RFC 2136 update:
// the TSIG credentials, the authoritative master, the zone, the owner
// name, the operation and the record data per record type.
//
// A request lives for a single invocation. Nothing here is persisted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 3600;

/// Default DNS port of the authoritative master
pub const DEFAULT_PORT: u16 = 53;

/// HMAC algorithm of a TSIG key
///
/// Parsed the same way from JSON and from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyAlgorithm {
    /// HMAC-MD5 (RFC 2845)
    #[default]
    HmacMd5,
    /// HMAC-SHA1
    HmacSha1,
    /// HMAC-SHA224
    HmacSha224,
    /// HMAC-SHA256
    HmacSha256,
    /// HMAC-SHA384
    HmacSha384,
    /// HMAC-SHA512
    HmacSha512,
}

impl KeyAlgorithm {
    /// Every supported algorithm
    pub const ALL: [KeyAlgorithm; 6] = [
        KeyAlgorithm::HmacMd5,
        KeyAlgorithm::HmacSha1,
        KeyAlgorithm::HmacSha224,
        KeyAlgorithm::HmacSha256,
        KeyAlgorithm::HmacSha384,
        KeyAlgorithm::HmacSha512,
    ];

    /// Canonical TSIG algorithm identifier carried on the wire
    pub fn identifier(&self) -> &'static str {
        match self {
            KeyAlgorithm::HmacMd5 => "HMAC-MD5.SIG-ALG.REG.INT",
            KeyAlgorithm::HmacSha1 => "hmac-sha1.",
            KeyAlgorithm::HmacSha224 => "hmac-sha224.",
            KeyAlgorithm::HmacSha256 => "hmac-sha256.",
            KeyAlgorithm::HmacSha384 => "hmac-sha384.",
            KeyAlgorithm::HmacSha512 => "hmac-sha512.",
        }
    }

    /// Argument spelling (`hmac-md5`, `hmac-sha256`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::HmacMd5 => "hmac-md5",
            KeyAlgorithm::HmacSha1 => "hmac-sha1",
            KeyAlgorithm::HmacSha224 => "hmac-sha224",
            KeyAlgorithm::HmacSha256 => "hmac-sha256",
            KeyAlgorithm::HmacSha384 => "hmac-sha384",
            KeyAlgorithm::HmacSha512 => "hmac-sha512",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = crate::Error;

    /// Accepts the argument spelling or the wire identifier, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches('.').to_ascii_lowercase();
        KeyAlgorithm::ALL
            .into_iter()
            .find(|alg| {
                alg.as_str() == wanted
                    || alg.identifier().trim_end_matches('.').to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| {
                crate::Error::config(format!(
                    "unsupported key algorithm '{}'. Supported: hmac-md5, hmac-sha1, \
                     hmac-sha224, hmac-sha256, hmac-sha384, hmac-sha512",
                    s
                ))
            })
    }
}

impl TryFrom<String> for KeyAlgorithm {
    type Error = crate::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyAlgorithm> for String {
    fn from(alg: KeyAlgorithm) -> Self {
        alg.as_str().to_string()
    }
}

/// Update operation applied to every present record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Add the record to its RRset
    #[default]
    Add,
    /// Delete the whole RRset of the type
    Delete,
    /// Delete the RRset of the type, then add the record
    Replace,
    /// Any other value; rejected by the updater before sending
    Unknown(String),
}

impl Operation {
    /// Argument spelling of the operation
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::Replace => "replace",
            Operation::Unknown(other) => other,
        }
    }

    /// Whether this is one of `add`, `delete` or `replace`
    pub fn is_known(&self) -> bool {
        !matches!(self, Operation::Unknown(_))
    }
}

impl FromStr for Operation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "add" => Operation::Add,
            "delete" => Operation::Delete,
            "replace" => Operation::Replace,
            _ => Operation::Unknown(s.to_string()),
        })
    }
}

impl From<String> for Operation {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(op) => op,
            Err(never) => match never {},
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record types an update may touch
///
/// The derived ordering fixes the order of instructions in the update
/// message: A, AAAA, CNAME, TXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Text
    Txt,
}

impl RecordType {
    /// Every supported record type, in message order
    pub const ALL: [RecordType; 4] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Txt,
    ];

    /// Mnemonic as written in zone files
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A TSIG shared secret, decoded and ready for signing
///
/// The Debug implementation intentionally does NOT expose the secret.
#[derive(Clone)]
pub struct TsigKey {
    name: String,
    secret: Vec<u8>,
    algorithm: KeyAlgorithm,
}

impl TsigKey {
    /// Derive a key from its name, base64 secret and algorithm
    pub fn new(
        name: impl Into<String>,
        secret_b64: &str,
        algorithm: KeyAlgorithm,
    ) -> crate::Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(crate::Error::tsig("key name cannot be empty"));
        }

        let secret = BASE64
            .decode(secret_b64.trim())
            .map_err(|e| crate::Error::tsig(format!("secret is not valid base64: {}", e)))?;

        Ok(Self {
            name,
            secret,
            algorithm,
        })
    }

    /// Key name as configured
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded secret bytes
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// HMAC algorithm of the key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("secret", &"<REDACTED>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// One dynamic update to perform against an authoritative master
///
/// `records` maps each record type to its rdata text. Only the presence of
/// a type matters for [`Operation::Delete`]; its value is never inspected.
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// TSIG key name
    pub key_name: String,
    /// Base64 TSIG secret
    /// ⚠️ NEVER log this value
    pub secret: String,
    /// TSIG algorithm
    pub key_algorithm: KeyAlgorithm,
    /// Host name or address of the authoritative master
    pub master: String,
    /// UDP port of the master
    pub port: u16,
    /// Zone the update applies to
    pub zone: String,
    /// Owner name, relative to `zone` unless it ends with a dot
    pub record_name: String,
    /// Operation applied to every present record type
    pub operation: Operation,
    /// Record data per record type
    pub records: BTreeMap<RecordType, String>,
    /// TTL of added records (ignored by `Delete`)
    pub ttl: u32,
}

impl UpdateRequest {
    /// Create an `add` request with no records, the default algorithm,
    /// port and TTL
    pub fn new(
        key_name: impl Into<String>,
        secret: impl Into<String>,
        master: impl Into<String>,
        zone: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            key_name: key_name.into(),
            secret: secret.into(),
            key_algorithm: KeyAlgorithm::default(),
            master: master.into(),
            port: DEFAULT_PORT,
            zone: zone.into(),
            record_name: record_name.into(),
            operation: Operation::default(),
            records: BTreeMap::new(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set the TSIG algorithm
    pub fn with_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = algorithm;
        self
    }

    /// Set the operation
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Set the rdata of one record type
    pub fn with_record(mut self, record_type: RecordType, rdata: impl Into<String>) -> Self {
        self.records.insert(record_type, rdata.into());
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the master's port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Derive the TSIG key for this request
    pub fn tsig_key(&self) -> crate::Result<TsigKey> {
        TsigKey::new(self.key_name.clone(), &self.secret, self.key_algorithm)
    }
}

impl fmt::Debug for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("key_name", &self.key_name)
            .field("secret", &"<REDACTED>")
            .field("key_algorithm", &self.key_algorithm)
            .field("master", &self.master)
            .field("port", &self.port)
            .field("zone", &self.zone)
            .field("record_name", &self.record_name)
            .field("operation", &self.operation)
            .field("records", &self.records)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_identifiers() {
        let table = [
            (KeyAlgorithm::HmacMd5, "HMAC-MD5.SIG-ALG.REG.INT"),
            (KeyAlgorithm::HmacSha1, "hmac-sha1."),
            (KeyAlgorithm::HmacSha224, "hmac-sha224."),
            (KeyAlgorithm::HmacSha256, "hmac-sha256."),
            (KeyAlgorithm::HmacSha384, "hmac-sha384."),
            (KeyAlgorithm::HmacSha512, "hmac-sha512."),
        ];

        for (alg, identifier) in table {
            assert_eq!(alg.identifier(), identifier);
        }
        assert_eq!(KeyAlgorithm::ALL.len(), table.len());
    }

    #[test]
    fn test_algorithm_parsing() {
        for alg in KeyAlgorithm::ALL {
            assert_eq!(alg.as_str().parse::<KeyAlgorithm>().unwrap(), alg);
            assert_eq!(alg.identifier().parse::<KeyAlgorithm>().unwrap(), alg);
        }
        assert_eq!(
            "HMAC-SHA256".parse::<KeyAlgorithm>().unwrap(),
            KeyAlgorithm::HmacSha256
        );
        assert!("hmac-gost".parse::<KeyAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_serde() {
        let alg: KeyAlgorithm = serde_json::from_str("\"hmac-sha224\"").unwrap();
        assert_eq!(alg, KeyAlgorithm::HmacSha224);

        let alg: KeyAlgorithm = serde_json::from_str("\"HMAC-MD5.SIG-ALG.REG.INT\"").unwrap();
        assert_eq!(alg, KeyAlgorithm::HmacMd5);

        assert_eq!(serde_json::to_string(&KeyAlgorithm::HmacMd5).unwrap(), "\"hmac-md5\"");
    }

    #[test]
    fn test_algorithm_serde_matches_from_str() {
        for text in ["HMAC-SHA256", "hmac-sha256.", " hmac-sha256 ", "Hmac-Md5.Sig-Alg.Reg.Int."] {
            let from_json: KeyAlgorithm =
                serde_json::from_str(&serde_json::to_string(text).unwrap()).unwrap();
            assert_eq!(from_json, text.parse::<KeyAlgorithm>().unwrap(), "{}", text);
        }

        assert!(serde_json::from_str::<KeyAlgorithm>("\"hmac-gost\"").is_err());
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!("add".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("DELETE".parse::<Operation>().unwrap(), Operation::Delete);
        assert_eq!("replace".parse::<Operation>().unwrap(), Operation::Replace);
        assert_eq!(
            "upsert".parse::<Operation>().unwrap(),
            Operation::Unknown("upsert".to_string())
        );
        assert!(!Operation::from("upsert".to_string()).is_known());
    }

    #[test]
    fn test_record_type_order() {
        let mut types = vec![RecordType::Txt, RecordType::A, RecordType::Cname, RecordType::Aaaa];
        types.sort();
        assert_eq!(types, RecordType::ALL.to_vec());
    }

    #[test]
    fn test_tsig_key_decodes_secret() {
        let key = TsigKey::new("ddns-key", "c2VjcmV0", KeyAlgorithm::HmacSha256).unwrap();
        assert_eq!(key.secret(), b"secret");
        assert_eq!(key.name(), "ddns-key");
    }

    #[test]
    fn test_tsig_key_rejects_bad_input() {
        assert!(TsigKey::new("ddns-key", "not base64!", KeyAlgorithm::HmacMd5).is_err());
        assert!(TsigKey::new("  ", "c2VjcmV0", KeyAlgorithm::HmacMd5).is_err());
    }

    #[test]
    fn test_secret_not_exposed_in_debug() {
        let request = UpdateRequest::new("k", "c3VwZXJzZWNyZXQ=", "ns1", "example.org", "www");
        let key = request.tsig_key().unwrap();

        assert!(!format!("{:?}", request).contains("c3VwZXJzZWNyZXQ="));
        assert!(!format!("{:?}", key).contains("supersecret"));
    }

    #[test]
    fn test_request_defaults() {
        let request = UpdateRequest::new("k", "c2VjcmV0", "ns1", "example.org", "www");
        assert_eq!(request.ttl, DEFAULT_TTL);
        assert_eq!(request.port, DEFAULT_PORT);
        assert_eq!(request.operation, Operation::Add);
        assert_eq!(request.key_algorithm, KeyAlgorithm::HmacMd5);
        assert!(request.records.is_empty());
    }
}
