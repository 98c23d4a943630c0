//! Action arguments
//!
//! The invocation layer of the update action: raw arguments as they arrive
//! from the environment or from a JSON arguments file, their defaults, their
//! validation, and their conversion into an [`UpdateRequest`].
//!
//! ## Environment
//!
//! | Variable | Argument | Default |
//! |---|---|---|
//! | `NSUPDATE_KEYNAME` | `keyname` | required |
//! | `NSUPDATE_SECRET` | `secret` | required |
//! | `NSUPDATE_KEYALGO` | `keyalgo` | `hmac-md5` |
//! | `NSUPDATE_MNAME` | `mname` | required |
//! | `NSUPDATE_PORT` | `port` | `53` |
//! | `NSUPDATE_ZONE` | `zone` | required |
//! | `NSUPDATE_DOMAIN` | `domain` | required |
//! | `NSUPDATE_A` / `_AAAA` / `_CNAME` / `_TXT` | `a` / `aaaa` / `cname` / `txt` | unset |
//! | `NSUPDATE_TTL` | `ttl` | `3600` |
//! | `NSUPDATE_OP` | `op` | `add` |

use crate::error::{Error, Result};
use crate::request::{
    DEFAULT_PORT, DEFAULT_TTL, KeyAlgorithm, Operation, RecordType, TsigKey, UpdateRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

/// Largest TTL a record may carry (RFC 2181 §8)
pub const MAX_TTL: u32 = 2_147_483_647;

/// Prefix of every environment variable read by [`ActionArgs::from_env`]
pub const ENV_PREFIX: &str = "NSUPDATE_";

/// Raw arguments of the update action
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionArgs {
    /// TSIG key name
    pub keyname: String,

    /// Base64 TSIG secret
    /// ⚠️ NEVER log this value
    pub secret: String,

    /// TSIG algorithm
    #[serde(default)]
    pub keyalgo: KeyAlgorithm,

    /// Authoritative master (host name or address)
    pub mname: String,

    /// Master's UDP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Zone to update
    pub zone: String,

    /// Record name, relative to `zone` unless it ends with a dot
    pub domain: String,

    /// IPv4 address for an A record
    #[serde(default)]
    pub a: Option<String>,

    /// IPv6 address for an AAAA record
    #[serde(default)]
    pub aaaa: Option<String>,

    /// Target of a CNAME record
    #[serde(default)]
    pub cname: Option<String>,

    /// Text of a TXT record
    #[serde(default)]
    pub txt: Option<String>,

    /// TTL of added records
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Operation: add, delete or replace
    #[serde(default)]
    pub op: Operation,
}

impl ActionArgs {
    /// Load arguments from `NSUPDATE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load arguments through `lookup`, which maps a variable name to its value
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            get(name).ok_or_else(|| {
                Error::config(format!(
                    "{}{} is required. Set it via: export {}{}=...",
                    ENV_PREFIX, name, ENV_PREFIX, name
                ))
            })
        };

        let keyalgo = match get("KEYALGO") {
            Some(value) => value.parse()?,
            None => KeyAlgorithm::default(),
        };

        let port = match get("PORT") {
            Some(value) => value.parse().map_err(|_| {
                Error::config(format!("{}PORT must be a port number. Got: {}", ENV_PREFIX, value))
            })?,
            None => DEFAULT_PORT,
        };

        let ttl = match get("TTL") {
            Some(value) => value.parse().map_err(|_| {
                Error::config(format!("{}TTL must be a number of seconds. Got: {}", ENV_PREFIX, value))
            })?,
            None => DEFAULT_TTL,
        };

        let op = get("OP").map(Operation::from).unwrap_or_default();

        Ok(Self {
            keyname: required("KEYNAME")?,
            secret: required("SECRET")?,
            keyalgo,
            mname: required("MNAME")?,
            port,
            zone: required("ZONE")?,
            domain: required("DOMAIN")?,
            a: get("A"),
            aaaa: get("AAAA"),
            cname: get("CNAME"),
            txt: get("TXT"),
            ttl,
            op,
        })
    }

    /// Parse arguments from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read arguments from a JSON arguments file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read arguments file {}: {}", path.display(), e))
        })?;
        tracing::debug!("Read action arguments from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Record data of every record type that was supplied
    pub fn records(&self) -> BTreeMap<RecordType, String> {
        [
            (RecordType::A, &self.a),
            (RecordType::Aaaa, &self.aaaa),
            (RecordType::Cname, &self.cname),
            (RecordType::Txt, &self.txt),
        ]
        .into_iter()
        .filter_map(|(record_type, value)| value.as_ref().map(|v| (record_type, v.clone())))
        .collect()
    }

    /// Validate the arguments
    ///
    /// This enforces the enumerated choices, required fields, name syntax,
    /// the TTL range, and (for add and replace) that every supplied record
    /// value parses as its type.
    pub fn validate(&self) -> Result<()> {
        if self.keyname.trim().is_empty() {
            return Err(Error::config("keyname is required"));
        }
        validate_domain_name("keyname", &self.keyname)?;

        if self.secret.trim().is_empty() {
            return Err(Error::config("secret is required"));
        }
        TsigKey::new(self.keyname.clone(), &self.secret, self.keyalgo)
            .map_err(|e| Error::config(e.to_string()))?;

        if self.mname.trim().is_empty() {
            return Err(Error::config("mname is required"));
        }
        if self.port == 0 {
            return Err(Error::config("port must be between 1 and 65535"));
        }

        validate_domain_name("zone", &self.zone)?;
        validate_domain_name("domain", &self.domain)?;

        if !self.op.is_known() {
            return Err(Error::config(format!(
                "op '{}' is not supported. Supported operations: add, delete, replace",
                self.op
            )));
        }

        if self.ttl > MAX_TTL {
            return Err(Error::config(format!(
                "ttl must be at most {} seconds. Got: {}",
                MAX_TTL, self.ttl
            )));
        }

        let records = self.records();
        if records.is_empty() {
            return Err(Error::config(
                "at least one of a, aaaa, cname or txt must be supplied",
            ));
        }

        // Delete only looks at which types are present
        if self.op != Operation::Delete {
            for (record_type, value) in &records {
                validate_rdata(*record_type, value)?;
            }
        }

        Ok(())
    }

    /// Validate and convert into an [`UpdateRequest`]
    pub fn into_request(self) -> Result<UpdateRequest> {
        self.validate()?;

        let records = self.records();
        tracing::debug!(
            "Validated {} of {} record type(s) for {} in {}",
            self.op,
            records.len(),
            self.domain,
            self.zone
        );
        Ok(UpdateRequest {
            key_name: self.keyname,
            secret: self.secret,
            key_algorithm: self.keyalgo,
            master: self.mname,
            port: self.port,
            zone: self.zone,
            record_name: self.domain,
            operation: self.op,
            records,
            ttl: self.ttl,
        })
    }
}

impl std::fmt::Debug for ActionArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionArgs")
            .field("keyname", &self.keyname)
            .field("secret", &"<REDACTED>")
            .field("keyalgo", &self.keyalgo)
            .field("mname", &self.mname)
            .field("port", &self.port)
            .field("zone", &self.zone)
            .field("domain", &self.domain)
            .field("a", &self.a)
            .field("aaaa", &self.aaaa)
            .field("cname", &self.cname)
            .field("txt", &self.txt)
            .field("ttl", &self.ttl)
            .field("op", &self.op)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// Check that a supplied record value parses as its type
fn validate_rdata(record_type: RecordType, value: &str) -> Result<()> {
    match record_type {
        RecordType::A => value
            .trim()
            .parse::<Ipv4Addr>()
            .map(|_| ())
            .map_err(|_| Error::config(format!("a must be an IPv4 address. Got: {}", value))),
        RecordType::Aaaa => value
            .trim()
            .parse::<Ipv6Addr>()
            .map(|_| ())
            .map_err(|_| Error::config(format!("aaaa must be an IPv6 address. Got: {}", value))),
        RecordType::Cname => validate_domain_name("cname", value),
        RecordType::Txt => Ok(()),
    }
}

/// Validate that a string is a usable domain name
///
/// `@` names the zone apex and is accepted only for names resolved
/// against the zone (`domain` and `cname`). A trailing dot marks an
/// absolute name. Underscores are allowed for service labels and `*` only
/// as a whole leftmost label.
pub fn validate_domain_name(field: &str, domain: &str) -> Result<()> {
    let domain = domain.trim();
    if domain == "@" {
        return match field {
            "domain" | "cname" => Ok(()),
            _ => Err(Error::config(format!(
                "{} cannot be '@', only domain and cname may name the zone apex",
                field
            ))),
        };
    }

    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() {
        return Err(Error::config(format!("{} cannot be empty", field)));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if name.len() > 253 {
        return Err(Error::config(format!(
            "{} too long: {} chars (max 253). Got: {}",
            field,
            name.len(),
            domain
        )));
    }

    for (index, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!(
                "{} has empty label: '{}'",
                field, domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "{} label too long: {} chars (max 63). Label: '{}'",
                field,
                label.len(),
                label
            )));
        }

        if label == "*" && index == 0 {
            continue;
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "{} label contains invalid characters. Label: '{}'. \
                 Valid: alphanumeric, hyphen and underscore only.",
                field, label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "{} label cannot start or end with hyphen. Label: '{}'",
                field, label
            )));
        }
    }

    Ok(())
}
