//! RFC 2136 update message construction
//!
//! An update message carries the zone in its question section (as
//! `zone IN SOA`) and the changes in its authority section, which RFC 2136
//! calls the update section:
//!
//! | Operation | Update section entries per record type |
//! |---|---|
//! | add | `owner ttl IN type rdata` |
//! | delete | `owner 0 ANY type` (no rdata) |
//! | replace | `owner 0 ANY type`, then `owner ttl IN type rdata` |

use ddns_core::{Error, Operation, RecordType, Result, UpdateRequest};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType as WireType};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Longest character-string a TXT record can hold
const MAX_CHARACTER_STRING: usize = 255;

/// Build the unsigned update message for `request`
///
/// Instructions are emitted in record type order (A, AAAA, CNAME, TXT).
/// Under `Delete` the record values are never looked at.
pub fn build_update(request: &UpdateRequest, id: u16) -> Result<Message> {
    let zone = zone_name(&request.zone)?;
    let owner = absolute_name(&request.record_name, &request.zone)?;

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false);

    let mut zone_query = Query::query(zone, WireType::SOA);
    zone_query.set_query_class(DNSClass::IN);
    message.add_query(zone_query);

    for (record_type, rdata) in &request.records {
        match &request.operation {
            Operation::Add => {
                message.add_name_server(add_to_rrset(&owner, request, *record_type, rdata)?);
            }
            Operation::Delete => {
                message.add_name_server(delete_rrset(&owner, *record_type));
            }
            Operation::Replace => {
                message.add_name_server(delete_rrset(&owner, *record_type));
                message.add_name_server(add_to_rrset(&owner, request, *record_type, rdata)?);
            }
            Operation::Unknown(op) => {
                return Err(Error::invalid_input(format!("unknown operation '{}'", op)));
            }
        }

        tracing::debug!(
            "Update instruction: {} {} {}",
            request.operation,
            owner,
            record_type
        );
    }

    Ok(message)
}

/// Wire record type of a supported record type
pub fn wire_type(record_type: RecordType) -> WireType {
    match record_type {
        RecordType::A => WireType::A,
        RecordType::Aaaa => WireType::AAAA,
        RecordType::Cname => WireType::CNAME,
        RecordType::Txt => WireType::TXT,
    }
}

/// Parse the zone as an absolute name
pub fn zone_name(zone: &str) -> Result<Name> {
    let zone = zone.trim().trim_end_matches('.');
    Name::from_ascii(format!("{}.", zone))
        .map_err(|e| Error::invalid_input(format!("invalid zone '{}': {}", zone, e)))
}

/// Resolve `name` against `zone`
///
/// Names ending with a dot are already absolute; `@` and the empty name
/// stand for the zone apex.
pub fn absolute_name(name: &str, zone: &str) -> Result<Name> {
    let name = name.trim();
    let zone = zone.trim().trim_end_matches('.');

    let text = if name.is_empty() || name == "@" {
        format!("{}.", zone)
    } else if name.ends_with('.') {
        name.to_string()
    } else if zone.is_empty() {
        format!("{}.", name)
    } else {
        format!("{}.{}.", name, zone)
    };

    Name::from_ascii(&text)
        .map_err(|e| Error::invalid_input(format!("invalid name '{}': {}", name, e)))
}

/// `owner ttl IN type rdata`
fn add_to_rrset(
    owner: &Name,
    request: &UpdateRequest,
    record_type: RecordType,
    rdata: &str,
) -> Result<Record> {
    let rdata = parse_rdata(record_type, rdata, &request.zone)?;
    let mut record = Record::from_rdata(owner.clone(), request.ttl, rdata);
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

/// `owner 0 ANY type`, which deletes the whole RRset
fn delete_rrset(owner: &Name, record_type: RecordType) -> Record {
    let mut record = Record::with(owner.clone(), wire_type(record_type), 0);
    record.set_dns_class(DNSClass::ANY);
    record
}

fn parse_rdata(record_type: RecordType, value: &str, zone: &str) -> Result<RData> {
    let value = value.trim();
    match record_type {
        RecordType::A => value
            .parse::<Ipv4Addr>()
            .map(|addr| RData::A(A(addr)))
            .map_err(|_| Error::invalid_input(format!("invalid A record data '{}'", value))),
        RecordType::Aaaa => value
            .parse::<Ipv6Addr>()
            .map(|addr| RData::AAAA(AAAA(addr)))
            .map_err(|_| Error::invalid_input(format!("invalid AAAA record data '{}'", value))),
        RecordType::Cname => absolute_name(value, zone).map(|target| RData::CNAME(CNAME(target))),
        RecordType::Txt => Ok(RData::TXT(TXT::new(character_strings(value)))),
    }
}

/// Split text into character-strings of at most 255 bytes
fn character_strings(text: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if current.len() + ch.len_utf8() > MAX_CHARACTER_STRING {
            strings.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    strings.push(current);

    strings
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::KeyAlgorithm;

    fn request() -> UpdateRequest {
        UpdateRequest::new("ddns-key", "c2VjcmV0", "127.0.0.1", "example.org", "www")
            .with_algorithm(KeyAlgorithm::HmacMd5)
    }

    #[test]
    fn test_zone_section() {
        let message = build_update(&request().with_record(RecordType::A, "10.0.0.5"), 7).unwrap();

        assert_eq!(message.id(), 7);
        assert_eq!(message.op_code(), OpCode::Update);
        assert_eq!(message.queries().len(), 1);

        let zone = &message.queries()[0];
        assert_eq!(zone.name(), &Name::from_ascii("example.org.").unwrap());
        assert_eq!(zone.query_type(), WireType::SOA);
        assert_eq!(zone.query_class(), DNSClass::IN);
    }

    #[test]
    fn test_relative_and_absolute_names() {
        assert_eq!(
            absolute_name("www", "example.org").unwrap(),
            Name::from_ascii("www.example.org.").unwrap()
        );
        assert_eq!(
            absolute_name("host.other.net.", "example.org").unwrap(),
            Name::from_ascii("host.other.net.").unwrap()
        );
        assert_eq!(
            absolute_name("@", "example.org.").unwrap(),
            Name::from_ascii("example.org.").unwrap()
        );
    }

    #[test]
    fn test_replace_emits_delete_then_add() {
        let request = request()
            .with_operation(Operation::Replace)
            .with_record(RecordType::Aaaa, "2001:db8::5")
            .with_ttl(300);
        let message = build_update(&request, 1).unwrap();
        let updates = message.name_servers();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].dns_class(), DNSClass::ANY);
        assert_eq!(updates[0].record_type(), WireType::AAAA);
        assert_eq!(updates[0].ttl(), 0);
        assert!(updates[0].data().is_none());

        assert_eq!(updates[1].dns_class(), DNSClass::IN);
        assert_eq!(updates[1].ttl(), 300);
        assert_eq!(
            updates[1].data(),
            Some(&RData::AAAA(AAAA("2001:db8::5".parse().unwrap())))
        );
    }

    #[test]
    fn test_cname_target_relative_to_zone() {
        let request = request().with_record(RecordType::Cname, "web");
        let message = build_update(&request, 1).unwrap();

        assert_eq!(
            message.name_servers()[0].data(),
            Some(&RData::CNAME(CNAME(Name::from_ascii("web.example.org.").unwrap())))
        );
    }

    #[test]
    fn test_record_type_order() {
        let request = request()
            .with_record(RecordType::Txt, "hello")
            .with_record(RecordType::A, "10.0.0.5")
            .with_record(RecordType::Cname, "web");
        let message = build_update(&request, 1).unwrap();

        let types: Vec<WireType> = message
            .name_servers()
            .iter()
            .map(|record| record.record_type())
            .collect();
        assert_eq!(types, vec![WireType::A, WireType::CNAME, WireType::TXT]);
    }

    #[test]
    fn test_long_txt_is_split() {
        let text = "x".repeat(600);
        let strings = character_strings(&text);

        assert_eq!(strings.len(), 3);
        assert_eq!(strings[0].len(), 255);
        assert_eq!(strings[2].len(), 90);
        assert_eq!(strings.concat(), text);
    }

    #[test]
    fn test_txt_split_respects_utf8() {
        let text = "é".repeat(200);
        let strings = character_strings(&text);

        assert!(strings.iter().all(|s| s.len() <= MAX_CHARACTER_STRING));
        assert_eq!(strings.concat(), text);
    }

    #[test]
    fn test_invalid_rdata_rejected_for_add() {
        let request = request().with_record(RecordType::A, "10.0.0.999");
        assert!(build_update(&request, 1).is_err());
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let request = request()
            .with_operation(Operation::Unknown("upsert".to_string()))
            .with_record(RecordType::A, "10.0.0.5");
        assert!(build_update(&request, 1).is_err());
    }
}
