//! Response decoding
//!
//! Turns the master's answer into the response code mnemonic the outcome
//! carries (`NOERROR`, `REFUSED`, `NOTAUTH`, ...).

use ddns_core::{Error, Result};
use hickory_proto::op::{Message, MessageType, ResponseCode};

/// Mnemonic of a (possibly extended) response code
///
/// Codes without a mnemonic are rendered as their decimal value.
pub fn rcode_text(code: ResponseCode) -> String {
    let text = match u16::from(code) {
        0 => "NOERROR",
        1 => "FORMERR",
        2 => "SERVFAIL",
        3 => "NXDOMAIN",
        4 => "NOTIMP",
        5 => "REFUSED",
        6 => "YXDOMAIN",
        7 => "YXRRSET",
        8 => "NXRRSET",
        9 => "NOTAUTH",
        10 => "NOTZONE",
        16 => "BADVERS",
        23 => "BADCOOKIE",
        other => return other.to_string(),
    };
    text.to_string()
}

/// Parse a response datagram
pub fn decode_response(response: &[u8]) -> Result<Message> {
    let message = Message::from_vec(response)
        .map_err(|e| Error::encoding(format!("malformed response: {}", e)))?;

    if message.message_type() != MessageType::Response {
        return Err(Error::encoding("answer is not a DNS response"));
    }

    Ok(message)
}

/// Response code mnemonic of a response datagram
pub fn decode_rcode(response: &[u8]) -> Result<String> {
    decode_response(response).map(|message| rcode_text(message.response_code()))
}
