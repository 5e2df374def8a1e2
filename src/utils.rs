//! Utility functions for DNS logging and wire handling.

/// Record type: IPv4 address.
pub const TYPE_A: u16 = 1;
/// Record type: name server.
pub const TYPE_NS: u16 = 2;
/// Record type: canonical name.
pub const TYPE_CNAME: u16 = 5;
/// Record type: start of authority.
pub const TYPE_SOA: u16 = 6;
/// Record type: domain name pointer.
pub const TYPE_PTR: u16 = 12;
/// Record type: mail exchange.
pub const TYPE_MX: u16 = 15;
/// Record type: text strings.
pub const TYPE_TXT: u16 = 16;
/// Record type: IPv6 address.
pub const TYPE_AAAA: u16 = 28;
/// Record type: service location.
pub const TYPE_SRV: u16 = 33;
/// Query type: any record.
pub const TYPE_ANY: u16 = 255;

/// Class: Internet.
pub const CLASS_IN: u16 = 1;

/// Number of bytes shown by [`hex_preview`].
const PREVIEW_LEN: usize = 64;

/// Mnemonic of a record type for log output.
pub fn type_name(rtype: u16) -> &'static str {
    match rtype {
        TYPE_A => "A",
        TYPE_NS => "NS",
        TYPE_CNAME => "CNAME",
        TYPE_SOA => "SOA",
        TYPE_PTR => "PTR",
        TYPE_MX => "MX",
        TYPE_TXT => "TXT",
        TYPE_AAAA => "AAAA",
        TYPE_SRV => "SRV",
        TYPE_ANY => "ANY",
        _ => "UNKNOWN",
    }
}

/// Hex dump of the start of a datagram, for trace logging.
pub fn hex_preview(data: &[u8]) -> String {
    if data.len() <= PREVIEW_LEN {
        hex::encode(data)
    } else {
        format!("{}... ({} bytes)", hex::encode(&data[..PREVIEW_LEN]), data.len())
    }
}

/// Read a big-endian `u16` at `pos`.
pub fn read_u16(buf: &[u8], pos: usize) -> Option<u16> {
    buf.get(pos..pos + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// Read a big-endian `u32` at `pos`.
pub fn read_u32(buf: &[u8], pos: usize) -> Option<u32> {
    buf.get(pos..pos + 4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
