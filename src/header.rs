//! DNS message header.
//!
//! ```text
//!                                 1  1  1  1  1  1
//!   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                       |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |          QDCOUNT / ANCOUNT / NSCOUNT / ARCOUNT |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use crate::errors::DnsError;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// Opcode of a standard query.
pub const OPCODE_QUERY: u8 = 0;

/// RCODE for a successful response.
pub const RCODE_NO_ERROR: u8 = 0;

/// RCODE for an unsupported opcode.
pub const RCODE_NOT_IMPLEMENTED: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub query_response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: u8,
    pub rcode: u8,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl Header {
    /// Parse the fixed 12-byte header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, DnsError> {
        if data.len() < HEADER_LEN {
            return Err(DnsError::Truncated(format!(
                "{} bytes is shorter than the {}-byte header",
                data.len(),
                HEADER_LEN
            )));
        }

        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
        let mut header = Self::from_flags(word(2));
        header.id = word(0);
        header.qd_count = word(4);
        header.an_count = word(6);
        header.ns_count = word(8);
        header.ar_count = word(10);
        Ok(header)
    }

    /// Build a header with every flag decomposed from `flags` and zero counts.
    pub fn from_flags(flags: u16) -> Self {
        let [hi, lo] = flags.to_be_bytes();
        Self {
            query_response: hi & 0x80 != 0,
            opcode: (hi >> 3) & 0x0F,
            authoritative: hi & 0x04 != 0,
            truncated: hi & 0x02 != 0,
            recursion_desired: hi & 0x01 != 0,
            recursion_available: lo & 0x80 != 0,
            z: (lo >> 4) & 0x07,
            rcode: lo & 0x0F,
            ..Self::default()
        }
    }

    /// The 16-bit flag word.
    pub fn flags(&self) -> u16 {
        let hi = (self.query_response as u8) << 7
            | (self.opcode & 0x0F) << 3
            | (self.authoritative as u8) << 2
            | (self.truncated as u8) << 1
            | self.recursion_desired as u8;
        let lo = (self.recursion_available as u8) << 7 | (self.z & 0x07) << 4 | (self.rcode & 0x0F);
        u16::from_be_bytes([hi, lo])
    }

    /// Append the header to `buf` with the given section counts.
    ///
    /// The counts stored in `self` are ignored; callers pass the lengths of
    /// the sections they are about to write.
    pub fn write_to(&self, buf: &mut Vec<u8>, qd_count: u16, an_count: u16) {
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.flags().to_be_bytes());
        buf.extend_from_slice(&qd_count.to_be_bytes());
        buf.extend_from_slice(&an_count.to_be_bytes());
        // Authority and additional sections are never carried.
        buf.extend_from_slice(&[0, 0, 0, 0]);
    }
}
