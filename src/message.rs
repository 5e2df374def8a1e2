//! DNS message codec.
//!
//! A [`Message`] carries the header, the question section and the answer
//! section. Authority and additional sections are skipped on decode and never
//! written on encode.

use crate::errors::DnsError;
use crate::header::{Header, HEADER_LEN};
use crate::name::{decode_name, Name};
use crate::utils::{
    read_u16, read_u32, TYPE_CNAME, TYPE_MX, TYPE_NS, TYPE_PTR, TYPE_SOA, TYPE_SRV,
};

/// Smallest possible question: root name, type and class.
const MIN_QUESTION_LEN: usize = 1 + 4;

/// Smallest possible record: root name, type, class, TTL and RDLENGTH.
const MIN_RECORD_LEN: usize = 1 + 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn new(name: Name, qtype: u16, qclass: u16) -> Self {
        Self { name, qtype, qclass }
    }

    /// Parse a question at `pos`, returning it and the offset after it.
    pub fn parse(buf: &[u8], pos: usize) -> Result<(Self, usize), DnsError> {
        let (name, pos) = decode_name(buf, pos)?;
        let fields = read_u16(buf, pos).zip(read_u16(buf, pos + 2));
        let (qtype, qclass) = fields.ok_or_else(|| {
            DnsError::Truncated(format!("question for {} is missing type/class", name))
        })?;
        Ok((Self { name, qtype, qclass }, pos + 4))
    }

    fn wire_len(&self) -> usize {
        self.name.wire_len() + 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.name.write_to(buf);
        buf.extend_from_slice(&self.qtype.to_be_bytes());
        buf.extend_from_slice(&self.qclass.to_be_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl ResourceRecord {
    /// RDLENGTH as written on the wire.
    pub fn rdlength(&self) -> u16 {
        assert!(
            self.rdata.len() <= u16::MAX as usize,
            "RDATA of {} bytes does not fit RDLENGTH",
            self.rdata.len()
        );
        self.rdata.len() as u16
    }

    /// Parse a record at `pos`, returning it and the offset after it.
    pub fn parse(buf: &[u8], pos: usize) -> Result<(Self, usize), DnsError> {
        let (name, pos) = decode_name(buf, pos)?;

        let truncated =
            || DnsError::Truncated(format!("record for {} is missing fixed fields", name));
        let rtype = read_u16(buf, pos).ok_or_else(truncated)?;
        let rclass = read_u16(buf, pos + 2).ok_or_else(truncated)?;
        let ttl = read_u32(buf, pos + 4).ok_or_else(truncated)?;
        let rdlength = read_u16(buf, pos + 8).ok_or_else(truncated)? as usize;

        let start = pos + 10;
        let rdata = buf.get(start..start + rdlength).ok_or_else(|| {
            DnsError::MalformedCounts(format!(
                "RDLENGTH {} at offset {} exceeds the {} remaining bytes",
                rdlength,
                start,
                buf.len().saturating_sub(start)
            ))
        })?;

        let end = start + rdlength;
        let rdata = match expand_rdata(buf, rtype, start, end)? {
            Some(expanded) => expanded,
            None => rdata.to_vec(),
        };

        let record = Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        };
        Ok((record, end))
    }

    fn wire_len(&self) -> usize {
        self.name.wire_len() + 10 + self.rdata.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.name.write_to(buf);
        buf.extend_from_slice(&self.rtype.to_be_bytes());
        buf.extend_from_slice(&self.rclass.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&self.rdlength().to_be_bytes());
        buf.extend_from_slice(&self.rdata);
    }
}

/// Rewrite the RDATA at `start..end` with every embedded name uncompressed.
///
/// Pointers inside RDATA refer to offsets of the message they came in, so
/// they have to be expanded before the record is copied into another message.
/// Returns `None` for types whose RDATA carries no names.
fn expand_rdata(
    buf: &[u8],
    rtype: u16,
    start: usize,
    end: usize,
) -> Result<Option<Vec<u8>>, DnsError> {
    // (fixed bytes before the names, number of names, fixed bytes after)
    let (prefix, names, suffix) = match rtype {
        TYPE_NS | TYPE_CNAME | TYPE_PTR => (0, 1, 0),
        TYPE_MX => (2, 1, 0),
        TYPE_SRV => (6, 1, 0),
        TYPE_SOA => (0, 2, 20),
        _ => return Ok(None),
    };

    let rdata = &buf[..end];
    let mut out = Vec::with_capacity(end - start);
    let mut pos = start + prefix;
    out.extend_from_slice(rdata.get(start..pos).ok_or_else(|| {
        DnsError::MalformedCounts(format!("RDATA at offset {} is too short", start))
    })?);

    for _ in 0..names {
        let (name, next) = decode_name(rdata, pos)?;
        name.write_to(&mut out);
        pos = next;
    }

    if pos + suffix != end {
        return Err(DnsError::MalformedCounts(format!(
            "RDATA at offset {} does not match RDLENGTH {}",
            start,
            end - start
        )));
    }
    out.extend_from_slice(&buf[pos..end]);
    Ok(Some(out))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
}

impl Message {
    /// Decode a datagram into a message.
    ///
    /// QDCOUNT questions and ANCOUNT answers are read; anything after the
    /// answer section is ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DnsError> {
        let header = Header::parse(data)?;

        let remaining = data.len() - HEADER_LEN;
        let needed = header.qd_count as usize * MIN_QUESTION_LEN
            + header.an_count as usize * MIN_RECORD_LEN;
        if needed > remaining {
            return Err(DnsError::MalformedHeader(format!(
                "QDCOUNT {} and ANCOUNT {} need at least {} bytes, {} available",
                header.qd_count, header.an_count, needed, remaining
            )));
        }

        let mut pos = HEADER_LEN;

        let mut questions = Vec::with_capacity(header.qd_count as usize);
        for _ in 0..header.qd_count {
            let (question, next) = Question::parse(data, pos)?;
            questions.push(question);
            pos = next;
        }

        let mut answers = Vec::with_capacity(header.an_count as usize);
        for _ in 0..header.an_count {
            let (record, next) = ResourceRecord::parse(data, pos)?;
            answers.push(record);
            pos = next;
        }

        Ok(Self {
            header,
            questions,
            answers,
        })
    }

    /// Exact size of the encoded message.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self.questions.iter().map(Question::wire_len).sum::<usize>()
            + self.answers.iter().map(ResourceRecord::wire_len).sum::<usize>()
    }

    /// Encode the message.
    ///
    /// QDCOUNT and ANCOUNT are taken from the section lengths, never from the
    /// header; NSCOUNT and ARCOUNT are always zero.
    pub fn encode(&self) -> Vec<u8> {
        assert!(
            self.questions.len() <= u16::MAX as usize && self.answers.len() <= u16::MAX as usize,
            "section too large to encode"
        );

        let mut buf = Vec::with_capacity(self.encoded_len());
        self.header
            .write_to(&mut buf, self.questions.len() as u16, self.answers.len() as u16);
        for question in &self.questions {
            question.write_to(&mut buf);
        }
        for answer in &self.answers {
            answer.write_to(&mut buf);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{CLASS_IN, TYPE_A, TYPE_CNAME};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn codecrafters_query() -> Vec<u8> {
        let mut data = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend(b"\x0ccodecrafters\x02io\x00");
        data.extend([0x00, 0x01, 0x00, 0x01]);
        data
    }

    fn a_record(owner: &str, addr: [u8; 4]) -> ResourceRecord {
        ResourceRecord {
            name: name(owner),
            rtype: TYPE_A,
            rclass: CLASS_IN,
            ttl: 60,
            rdata: addr.to_vec(),
        }
    }

    #[test]
    fn test_decode_query() {
        let message = Message::decode(&codecrafters_query()).unwrap();
        assert_eq!(message.header.id, 0x1234);
        assert!(!message.header.query_response);
        assert_eq!(message.header.opcode, 0);
        assert_eq!(
            message.questions,
            vec![Question::new(name("codecrafters.io"), TYPE_A, CLASS_IN)]
        );
        assert!(message.answers.is_empty());
    }

    #[test]
    fn test_encode_query_matches_wire() {
        let message = Message::decode(&codecrafters_query()).unwrap();
        assert_eq!(message.encode(), codecrafters_query());
    }

    #[test]
    fn test_encode_derives_counts() {
        let message = Message {
            header: Header {
                id: 1,
                qd_count: 7,
                an_count: 0,
                ns_count: 3,
                ar_count: 1,
                ..Header::default()
            },
            questions: vec![Question::new(name("example.com"), TYPE_A, CLASS_IN)],
            answers: vec![
                a_record("example.com", [1, 2, 3, 4]),
                a_record("example.com", [5, 6, 7, 8]),
            ],
        };

        let bytes = message.encode();
        assert_eq!(bytes.len(), message.encoded_len());
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.qd_count, 1);
        assert_eq!(header.an_count, 2);
        assert_eq!(header.ns_count, 0);
        assert_eq!(header.ar_count, 0);
    }

    #[test]
    fn test_decode_encoded_message() {
        let message = Message {
            header: Header {
                id: 0xbeef,
                qd_count: 2,
                an_count: 3,
                ..Header::from_flags(0x8180)
            },
            questions: vec![
                Question::new(name("example.com"), TYPE_A, CLASS_IN),
                Question::new(name("www.example.org"), TYPE_CNAME, CLASS_IN),
            ],
            answers: vec![
                a_record("example.com", [93, 184, 216, 34]),
                ResourceRecord {
                    name: name("www.example.org"),
                    rtype: TYPE_CNAME,
                    rclass: CLASS_IN,
                    ttl: 3600,
                    rdata: crate::name::encode_name(&name("example.org")),
                },
                ResourceRecord {
                    name: Name::root(),
                    rtype: 99,
                    rclass: 3,
                    ttl: u32::MAX,
                    rdata: Vec::new(),
                },
            ],
        };

        assert_eq!(Message::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn test_decode_compressed_answer() {
        let mut data = vec![0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        data.extend(b"\x0ccodecrafters\x02io\x00");
        data.extend([0x00, 0x01, 0x00, 0x01]);
        data.extend([0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04]);
        data.extend([76, 76, 21, 21]);

        let message = Message::decode(&data).unwrap();
        assert_eq!(message.answers.len(), 1);
        let answer = &message.answers[0];
        assert_eq!(answer.name, name("codecrafters.io"));
        assert_eq!(answer.ttl, 3600);
        assert_eq!(answer.rdlength(), 4);
        assert_eq!(answer.rdata, vec![76, 76, 21, 21]);
    }

    /// Reply for `codecrafters.io` whose answer is `rtype` with `rdata`.
    fn reply_with_rdata(rtype: u16, rdata: &[u8]) -> Vec<u8> {
        let mut data = vec![0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        data.extend(b"\x0ccodecrafters\x02io\x00");
        data.extend([0x00, 0x01, 0x00, 0x01]);
        data.extend([0xC0, 0x0C]);
        data.extend(rtype.to_be_bytes());
        data.extend([0x00, 0x01, 0x00, 0x00, 0x0e, 0x10]);
        data.extend((rdata.len() as u16).to_be_bytes());
        data.extend(rdata);
        data
    }

    #[test]
    fn test_compressed_cname_target_is_expanded() {
        let data = reply_with_rdata(TYPE_CNAME, b"\x03cdn\xc0\x0c");

        let message = Message::decode(&data).unwrap();
        let answer = &message.answers[0];
        assert_eq!(answer.rdata, crate::name::encode_name(&name("cdn.codecrafters.io")));
        assert_eq!(answer.rdlength(), 21);

        // The expanded record survives being moved into a different message.
        let moved = Message {
            header: Header::default(),
            questions: vec![Question::new(name("other.example"), TYPE_A, CLASS_IN)],
            answers: message.answers.clone(),
        };
        let reparsed = Message::decode(&moved.encode()).unwrap();
        let (target, _) = crate::name::decode_name(&reparsed.answers[0].rdata, 0).unwrap();
        assert_eq!(target, name("cdn.codecrafters.io"));
    }

    #[test]
    fn test_mx_and_soa_names_are_expanded() {
        let data = reply_with_rdata(TYPE_MX, b"\x00\x0a\x04mail\xc0\x0c");
        let answer = &Message::decode(&data).unwrap().answers[0];
        let mut expected = vec![0x00, 0x0a];
        expected.extend(crate::name::encode_name(&name("mail.codecrafters.io")));
        assert_eq!(answer.rdata, expected);

        let mut soa = b"\x02ns\xc0\x0c\x0ahostmaster\xc0\x0c".to_vec();
        soa.extend([0u8; 20]);
        let last = soa.len() - 1;
        soa[last] = 7;
        let data = reply_with_rdata(crate::utils::TYPE_SOA, &soa);
        let answer = &Message::decode(&data).unwrap().answers[0];
        let mut expected = crate::name::encode_name(&name("ns.codecrafters.io"));
        expected.extend(crate::name::encode_name(&name("hostmaster.codecrafters.io")));
        expected.extend([0u8; 19]);
        expected.push(7);
        assert_eq!(answer.rdata, expected);
    }

    #[test]
    fn test_name_rdata_must_fill_rdlength() {
        let data = reply_with_rdata(TYPE_CNAME, b"\x03cdn\xc0\x0c\xff");
        assert!(matches!(Message::decode(&data), Err(DnsError::MalformedCounts(_))));

        let data = reply_with_rdata(TYPE_MX, b"\x00");
        assert!(matches!(Message::decode(&data), Err(DnsError::MalformedCounts(_))));
    }

    #[test]
    fn test_opaque_rdata_is_kept() {
        let data = reply_with_rdata(99, b"\xc0\x0c\x01");
        assert_eq!(Message::decode(&data).unwrap().answers[0].rdata, vec![0xC0, 0x0C, 0x01]);
    }

    #[test]
    fn test_additional_section_is_ignored() {
        let mut data = codecrafters_query();
        data[11] = 1;
        // EDNS OPT pseudo-record
        data.extend([0x00, 0x00, 0x29, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let message = Message::decode(&data).unwrap();
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.header.ar_count, 1);
        assert_eq!(Header::parse(&message.encode()).unwrap().ar_count, 0);
    }

    #[test]
    fn test_short_datagram() {
        assert!(matches!(Message::decode(&[0x12, 0x34, 0x01]), Err(DnsError::Truncated(_))));
    }

    #[test]
    fn test_impossible_counts() {
        let mut data = codecrafters_query();
        data[4] = 0xff;
        assert!(matches!(Message::decode(&data), Err(DnsError::MalformedHeader(_))));
    }

    #[test]
    fn test_question_missing_fields() {
        // name is intact, type/class are cut after one byte
        let mut cut = codecrafters_query();
        cut.truncate(cut.len() - 3);
        assert!(matches!(Message::decode(&cut), Err(DnsError::Truncated(_))));
    }

    #[test]
    fn test_rdlength_overrun() {
        let mut data = vec![0x12, 0x34, 0x81, 0x80, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        data.extend([0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x10]);
        data.extend([1, 2, 3, 4]);
        assert!(matches!(Message::decode(&data), Err(DnsError::MalformedCounts(_))));
    }

    #[test]
    fn test_bad_name_in_question() {
        let mut data = vec![0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend([0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
        assert!(matches!(Message::decode(&data), Err(DnsError::MalformedName(_))));
    }
}
