//! Domain name wire codec.
//!
//! Names are carried as a sequence of length-prefixed labels terminated by a
//! zero byte. Decoding expands compression pointers; encoding never emits them.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::errors::DnsError;

/// Maximum length of a single label in bytes.
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of an encoded name, terminator included.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum number of compression pointers followed while decoding one name.
pub const MAX_POINTER_HOPS: usize = 32;

const POINTER_MASK: u8 = 0xC0;

/// A domain name as an owned sequence of labels.
///
/// Labels are kept as raw bytes so that decode and encode round-trip
/// losslessly, even for labels that are not valid UTF-8 or contain a dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    /// The root name, encoded as a single zero byte.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name from its labels, checking label and name length bounds.
    pub fn from_labels<I, L>(labels: I) -> Result<Self, DnsError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let labels: Vec<Vec<u8>> = labels.into_iter().map(|l| l.as_ref().to_vec()).collect();

        for label in &labels {
            if label.is_empty() {
                return Err(DnsError::MalformedName("empty label".into()));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsError::MalformedName(format!(
                    "label of {} bytes exceeds {}",
                    label.len(),
                    MAX_LABEL_LEN
                )));
            }
        }

        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(DnsError::MalformedName(format!(
                "name of {} bytes exceeds {}",
                name.wire_len(),
                MAX_NAME_LEN
            )));
        }
        Ok(name)
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(Vec::as_slice)
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Compare two names the way DNS does, ignoring ASCII case.
    pub fn eq_ignore_ascii_case(&self, other: &Name) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(&other.labels)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Number of bytes this name occupies in uncompressed wire form.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Append the uncompressed wire form of this name to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label);
        }
        buf.push(0);
    }
}

impl FromStr for Name {
    type Err = DnsError;

    /// Parse a dotted name. A single trailing dot is accepted; `""` and `"."`
    /// both denote the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::from_labels(trimmed.split('.'))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.is_root() {
            return f.write_str(".");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&String::from_utf8_lossy(label))?;
        }
        Ok(())
    }
}

/// Encode a name in uncompressed wire format.
pub fn encode_name(name: &Name) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.wire_len());
    name.write_to(&mut out);
    out
}

/// Decode the name starting at `cursor` in `buf`.
///
/// Returns the name and the offset of the first byte after it. When the name
/// ends in a compression pointer, that offset is the one following the first
/// pointer, not any position inside the region it points to. Every pointer
/// must target an offset strictly below its own position.
pub fn decode_name(buf: &[u8], cursor: usize) -> Result<(Name, usize), DnsError> {
    let mut labels = Vec::new();
    let mut wire_len = 1;
    let mut pos = cursor;
    let mut resume = None;
    let mut hops = 0;

    loop {
        let len = *buf.get(pos).ok_or_else(|| {
            DnsError::MalformedName(format!("name runs past end of buffer at offset {}", pos))
        })?;

        match len & POINTER_MASK {
            0x00 if len == 0 => {
                pos += 1;
                break;
            }
            0x00 => {
                let start = pos + 1;
                let end = start + len as usize;
                let label = buf.get(start..end).ok_or_else(|| {
                    DnsError::MalformedName(format!(
                        "label of {} bytes at offset {} runs past end of buffer",
                        len, pos
                    ))
                })?;

                wire_len += label.len() + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(DnsError::MalformedName(format!(
                        "name exceeds {} bytes",
                        MAX_NAME_LEN
                    )));
                }
                labels.push(label.to_vec());
                pos = end;
            }
            POINTER_MASK => {
                let low = *buf.get(pos + 1).ok_or_else(|| {
                    DnsError::MalformedName(format!("pointer at offset {} is cut short", pos))
                })?;
                let target = (((len & !POINTER_MASK) as usize) << 8) | low as usize;
                if target >= pos {
                    return Err(DnsError::MalformedName(format!(
                        "pointer at offset {} targets offset {}",
                        pos, target
                    )));
                }

                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DnsError::MalformedName(format!(
                        "more than {} compression pointers",
                        MAX_POINTER_HOPS
                    )));
                }

                if resume.is_none() {
                    resume = Some(pos + 2);
                }
                pos = target;
            }
            _ => {
                return Err(DnsError::MalformedName(format!(
                    "unsupported label type {:#04x} at offset {}",
                    len, pos
                )));
            }
        }
    }

    Ok((Name { labels }, resume.unwrap_or(pos)))
}
