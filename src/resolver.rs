//! Question resolution.
//!
//! Questions are either forwarded one by one to a single upstream resolver or
//! answered locally when no upstream is configured.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use tokio::{
    net::{lookup_host, UdpSocket},
    time,
};

use crate::errors::DnsError;
use crate::header::Header;
use crate::message::{Message, Question, ResourceRecord};
use crate::utils::{hex_preview, type_name, CLASS_IN, TYPE_A};

/// Receive buffer for upstream replies.
pub const UPSTREAM_BUFFER_SIZE: usize = 4096;

/// Most answers one response can carry in its 16-bit ANCOUNT.
pub const MAX_ANSWERS: usize = u16::MAX as usize;

/// TTL of locally synthesized answers, in seconds.
pub const LOCAL_ANSWER_TTL: u32 = 60;

/// One request/reply exchange with an upstream resolver.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Address of the upstream, for log output.
    fn addr(&self) -> SocketAddr;

    /// Send one query datagram and wait for one reply datagram.
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DnsError>;
}

/// An upstream resolver reached over UDP.
///
/// Every exchange uses its own ephemeral socket, so concurrent requests never
/// read each other's replies.
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    addr: SocketAddr,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    /// Resolve a `host:port` string once and build an upstream for it.
    pub async fn lookup(target: &str, timeout: Duration) -> Result<Self, DnsError> {
        let addr = lookup_host(target)
            .await
            .map_err(|e| DnsError::Config(format!("Invalid resolver address {}: {}", target, e)))?
            .next()
            .ok_or_else(|| DnsError::Config(format!("Resolver {} has no address", target)))?;
        Ok(Self::new(addr, timeout))
    }

    async fn send_and_receive(&self, query: &[u8]) -> io::Result<Vec<u8>> {
        let local: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.addr).await?;
        socket.send(query).await?;

        let mut buf = vec![0u8; UPSTREAM_BUFFER_SIZE];
        let size = socket.recv(&mut buf).await?;
        buf.truncate(size);
        Ok(buf)
    }
}

#[async_trait]
impl Upstream for UdpUpstream {
    fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DnsError> {
        match time::timeout(self.timeout, self.send_and_receive(query)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(source)) => Err(DnsError::UpstreamUnavailable {
                addr: self.addr,
                source,
            }),
            Err(_) => Err(DnsError::UpstreamTimeout {
                addr: self.addr,
                timeout_ms: self.timeout.as_millis(),
            }),
        }
    }
}

/// Forwards each question of a request to the upstream as its own query.
#[derive(Clone)]
pub struct ForwardingResolver {
    upstream: Arc<dyn Upstream>,
}

impl ForwardingResolver {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Resolve every question in order and concatenate the answers.
    ///
    /// A question whose exchange fails contributes no answers; the others are
    /// still resolved.
    pub async fn resolve(&self, request: &Header, questions: &[Question]) -> Vec<ResourceRecord> {
        let mut answers = Vec::new();
        for question in questions {
            match self.resolve_one(request, question).await {
                Ok(mut records) => {
                    info!(
                        "Forwarded {} {} to {}: {} answer(s)",
                        question.name,
                        type_name(question.qtype),
                        self.upstream.addr(),
                        records.len()
                    );
                    answers.append(&mut records);
                    if answers.len() > MAX_ANSWERS {
                        warn!(
                            "Dropping {} answer(s) over the limit of {}",
                            answers.len() - MAX_ANSWERS,
                            MAX_ANSWERS
                        );
                        answers.truncate(MAX_ANSWERS);
                        break;
                    }
                }
                Err(e) => warn!(
                    "Forwarding {} {} failed, answering without it: {}",
                    question.name,
                    type_name(question.qtype),
                    e
                ),
            }
        }
        answers
    }

    /// Forward a single question and return the answers of the reply.
    pub async fn resolve_one(
        &self,
        request: &Header,
        question: &Question,
    ) -> Result<Vec<ResourceRecord>, DnsError> {
        let query = Message {
            header: Header {
                qd_count: 1,
                an_count: 0,
                ns_count: 0,
                ar_count: 0,
                ..*request
            },
            questions: vec![question.clone()],
            answers: Vec::new(),
        };

        let bytes = query.encode();
        trace!("Upstream query: {}", hex_preview(&bytes));
        let reply = self.upstream.exchange(&bytes).await?;
        trace!("Upstream reply: {}", hex_preview(&reply));

        let reply = Message::decode(&reply)?;
        validate_reply(&query, &reply)?;
        Ok(reply.answers)
    }
}

/// Check that `reply` answers `query`: same ID, QR set, same question.
fn validate_reply(query: &Message, reply: &Message) -> Result<(), DnsError> {
    if reply.header.id != query.header.id {
        return Err(DnsError::UpstreamMismatch(format!(
            "reply ID {:#06x} does not match query ID {:#06x}",
            reply.header.id, query.header.id
        )));
    }
    if !reply.header.query_response {
        return Err(DnsError::UpstreamMismatch("reply has QR=0".into()));
    }

    let echoed = reply.questions.len() == query.questions.len()
        && reply.questions.iter().zip(&query.questions).all(|(r, q)| {
            r.qtype == q.qtype && r.qclass == q.qclass && r.name.eq_ignore_ascii_case(&q.name)
        });
    if !echoed {
        return Err(DnsError::UpstreamMismatch(
            "reply does not echo the question that was sent".into(),
        ));
    }
    Ok(())
}

/// Answers questions without an upstream.
///
/// With no address configured it returns no answers. Otherwise every A/IN
/// question gets one A record pointing at that address.
#[derive(Debug, Clone, Default)]
pub struct LocalResponder {
    answer_addr: Option<Ipv4Addr>,
}

impl LocalResponder {
    pub fn new(answer_addr: Option<Ipv4Addr>) -> Self {
        Self { answer_addr }
    }

    pub fn answer(&self, questions: &[Question]) -> Vec<ResourceRecord> {
        let Some(addr) = self.answer_addr else {
            return Vec::new();
        };

        questions
            .iter()
            .filter(|q| q.qtype == TYPE_A && q.qclass == CLASS_IN)
            .map(|q| ResourceRecord {
                name: q.name.clone(),
                rtype: TYPE_A,
                rclass: CLASS_IN,
                ttl: LOCAL_ANSWER_TTL,
                rdata: addr.octets().to_vec(),
            })
            .collect()
    }
}

/// Where the answers of a request come from.
#[derive(Clone)]
pub enum AnswerSource {
    Forward(ForwardingResolver),
    Local(LocalResponder),
}

impl AnswerSource {
    pub async fn answer(&self, request: &Header, questions: &[Question]) -> Vec<ResourceRecord> {
        match self {
            AnswerSource::Forward(resolver) => resolver.resolve(request, questions).await,
            AnswerSource::Local(responder) => {
                debug!("No upstream configured, answering {} question(s) locally", questions.len());
                responder.answer(questions)
            }
        }
    }
}
