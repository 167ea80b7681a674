//! Per-packet results handed out of the pipeline

use crate::dns_query::qname_to_string;
use bytes::Bytes;
use std::net::SocketAddr;

/// Decoded tunnel request, one per accepted DNS query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// DNS transaction ID, to be echoed in the reply
    pub resp_id: [u8; 2],
    /// Sender of the query
    pub peer: SocketAddr,
    /// Question name in wire form (copied out of the receive buffer)
    pub domain: Bytes,
    /// Payload, exactly the configured size, left-padded with zeros
    pub data: Box<[u8]>,
}

impl ParsedRequest {
    pub fn transaction_id(&self) -> u16 {
        u16::from_be_bytes(self.resp_id)
    }

    /// Question name as dotted text
    pub fn domain_name(&self) -> String {
        qname_to_string(&self.domain)
    }
}

/// Why a datagram was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscardReason {
    #[error("datagram too short: {len} bytes")]
    TooShort { len: usize },

    #[error("label length {len} at offset {offset} exceeds 63")]
    LabelTooLong { offset: usize, len: usize },

    #[error("label at offset {offset} runs past the end of the question")]
    LabelOverrun { offset: usize },

    #[error("question name not followed by QTYPE/QCLASS")]
    MissingQuestionTrailer,

    #[error("request not intended for this tunnel")]
    ForeignDomain,

    #[error("no payload labels in front of the tunnel domain")]
    EmptyPayload,

    #[error("illegal character 0x{byte:02x} at position {position} in subdomains")]
    InvalidAlphabet { byte: u8, position: usize },

    #[error("decoded payload is {decoded} bytes (max: {capacity})")]
    PayloadTooLarge { decoded: usize, capacity: usize },
}

impl DiscardReason {
    /// Suffix mismatches are ordinary traffic on a shared resolver, not faults
    pub fn is_foreign(&self) -> bool {
        matches!(self, DiscardReason::ForeignDomain)
    }
}

/// Outcome of running one datagram through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketOutcome {
    Accepted(ParsedRequest),
    Discarded(DiscardReason),
}

impl PacketOutcome {
    pub fn accepted(self) -> Option<ParsedRequest> {
        match self {
            PacketOutcome::Accepted(request) => Some(request),
            PacketOutcome::Discarded(_) => None,
        }
    }

    pub fn discarded(&self) -> Option<&DiscardReason> {
        match self {
            PacketOutcome::Accepted(_) => None,
            PacketOutcome::Discarded(reason) => Some(reason),
        }
    }
}

impl From<Result<ParsedRequest, DiscardReason>> for PacketOutcome {
    fn from(result: Result<ParsedRequest, DiscardReason>) -> Self {
        match result {
            Ok(request) => PacketOutcome::Accepted(request),
            Err(reason) => PacketOutcome::Discarded(reason),
        }
    }
}
