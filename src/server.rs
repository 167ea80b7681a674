//! UDP listener and per-packet pipeline
//!
//! socket → receive buffer → name reconstruction → suffix check → base36 decode → channel
//!
//! Datagrams are handled strictly one at a time. Every malformed or foreign
//! packet is logged and dropped; nothing about a single datagram can stop
//! the loop.

use crate::config::TunnelConfig;
use crate::dns_query::QueryPacket;
use crate::payload::decode_payload;
use crate::request::{DiscardReason, PacketOutcome, ParsedRequest};
use crate::tunnel_domain::TunnelDomain;
use crate::{DnsproxError, MAX_DATAGRAM_SIZE, Result};
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;

/// Turns one datagram into a [`PacketOutcome`]. Holds no per-packet state.
#[derive(Debug, Clone)]
pub struct RequestParser {
    domain: TunnelDomain,
    payload_size: u8,
}

impl RequestParser {
    pub fn new(domain: TunnelDomain, payload_size: u8) -> Self {
        Self {
            domain,
            payload_size,
        }
    }

    pub fn domain(&self) -> &TunnelDomain {
        &self.domain
    }

    pub fn payload_size(&self) -> u8 {
        self.payload_size
    }

    /// Run the full pipeline over one received datagram.
    ///
    /// Everything in an accepted request is copied out of `datagram`, so the
    /// caller may reuse the buffer immediately.
    pub fn parse(&self, datagram: &[u8], peer: SocketAddr) -> PacketOutcome {
        self.try_parse(datagram, peer).into()
    }

    fn try_parse(
        &self,
        datagram: &[u8],
        peer: SocketAddr,
    ) -> std::result::Result<ParsedRequest, DiscardReason> {
        let query = QueryPacket::parse(datagram)?;

        let encoded = self
            .domain
            .strip_suffix(&query.name)
            .ok_or(DiscardReason::ForeignDomain)?;

        let data = decode_payload(encoded, self.payload_size as usize)?;

        Ok(ParsedRequest {
            resp_id: query.id,
            peer,
            domain: Bytes::copy_from_slice(query.qname),
            data,
        })
    }
}

/// DNS tunnel server, not yet bound
pub struct DnsTunnelServer {
    listen_addr: String,
    parser: RequestParser,
}

impl DnsTunnelServer {
    pub fn new(domain: TunnelDomain, listen_addr: impl Into<String>, payload_size: u8) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            parser: RequestParser::new(domain, payload_size),
        }
    }

    /// Build a server from a validated configuration
    pub fn from_config(config: &TunnelConfig) -> Result<Self> {
        config.validate()?;
        let domain = TunnelDomain::parse(&config.domain)?;
        Ok(Self::new(domain, config.listen_addr.clone(), config.payload_size))
    }

    pub fn parser(&self) -> &RequestParser {
        &self.parser
    }

    /// Resolve the listen address and open the socket.
    ///
    /// Failure here is fatal to the caller; there is no retry.
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = lookup_host(self.listen_addr.as_str())
            .await
            .map_err(|source| DnsproxError::Resolve {
                addr: self.listen_addr.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| DnsproxError::NoAddress(self.listen_addr.clone()))?;

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DnsproxError::Bind { addr, source })?;

        log::info!(
            "DNS tunnel server for {} listening on {}",
            self.parser.domain(),
            socket.local_addr().unwrap_or(addr)
        );

        Ok(BoundServer {
            socket,
            parser: self.parser,
        })
    }
}

/// DNS tunnel server with an open socket
pub struct BoundServer {
    socket: UdpSocket,
    parser: RequestParser,
}

impl BoundServer {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and process datagrams until the request channel closes.
    ///
    /// A full channel blocks intake; datagrams then wait in (or are dropped
    /// by) the kernel socket buffer.
    pub async fn run(self, requests: mpsc::Sender<ParsedRequest>) -> Result<()> {
        let domain = self.parser.domain().clone();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    log::error!("UDP recv_from error in {} server: {}", domain, e);
                    continue;
                }
            };

            match self.parser.parse(&buf[..len], peer) {
                PacketOutcome::Accepted(request) => {
                    log::debug!(
                        "Accepted request {:04x} from {} ({} bytes payload)",
                        request.transaction_id(),
                        peer,
                        request.data.len()
                    );
                    if requests.send(request).await.is_err() {
                        log::info!("Request channel closed, stopping {} server", domain);
                        return Err(DnsproxError::ChannelClosed);
                    }
                }
                PacketOutcome::Discarded(reason) if reason.is_foreign() => {
                    log::debug!("Discard request from {}. Request not intended for {}", peer, domain);
                }
                PacketOutcome::Discarded(reason) => {
                    log::warn!("Discard request from {} in {} server: {}", peer, domain, reason);
                }
            }
        }
    }
}
