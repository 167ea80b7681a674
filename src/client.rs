//! Sending side: pack a payload into a DNS query
//!
//! Format: `<base36 chunk>.<base36 chunk>...<tunnel domain>`, each chunk at
//! most 63 characters, sent as an A/IN question.

use crate::payload::encode_payload;
use crate::tunnel_domain::TunnelDomain;
use crate::{DnsproxError, Result, MAX_LABEL_LEN};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Check that `payload` is exactly the receiver's configured size
///
/// The receiver left-pads shorter payloads and discards longer ones, so a
/// mismatch would arrive altered or not at all.
pub fn check_payload_len(payload: &[u8], payload_size: u8) -> Result<()> {
    if payload_size == 0 {
        return Err(DnsproxError::InvalidConfig(
            "payload_size must be at least 1".into(),
        ));
    }
    if payload.len() != payload_size as usize {
        return Err(DnsproxError::InvalidConfig(format!(
            "payload is {} bytes, expected {}",
            payload.len(),
            payload_size
        )));
    }
    Ok(())
}

/// Encode a payload into a wire-form question name under `domain`
///
/// The name is not capped at the RFC 1035 255-byte limit: the receiver only
/// bounds individual labels, and large payloads need more room than that.
pub fn encode_qname(domain: &TunnelDomain, payload: &[u8]) -> Vec<u8> {
    let encoded = encode_payload(payload);
    let mut qname = Vec::with_capacity(encoded.len() + domain.as_str().len() + 8);

    for chunk in encoded.as_bytes().chunks(MAX_LABEL_LEN) {
        qname.push(chunk.len() as u8);
        qname.extend_from_slice(chunk);
    }

    for label in domain.labels() {
        qname.push(label.len() as u8);
        qname.extend_from_slice(label.as_bytes());
    }

    // Null terminator
    qname.push(0);

    qname
}

/// Build a complete DNS query packet carrying `payload`
pub fn build_tunnel_query(domain: &TunnelDomain, payload: &[u8], transaction_id: u16) -> Vec<u8> {
    let qname = encode_qname(domain, payload);
    let mut packet = Vec::with_capacity(12 + qname.len() + 4);

    // Header (12 bytes)
    packet.extend_from_slice(&transaction_id.to_be_bytes()); // Transaction ID
    packet.extend_from_slice(&[0x01, 0x00]); // Flags: standard query, RD
    packet.extend_from_slice(&[0x00, 0x01]); // QDCOUNT: 1 question
    packet.extend_from_slice(&[0x00, 0x00]); // ANCOUNT
    packet.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
    packet.extend_from_slice(&[0x00, 0x00]); // ARCOUNT

    packet.extend_from_slice(&qname);

    // QTYPE: A, QCLASS: IN
    packet.extend_from_slice(&[0x00, 0x01]);
    packet.extend_from_slice(&[0x00, 0x01]);

    packet
}

/// Send one tunnel query to `server` without waiting for a reply.
///
/// Returns the number of bytes sent.
pub async fn send_payload(
    server: SocketAddr,
    domain: &TunnelDomain,
    payload: &[u8],
    transaction_id: u16,
) -> Result<usize> {
    let packet = build_tunnel_query(domain, payload, transaction_id);

    let local: SocketAddr = if server.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = UdpSocket::bind(local).await?;
    let sent = socket.send_to(&packet, server).await?;

    log::debug!(
        "Sent tunnel query {:04x} to {} ({} bytes, {} bytes payload)",
        transaction_id,
        server,
        sent,
        payload.len()
    );

    Ok(sent)
}
