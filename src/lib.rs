//! dnsprox: DNS tunnel receiver
//!
//! Listens for UDP DNS queries whose question name carries a base36 payload in
//! the subdomain labels of a configured tunnel domain, decodes the payload and
//! hands a [`ParsedRequest`] to the consumer over a channel.
//!
//! ## Wire format
//!
//! ```text
//! [header:12][len]8S[len]t[len]example[len]com[0x00][qtype:2][qclass:2]
//!  ^^ transaction ID (first 2 bytes) becomes the response-correlation ID
//! ```
//!
//! Labels before the tunnel domain are concatenated without separators and
//! decoded as one base36 number, which is left-padded with zero bytes to the
//! configured payload size.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dnsprox::{DnsTunnelServer, ParsedRequest, TunnelConfig};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TunnelConfig {
//!         domain: "t.example.com".to_string(),
//!         listen_addr: "0.0.0.0:5353".to_string(),
//!         payload_size: 4,
//!         ..TunnelConfig::default()
//!     };
//!
//!     let (tx, mut rx) = mpsc::channel::<ParsedRequest>(config.queue_capacity);
//!     let server = DnsTunnelServer::from_config(&config)?.bind().await?;
//!     tokio::spawn(server.run(tx));
//!
//!     while let Some(request) = rx.recv().await {
//!         println!("{:04x} from {}: {:02x?}", request.transaction_id(), request.peer, request.data);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dns_query;
pub mod payload;
pub mod request;
pub mod server;
pub mod tunnel_domain;

pub use client::{build_tunnel_query, check_payload_len, send_payload};
pub use config::TunnelConfig;
pub use dns_query::{QueryPacket, ReconstructedName};
pub use payload::{decode_payload, encode_payload};
pub use request::{DiscardReason, PacketOutcome, ParsedRequest};
pub use server::{BoundServer, DnsTunnelServer, RequestParser};
pub use tunnel_domain::TunnelDomain;

/// Size of the fixed DNS message header
pub const DNS_HEADER_LEN: usize = 12;

/// QTYPE + QCLASS trailing the question name
pub const QUESTION_TRAILER_LEN: usize = 4;

/// Maximum bytes per DNS label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Largest datagram the listener will read
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// dnsprox error types
#[derive(Debug, thiserror::Error)]
pub enum DnsproxError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bind address could not be resolved
    #[error("Failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Bind address resolved to nothing
    #[error("No socket address found for {0}")]
    NoAddress(String),

    /// Listening socket could not be opened
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Consumer dropped the receiving half of the request channel
    #[error("Parsed request channel closed")]
    ChannelClosed,

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DnsproxError>;
