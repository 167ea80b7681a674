//! Tunnel domain and suffix validation
//!
//! The configured domain is stored both dotted (for logs) and dot-stripped,
//! together with its label lengths. A reconstructed query name belongs to the
//! tunnel when its trailing labels line up with the domain's labels and the
//! covered bytes equal the dot-stripped domain.

use crate::dns_query::ReconstructedName;
use crate::{DnsproxError, MAX_LABEL_LEN, Result};
use std::fmt;

/// Longest dotted domain name (RFC 1035, presentation form)
const MAX_DOMAIN_LEN: usize = 253;

/// Parent domain that carries tunnel queries, e.g. `tunnel.example.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelDomain {
    dotted: String,
    stripped: Vec<u8>,
    label_lens: Vec<usize>,
}

impl TunnelDomain {
    /// Parse a dotted domain. A single trailing dot is accepted.
    pub fn parse(domain: &str) -> Result<Self> {
        let dotted = domain.strip_suffix('.').unwrap_or(domain);

        if dotted.is_empty() {
            return Err(DnsproxError::InvalidConfig("tunnel domain is empty".into()));
        }
        if dotted.len() > MAX_DOMAIN_LEN {
            return Err(DnsproxError::InvalidConfig(format!(
                "tunnel domain is {} characters (max: {})",
                dotted.len(),
                MAX_DOMAIN_LEN
            )));
        }
        if !dotted.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(DnsproxError::InvalidConfig(format!(
                "tunnel domain {:?} contains non-printable or non-ASCII characters",
                dotted
            )));
        }

        let mut stripped = Vec::with_capacity(dotted.len());
        let mut label_lens = Vec::new();
        for label in dotted.split('.') {
            if label.is_empty() {
                return Err(DnsproxError::InvalidConfig(format!(
                    "tunnel domain {:?} has an empty label",
                    dotted
                )));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsproxError::InvalidConfig(format!(
                    "label {:?} is {} bytes (max: {})",
                    label,
                    label.len(),
                    MAX_LABEL_LEN
                )));
            }
            stripped.extend_from_slice(label.as_bytes());
            label_lens.push(label.len());
        }

        Ok(Self {
            dotted: dotted.to_string(),
            stripped,
            label_lens,
        })
    }

    /// Dotted form, without trailing dot
    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    /// Domain with all dots removed
    pub fn stripped(&self) -> &[u8] {
        &self.stripped
    }

    pub fn label_count(&self) -> usize {
        self.label_lens.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.dotted.split('.')
    }

    /// Strip the tunnel domain off a reconstructed name.
    ///
    /// Returns the dot-free payload labels in front of the domain, or `None`
    /// when the name does not end in this domain. The comparison is a
    /// case-sensitive byte comparison anchored on label boundaries, so
    /// `x.texample.com` does not match `t.example.com` even though both strip
    /// to a string ending in `texamplecom`.
    pub fn strip_suffix<'a>(&self, name: &'a ReconstructedName) -> Option<&'a [u8]> {
        let domain_labels = self.label_count();
        let name_labels = name.label_count();
        if name_labels < domain_labels {
            return None;
        }

        let first = name_labels - domain_labels;
        let aligned = self
            .label_lens
            .iter()
            .enumerate()
            .all(|(i, &len)| name.label(first + i).len() == len);
        if !aligned {
            return None;
        }

        let start = name.label_start(first);
        let bytes = name.as_bytes();
        if bytes[start..] != self.stripped[..] {
            return None;
        }

        Some(&bytes[..start])
    }
}

impl fmt::Display for TunnelDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted)
    }
}

impl std::str::FromStr for TunnelDomain {
    type Err = DnsproxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
