//! DNS query framing and question name reconstruction
//!
//! Only the pieces the tunnel needs are read: the transaction ID and the
//! question name. Flags, counts, QTYPE and QCLASS are not interpreted.
//!
//! ```text
//! [id:2][flags:2][qd:2][an:2][ns:2][ar:2] | [len][label]...[0x00] | [qtype:2][qclass:2] | ...
//! ```

use crate::request::DiscardReason;
use crate::{DNS_HEADER_LEN, MAX_LABEL_LEN, QUESTION_TRAILER_LEN};

/// Smallest datagram that can hold a header, a root name and the question trailer
pub const MIN_QUERY_LEN: usize = DNS_HEADER_LEN + 1 + QUESTION_TRAILER_LEN;

/// Question name with the dots removed, plus where each label starts.
///
/// `as_bytes().len()` is the sum of all label lengths. The start offsets
/// are what the suffix validator needs to compare against a dotted domain
/// after both sides have lost their separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructedName {
    bytes: Vec<u8>,
    label_starts: Vec<usize>,
}

impl ReconstructedName {
    /// Walk a length-prefixed label sequence.
    ///
    /// Returns the reconstructed name and the number of wire bytes consumed,
    /// terminator included. Bytes after the terminator are left alone.
    pub fn from_wire(wire: &[u8]) -> Result<(Self, usize), DiscardReason> {
        let mut name = Self {
            bytes: Vec::with_capacity(wire.len()),
            label_starts: Vec::new(),
        };
        let mut cursor = 0;

        loop {
            let Some(&len_byte) = wire.get(cursor) else {
                return Err(DiscardReason::LabelOverrun { offset: cursor });
            };
            let len = len_byte as usize;

            if len == 0 {
                cursor += 1;
                break;
            }
            // Also rejects compression pointers (0b11xxxxxx)
            if len > MAX_LABEL_LEN {
                return Err(DiscardReason::LabelTooLong { offset: cursor, len });
            }

            let start = cursor + 1;
            let end = start + len;
            if end > wire.len() {
                return Err(DiscardReason::LabelOverrun { offset: cursor });
            }

            name.label_starts.push(name.bytes.len());
            name.bytes.extend_from_slice(&wire[start..end]);
            cursor = end;
        }

        Ok((name, cursor))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of labels joined, i.e. label boundaries crossed
    pub fn label_count(&self) -> usize {
        self.label_starts.len()
    }

    /// Offset of label `index` within `as_bytes()`
    ///
    /// Panics if `index >= label_count()`.
    pub(crate) fn label_start(&self, index: usize) -> usize {
        self.label_starts[index]
    }

    /// Bytes of label `index`
    ///
    /// Panics if `index >= label_count()`.
    pub(crate) fn label(&self, index: usize) -> &[u8] {
        let start = self.label_starts[index];
        let end = self
            .label_starts
            .get(index + 1)
            .copied()
            .unwrap_or(self.bytes.len());
        &self.bytes[start..end]
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.label_count()).map(move |i| self.label(i))
    }
}

/// Borrowed view of one received DNS query
#[derive(Debug)]
pub struct QueryPacket<'a> {
    /// Transaction ID, bytes 0-1 of the datagram, verbatim
    pub id: [u8; 2],
    /// Question name in wire form, terminator included
    pub qname: &'a [u8],
    /// Question name with the dots removed
    pub name: ReconstructedName,
}

impl<'a> QueryPacket<'a> {
    /// Split a datagram into transaction ID and question name.
    pub fn parse(datagram: &'a [u8]) -> Result<Self, DiscardReason> {
        if datagram.len() < MIN_QUERY_LEN {
            return Err(DiscardReason::TooShort { len: datagram.len() });
        }

        let question = &datagram[DNS_HEADER_LEN..];
        let (name, consumed) = ReconstructedName::from_wire(question)?;

        if question.len() - consumed < QUESTION_TRAILER_LEN {
            return Err(DiscardReason::MissingQuestionTrailer);
        }

        Ok(Self {
            id: [datagram[0], datagram[1]],
            qname: &question[..consumed],
            name,
        })
    }
}

/// Render a wire-form name as dotted text, for logs
pub fn qname_to_string(qname: &[u8]) -> String {
    match ReconstructedName::from_wire(qname) {
        Ok((name, _)) => name
            .labels()
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join("."),
        Err(_) => format!("{:02x?}", qname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(labels: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for label in labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        out.push(0);
        out
    }

    fn query(id: [u8; 2], qname: &[u8]) -> Vec<u8> {
        let mut packet = vec![id[0], id[1], 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        packet.extend_from_slice(qname);
        packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        packet
    }

    #[test]
    fn test_reconstruct_labels() {
        let w = wire(&[b"8S", b"t", b"example", b"com"]);
        let (name, consumed) = ReconstructedName::from_wire(&w).unwrap();

        assert_eq!(name.as_bytes(), b"8Stexamplecom");
        assert_eq!(name.label_count(), 4);
        assert_eq!(consumed, w.len());
        assert_eq!(name.label(0), b"8S");
        assert_eq!(name.label(2), b"example");
        assert_eq!(name.label_start(3), 10);
    }

    #[test]
    fn test_reconstruct_root_name() {
        let (name, consumed) = ReconstructedName::from_wire(&[0]).unwrap();
        assert!(name.is_empty());
        assert_eq!(name.label_count(), 0);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_reconstruct_stops_at_terminator() {
        let mut w = wire(&[b"abc"]);
        w.extend_from_slice(&[0x00, 0x10, 0x00, 0x01]);
        let (name, consumed) = ReconstructedName::from_wire(&w).unwrap();
        assert_eq!(name.as_bytes(), b"abc");
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_label_length_limit() {
        let label = [b'a'; 63];
        assert!(ReconstructedName::from_wire(&wire(&[&label])).is_ok());

        let mut w = vec![64];
        w.extend_from_slice(&[b'a'; 64]);
        w.push(0);
        assert_eq!(
            ReconstructedName::from_wire(&w),
            Err(DiscardReason::LabelTooLong { offset: 0, len: 64 })
        );
    }

    #[test]
    fn test_label_length_200() {
        let mut w = wire(&[b"8S", b"t"]);
        w.pop();
        w.push(200);
        w.extend_from_slice(&[b'x'; 10]);
        w.push(0);
        assert_eq!(
            ReconstructedName::from_wire(&w),
            Err(DiscardReason::LabelTooLong { offset: 5, len: 200 })
        );
    }

    #[test]
    fn test_compression_pointer_rejected() {
        let w = [0xc0, 0x0c];
        assert!(matches!(
            ReconstructedName::from_wire(&w),
            Err(DiscardReason::LabelTooLong { .. })
        ));
    }

    #[test]
    fn test_label_overrun() {
        // Claims 10 bytes, only 3 present
        let w = [10, b'a', b'b', b'c'];
        assert_eq!(
            ReconstructedName::from_wire(&w),
            Err(DiscardReason::LabelOverrun { offset: 0 })
        );

        // No terminator
        let w = [3, b'a', b'b', b'c'];
        assert_eq!(
            ReconstructedName::from_wire(&w),
            Err(DiscardReason::LabelOverrun { offset: 4 })
        );

        assert_eq!(
            ReconstructedName::from_wire(&[]),
            Err(DiscardReason::LabelOverrun { offset: 0 })
        );
    }

    #[test]
    fn test_long_names_are_not_capped() {
        // 7 full labels: a 255-byte payload in base36 needs about that many
        let label = [b'Z'; 63];
        let w = wire(&[&label, &label, &label, &label, &label, &label, &label, b"t"]);
        assert!(w.len() > 255);

        let (name, consumed) = ReconstructedName::from_wire(&w).unwrap();
        assert_eq!(consumed, w.len());
        assert_eq!(name.len(), 7 * 63 + 1);
        assert_eq!(name.label_count(), 8);
    }

    #[test]
    fn test_query_packet_parse() {
        let qname = wire(&[b"8S", b"t", b"example", b"com"]);
        let packet = query([0xbe, 0xef], &qname);

        let parsed = QueryPacket::parse(&packet).unwrap();
        assert_eq!(parsed.id, [0xbe, 0xef]);
        assert_eq!(parsed.qname, &qname[..]);
        assert_eq!(parsed.name.as_bytes(), b"8Stexamplecom");
    }

    #[test]
    fn test_query_packet_ignores_additional_records() {
        let qname = wire(&[b"8S", b"t"]);
        let mut packet = query([0, 1], &qname);
        // EDNS OPT record
        packet.extend_from_slice(&[0x00, 0x00, 0x29, 0x10, 0x00, 0, 0, 0, 0, 0, 0]);

        let parsed = QueryPacket::parse(&packet).unwrap();
        assert_eq!(parsed.name.as_bytes(), b"8St");
    }

    #[test]
    fn test_query_packet_too_short() {
        assert_eq!(
            QueryPacket::parse(&[0u8; 16]).unwrap_err(),
            DiscardReason::TooShort { len: 16 }
        );
    }

    #[test]
    fn test_query_packet_missing_trailer() {
        let qname = wire(&[b"8S", b"t", b"example", b"com"]);
        let mut packet = query([0, 1], &qname);
        packet.truncate(packet.len() - 2);
        assert_eq!(
            QueryPacket::parse(&packet).unwrap_err(),
            DiscardReason::MissingQuestionTrailer
        );
    }

    #[test]
    fn test_qname_to_string() {
        let qname = wire(&[b"8S", b"t", b"example", b"com"]);
        assert_eq!(qname_to_string(&qname), "8S.t.example.com");
        assert_eq!(qname_to_string(&[0]), "");
    }
}
