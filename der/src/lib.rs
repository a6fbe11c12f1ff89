//! Structural decoding of DER.
//!
//! [`walk`] turns a byte buffer into a lazy, depth-first stream of
//! [`Event`]s. Nothing is decoded until the caller pulls the next event,
//! so dropping the [`Walker`] stops the work. [`Forest`] builds an owned
//! tree from the same stream, bounded by [`Limits`].
//!
//! ```
//! use der::{Event, walk};
//!
//! // SEQUENCE { INTEGER 7 }
//! let events: Vec<_> = walk(&[0x30, 0x03, 0x02, 0x01, 0x07]).collect();
//! assert_eq!(4, events.len());
//! assert!(matches!(events[3], Event::Leave));
//! ```

#![forbid(unsafe_code)]

use asn1::{Class, Scalar, TAG_CONSTRUCTED, Tag};
use nom::{IResult, Parser};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;

pub mod error;
mod tree;

use error::Error;
pub use tree::{Content, Forest, Item, Limits, TlvNode};

/// A borrowed slice of the walked buffer, with its offset in that buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> ByteSpan<'a> {
    fn new(offset: usize, bytes: &'a [u8]) -> Self {
        ByteSpan { offset, bytes }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Hex dump of the span.
    pub fn lines(&self) -> hexdump::Lines<'a> {
        hexdump::lines(self.bytes)
    }
}

impl Serialize for ByteSpan<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ByteSpan", 2)?;
        state.serialize_field("offset", &self.offset)?;
        state.serialize_field("length", &self.bytes.len())?;
        state.end()
    }
}

/// One decoded TLV unit as carried by [`Event::Enter`].
///
/// Children of a constructed TLV follow as their own events. A primitive
/// TLV carries its interpreted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv<'a> {
    tag: Tag,
    header_len: usize,
    raw: ByteSpan<'a>,
    scalar: Option<Scalar<'a>>,
}

impl<'a> Tlv<'a> {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    /// Offset of the first identifier octet.
    pub fn offset(&self) -> usize {
        self.raw.offset
    }

    /// Number of identifier and length octets.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn header(&self) -> &'a [u8] {
        &self.raw.bytes[..self.header_len]
    }

    pub fn body(&self) -> ByteSpan<'a> {
        ByteSpan::new(
            self.raw.offset + self.header_len,
            &self.raw.bytes[self.header_len..],
        )
    }

    /// The whole unit: identifier, length and body octets.
    pub fn raw(&self) -> ByteSpan<'a> {
        self.raw
    }

    /// Interpreted content; `None` for constructed TLVs.
    pub fn scalar(&self) -> Option<&Scalar<'a>> {
        self.scalar.as_ref()
    }
}

/// A TLV that could not be decoded.
///
/// `residual` is the undecoded remainder of the enclosing top-level item
/// (or of the buffer, when the top-level header itself is broken), meant to
/// be hex-dumped by the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("offset {offset}: {reason}")]
pub struct StructuralError<'a> {
    offset: usize,
    reason: Error,
    residual: ByteSpan<'a>,
}

impl<'a> StructuralError<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reason(&self) -> &Error {
        &self.reason
    }

    pub fn residual(&self) -> ByteSpan<'a> {
        self.residual
    }
}

impl Serialize for StructuralError<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("StructuralError", 3)?;
        state.serialize_field("offset", &self.offset)?;
        state.serialize_field("reason", &self.reason.to_string())?;
        state.serialize_field("residual", &self.residual)?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    Enter(Tlv<'a>),
    /// Closes the most recent open `Enter`, primitive ones included.
    Leave,
    /// Implicitly closes every `Enter` still open in the current top-level
    /// item; no `Leave` follows for them.
    Malformed(StructuralError<'a>),
}

/// Walks `input` as a sequence of top-level TLVs.
pub fn walk(input: &[u8]) -> Walker<'_> {
    Walker {
        input,
        pos: 0,
        open: Vec::new(),
        leave_leaf: false,
        finished: false,
    }
}

/// Lazy event stream over a DER buffer. See [`walk`].
///
/// Open constructed TLVs are tracked on a heap stack, so deep nesting costs
/// memory proportional to the input rather than call stack.
#[derive(Debug, Clone)]
pub struct Walker<'a> {
    input: &'a [u8],
    pos: usize,
    // end offsets of the constructed TLVs still waiting for their Leave
    open: Vec<usize>,
    leave_leaf: bool,
    finished: bool,
}

impl<'a> Walker<'a> {
    /// Nesting level of the cursor; 0 between top-level items.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn malformed(&mut self, start: usize, reason: Error) -> Event<'a> {
        // The outermost open TLV bounds the damage; without one the rest of
        // the buffer is unaccounted for.
        let end = match self.open.first() {
            Some(&end) => end,
            None => {
                self.finished = true;
                self.input.len()
            }
        };
        self.open.clear();
        self.pos = end;

        tracing::debug!(offset = start, %reason, "malformed TLV");
        Event::Malformed(StructuralError {
            offset: start,
            reason,
            residual: ByteSpan::new(start, &self.input[start..end]),
        })
    }
}

impl<'a> Iterator for Walker<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.leave_leaf {
            self.leave_leaf = false;
            return Some(Event::Leave);
        }

        let limit = match self.open.last() {
            Some(&end) if self.pos == end => {
                self.open.pop();
                return Some(Event::Leave);
            }
            Some(&end) => end,
            None if self.pos == self.input.len() => {
                self.finished = true;
                return None;
            }
            None => self.input.len(),
        };

        let start = self.pos;
        let header = match parse_unit(&self.input[start..limit]) {
            Ok(header) => header,
            Err(reason) => return Some(self.malformed(start, reason)),
        };

        let end = start + header.header_len + header.body_len;
        let raw = ByteSpan::new(start, &self.input[start..end]);
        let scalar = if header.tag.is_constructed() {
            self.pos = start + header.header_len;
            self.open.push(end);
            None
        } else {
            self.pos = end;
            self.leave_leaf = true;
            Some(asn1::interpret(
                header.tag,
                &self.input[start + header.header_len..end],
            ))
        };

        Some(Event::Enter(Tlv {
            tag: header.tag,
            header_len: header.header_len,
            raw,
            scalar,
        }))
    }
}

impl std::iter::FusedIterator for Walker<'_> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    tag: Tag,
    header_len: usize,
    body_len: usize,
}

/// Parses identifier and length octets and checks the body fits in `input`.
fn parse_unit(input: &[u8]) -> Result<Header, Error> {
    let (rest, tag) = parse_tag(input)?;
    let (rest, body_len) = parse_length(rest)?;
    if body_len > rest.len() {
        return Err(Error::TruncatedBody {
            declared: body_len,
            available: rest.len(),
        });
    }
    Ok(Header {
        tag,
        header_len: input.len() - rest.len(),
        body_len,
    })
}

fn byte(input: &[u8]) -> IResult<&[u8], u8> {
    nom::number::complete::be_u8(input)
}

fn take_bytes(input: &[u8], count: usize) -> IResult<&[u8], &[u8]> {
    nom::bytes::complete::take(count).parse(input)
}

fn parse_tag(input: &[u8]) -> Result<(&[u8], Tag), Error> {
    let (mut input, n) = byte(input).map_err(|_| Error::TruncatedIdentifier)?;
    let class = Class::from_identifier(n);
    let constructed = n & TAG_CONSTRUCTED == TAG_CONSTRUCTED;
    let mut number = u32::from(n & 0x1f);

    if number == 0x1f {
        // long form
        // Following octets carry the number base-128, big-endian.
        // A set high bit means another octet follows.
        number = 0;
        loop {
            let (rest, b) = byte(input).map_err(|_| Error::TruncatedIdentifier)?;
            input = rest;
            if number.leading_zeros() < 7 {
                return Err(Error::TagNumberOverflow);
            }
            number = (number << 7) | u32::from(b & 0x7f);
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    Ok((input, Tag::new(class, constructed, number)))
}

fn parse_length(input: &[u8]) -> Result<(&[u8], usize), Error> {
    let (input, n) = byte(input).map_err(|_| Error::TruncatedLength)?;
    match n {
        // short form: 0-127
        0x00..=0x7f => Ok((input, n as usize)),
        0x80 => Err(Error::IndefiniteLength),
        0xff => Err(Error::ReservedLength),
        _ => {
            // long form
            // First 1 bit is a marker for long form.
            // Other bits represent bytes length of the length field.
            let count = n & 0x7f;
            let (input, bs) =
                take_bytes(input, count as usize).map_err(|_| Error::TruncatedLength)?;
            let significant = bs.iter().position(|&b| b != 0).map_or(&[][..], |i| &bs[i..]);
            if significant.len() > size_of::<usize>() {
                return Err(Error::LengthOverflow(count));
            }
            let length = significant
                .iter()
                .fold(0usize, |n, &b| (n << 8) | b as usize);
            Ok((input, length))
        }
    }
}

#[cfg(test)]
mod tests {
    use asn1::{Class, Scalar, Tag};
    use rstest::rstest;

    use crate::error::Error;
    use crate::{Event, Tlv, parse_length, parse_tag, parse_unit, walk};

    const CERT_DER: &[u8] = include_bytes!("../../testdata/gnutls-ca.der");

    #[rstest(input, expected,
        case(vec![0x02], Tag::universal(2)),
        case(vec![0x02, 0x01], Tag::universal(2)),
        case(vec![0x30, 0x01], Tag::new(Class::Universal, true, 16)),
        case(vec![0xa3], Tag::new(Class::ContextSpecific, true, 3)),
        case(vec![0x5f, 0x20], Tag::new(Class::Application, false, 32)),
        case(vec![0x9f, 0x81, 0x00], Tag::new(Class::ContextSpecific, false, 128)),
        case(vec![0xff, 0x87, 0xff, 0x7f], Tag::new(Class::Private, true, 0x1ffff)),
        case(vec![0x1f, 0x8f, 0xff, 0xff, 0xff, 0x7f], Tag::universal(u32::MAX)),
    )]
    fn test_parse_tag(input: Vec<u8>, expected: Tag) {
        let (_, actual) = parse_tag(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        case(vec![], Error::TruncatedIdentifier),
        case(vec![0x1f], Error::TruncatedIdentifier),
        case(vec![0x1f, 0x81], Error::TruncatedIdentifier),
        // 33 significant bits
        case(vec![0x1f, 0x90, 0x80, 0x80, 0x80, 0x00], Error::TagNumberOverflow),
    )]
    fn test_parse_tag_error(input: Vec<u8>, expected: Error) {
        assert_eq!(Err(expected), parse_tag(&input).map(|(_, t)| t));
    }

    #[rstest(input, expected,
        case(vec![0x02], 0x02),
        case(vec![0x02, 0x01], 0x02),
        case(vec![0x30, 0x01], 0x30),
        case(vec![0x7f], 0x7f),
        case(vec![0x81, 0x80], 0x80),
        case(vec![0x82, 0x02, 0x10], 256 * 0x02 + 0x10),
        case(vec![0x83, 0x01, 0x00, 0x00], 256 * 256),
        case(vec![0x82, 0xff, 0xff], 256 * 0xff + 0xff),
        case(vec![0x8a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00], 256),
    )]
    fn test_parse_length(input: Vec<u8>, expected: usize) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        case(vec![], Error::TruncatedLength),
        case(vec![0x80], Error::IndefiniteLength),
        case(vec![0xff], Error::ReservedLength),
        case(vec![0x82, 0x01], Error::TruncatedLength),
        case(vec![0x89, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], Error::LengthOverflow(9)),
    )]
    fn test_parse_length_error(input: Vec<u8>, expected: Error) {
        assert_eq!(Err(expected), parse_length(&input).map(|(_, n)| n));
    }

    #[test]
    fn test_parse_unit_truncated_body() {
        assert_eq!(
            Err(Error::TruncatedBody {
                declared: 3,
                available: 1
            }),
            parse_unit(&[0x04, 0x03, 0x00])
        );
    }

    fn enter<'e, 'a>(event: &'e Event<'a>) -> &'e Tlv<'a> {
        match event {
            Event::Enter(tlv) => tlv,
            other => panic!("expected Enter, got {:?}", other),
        }
    }

    fn scalar<'e, 'a>(event: &'e Event<'a>) -> &'e Scalar<'a> {
        enter(event)
            .scalar()
            .expect("primitive TLV carries a scalar")
    }

    /// `depth` SEQUENCEs, each wrapping the next, the innermost empty.
    pub(crate) fn nested_sequences(depth: usize) -> Vec<u8> {
        fn length_octets(n: usize) -> Vec<u8> {
            if n < 0x80 {
                return vec![n as u8];
            }
            let bytes: Vec<u8> = n
                .to_be_bytes()
                .into_iter()
                .skip_while(|&b| b == 0)
                .collect();
            let mut out = vec![0x80 | bytes.len() as u8];
            out.extend(bytes);
            out
        }

        // body lengths from the innermost level outwards
        let mut lengths = vec![0usize];
        for _ in 1..depth {
            let inner = *lengths.last().unwrap();
            lengths.push(inner + 1 + length_octets(inner).len());
        }
        let mut out = Vec::new();
        for n in lengths.iter().rev() {
            out.push(0x30);
            out.extend(length_octets(*n));
        }
        out
    }

    #[rstest(input, expected,
        case(vec![0x02, 0x01, 0x00], "0"),
        case(vec![0x02, 0x02, 0x00, 0xff], "255"),
        case(vec![0x02, 0x01, 0xff], "-1"),
    )]
    fn test_walk_integer(input: Vec<u8>, expected: &str) {
        let events: Vec<_> = walk(&input).collect();
        assert_eq!(2, events.len());
        match scalar(&events[0]) {
            Scalar::Integer(i) => assert_eq!(expected, i.to_string()),
            other => panic!("expected INTEGER, got {:?}", other),
        }
        assert_eq!(Event::Leave, events[1]);
    }

    #[test]
    fn test_walk_object_identifier() {
        let input = [0x06, 0x03, 0x2a, 0x86, 0x48];
        let events: Vec<_> = walk(&input).collect();
        match scalar(&events[0]) {
            Scalar::ObjectIdentifier(oid) => assert_eq!(oid, &"1.2.840"),
            other => panic!("expected OBJECT IDENTIFIER, got {:?}", other),
        }
    }

    #[test]
    fn test_walk_structured() {
        let input = [0x30, 0x09, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08, 0x02, 0x01, 0x09];
        let events: Vec<_> = walk(&input).collect();
        assert_eq!(8, events.len());

        let seq = enter(&events[0]);
        assert_eq!(Tag::new(Class::Universal, true, 16), seq.tag());
        assert_eq!(2, seq.header_len());
        assert_eq!(9, seq.body().len());

        for (i, offset) in [(1, 2), (3, 5), (5, 8)] {
            let int = enter(&events[i]);
            assert_eq!(offset, int.offset());
            assert_eq!(Tag::universal(2), int.tag());
            assert_eq!(Event::Leave, events[i + 1]);
        }
        assert_eq!(Event::Leave, events[7]);
    }

    #[test]
    fn test_walk_zero_length_bodies() {
        // SEQUENCE {}, NULL, OCTET STRING ''
        let input = [0x30, 0x00, 0x05, 0x00, 0x04, 0x00];
        let events: Vec<_> = walk(&input).collect();
        assert_eq!(6, events.len());
        assert!(matches!(events[0], Event::Enter(ref t) if t.body().is_empty() && t.scalar().is_none()));
        assert_eq!(Event::Leave, events[1]);
        assert_eq!(&Scalar::Null, scalar(&events[2]));
        assert_eq!(&Scalar::OctetString(&[]), scalar(&events[4]));
    }

    #[test]
    fn test_walk_multiple_top_level_items() {
        let input = [0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let offsets: Vec<_> = walk(&input)
            .filter_map(|e| match e {
                Event::Enter(tlv) => Some(tlv.offset()),
                _ => None,
            })
            .collect();
        assert_eq!(vec![0, 3], offsets);
    }

    #[test]
    fn test_walk_truncated_top_level_body() {
        let input = [0x02, 0x01, 0x05, 0x04, 0x05, 0x61, 0x62];
        let events: Vec<_> = walk(&input).collect();

        assert_eq!(3, events.len());
        assert!(matches!(events[0], Event::Enter(_)));
        assert_eq!(Event::Leave, events[1]);
        match &events[2] {
            Event::Malformed(err) => {
                assert_eq!(3, err.offset());
                assert_eq!(
                    &Error::TruncatedBody {
                        declared: 5,
                        available: 2
                    },
                    err.reason()
                );
                assert!(err.reason().to_string().starts_with("truncated body"));
                assert_eq!(&input[3..], err.residual().bytes());
                assert_eq!(3, err.residual().offset());
                assert_eq!(1, err.residual().lines().count());
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_walk_nested_error_resumes_at_next_item() {
        // SEQUENCE { INTEGER 1, OCTET STRING claiming 4 bytes of 1 }, INTEGER 2
        let input = [
            0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x04, 0x00, 0x02, 0x01, 0x02,
        ];
        let events: Vec<_> = walk(&input).collect();

        assert_eq!(6, events.len());
        assert!(matches!(events[0], Event::Enter(_)));
        assert!(matches!(events[1], Event::Enter(_)));
        assert_eq!(Event::Leave, events[2]);
        match &events[3] {
            Event::Malformed(err) => {
                assert_eq!(5, err.offset());
                assert_eq!(&input[5..8], err.residual().bytes());
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
        assert_eq!(8, enter(&events[4]).offset());
        assert_eq!(Event::Leave, events[5]);
    }

    #[rstest(input, expected,
        case(vec![0x30, 0x80, 0x00, 0x00], Error::IndefiniteLength),
        case(vec![0x30], Error::TruncatedLength),
        case(vec![0x1f], Error::TruncatedIdentifier),
    )]
    fn test_walk_header_errors(input: Vec<u8>, expected: Error) {
        let events: Vec<_> = walk(&input).collect();
        assert_eq!(1, events.len());
        match &events[0] {
            Event::Malformed(err) => {
                assert_eq!(0, err.offset());
                assert_eq!(&expected, err.reason());
                assert_eq!(input.len(), err.residual().len());
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_walk_child_cannot_exceed_parent() {
        // the OCTET STRING fits in the buffer but not in its SEQUENCE
        let input = [0x30, 0x03, 0x04, 0x02, 0x00, 0x00];
        let events: Vec<_> = walk(&input).collect();
        match &events[1] {
            Event::Malformed(err) => {
                assert_eq!(2, err.offset());
                assert_eq!(
                    &Error::TruncatedBody {
                        declared: 2,
                        available: 1
                    },
                    err.reason()
                );
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
        // the trailing byte after the SEQUENCE is its own broken item
        assert!(matches!(events[2], Event::Malformed(ref e) if e.offset() == 5));
        assert_eq!(3, events.len());
    }

    #[test]
    fn test_walk_reproduces_input() {
        let mut rebuilt = Vec::new();
        let mut depth = 0usize;
        for event in walk(CERT_DER) {
            match event {
                Event::Enter(tlv) => {
                    depth += 1;
                    rebuilt.extend_from_slice(tlv.header());
                    if !tlv.is_constructed() {
                        rebuilt.extend_from_slice(tlv.body().bytes());
                    }
                }
                Event::Leave => depth -= 1,
                Event::Malformed(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(0, depth);
        assert_eq!(CERT_DER, rebuilt.as_slice());
    }

    #[test]
    fn test_walk_certificate_shape() {
        let enters = walk(CERT_DER)
            .filter(|e| matches!(e, Event::Enter(_)))
            .count();
        assert_eq!(73, enters);

        let mut walker = walk(CERT_DER);
        let event = walker.next().unwrap();
        let first = enter(&event);
        assert_eq!(4, first.header_len());
        assert_eq!(556, first.body().len());
        assert_eq!(1, walker.depth());
    }

    #[test]
    fn test_walk_every_prefix_stays_in_bounds() {
        for len in 0..CERT_DER.len() {
            let prefix = &CERT_DER[..len];
            let mut malformed = 0;
            for event in walk(prefix) {
                match event {
                    Event::Enter(tlv) => assert!(tlv.raw().end() <= prefix.len()),
                    Event::Malformed(err) => {
                        malformed += 1;
                        assert!(err.residual().end() <= prefix.len());
                    }
                    Event::Leave => {}
                }
            }
            // every strict prefix of a single TLV is broken
            if len > 0 {
                assert!(malformed > 0, "prefix of {} bytes decoded cleanly", len);
            }
        }
    }

    #[test]
    fn test_walk_is_lazy() {
        let input = nested_sequences(200_000);
        let mut walker = walk(&input);
        let entered = walker
            .by_ref()
            .take(10)
            .filter(|e| matches!(e, Event::Enter(_)))
            .count();
        assert_eq!(10, entered);
        assert_eq!(10, walker.depth());
    }

    #[test]
    fn test_nested_sequences_balance() {
        let input = nested_sequences(300);
        let (mut enters, mut leaves) = (0, 0);
        for event in walk(&input) {
            match event {
                Event::Enter(_) => enters += 1,
                Event::Leave => leaves += 1,
                Event::Malformed(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(300, enters);
        assert_eq!(300, leaves);
    }

    #[test]
    fn test_walk_stops_after_top_level_error() {
        let input = [0x30, 0x80, 0x02, 0x01, 0x01];
        let mut walker = walk(&input);
        assert!(matches!(walker.next(), Some(Event::Malformed(_))));
        assert_eq!(None, walker.next());
    }
}
