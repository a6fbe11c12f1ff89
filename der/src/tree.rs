//! Eager decoding into an owned tree.
//!
//! The tree is built from the [`walk`] event stream without recursion, but
//! the resulting nodes are dropped and serialized recursively, so depth and
//! node count are capped by [`Limits`].

use asn1::{Scalar, Tag};
use derview::decoder::{DecodableFrom, Decoder};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::error::Error;
use crate::{ByteSpan, Event, StructuralError, Tlv, walk};

/// Bounds for eager decoding of untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: 64,
            max_nodes: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<'a> {
    Compound(Vec<TlvNode<'a>>),
    Primitive(Scalar<'a>),
}

/// A decoded TLV together with everything nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvNode<'a> {
    tag: Tag,
    header_len: usize,
    raw: ByteSpan<'a>,
    content: Content<'a>,
}

impl<'a> TlvNode<'a> {
    fn leaf(tlv: Tlv<'a>) -> Self {
        let content = match tlv.scalar {
            Some(scalar) => Content::Primitive(scalar),
            None => Content::Compound(Vec::new()),
        };
        TlvNode {
            tag: tlv.tag,
            header_len: tlv.header_len,
            raw: tlv.raw,
            content,
        }
    }

    fn compound(tlv: Tlv<'a>, children: Vec<TlvNode<'a>>) -> Self {
        TlvNode {
            tag: tlv.tag,
            header_len: tlv.header_len,
            raw: tlv.raw,
            content: Content::Compound(children),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn offset(&self) -> usize {
        self.raw.offset
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn body(&self) -> ByteSpan<'a> {
        ByteSpan::new(
            self.raw.offset + self.header_len,
            &self.raw.bytes[self.header_len..],
        )
    }

    /// Exact source bytes of this node, header included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw.bytes
    }

    pub fn content(&self) -> &Content<'a> {
        &self.content
    }

    /// Children of a constructed node; empty for primitives.
    pub fn children(&self) -> &[TlvNode<'a>] {
        match &self.content {
            Content::Compound(children) => children,
            Content::Primitive(_) => &[],
        }
    }

    pub fn scalar(&self) -> Option<&Scalar<'a>> {
        match &self.content {
            Content::Primitive(scalar) => Some(scalar),
            Content::Compound(_) => None,
        }
    }
}

impl Serialize for TlvNode<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("TlvNode", 6)?;
        state.serialize_field("offset", &self.raw.offset)?;
        state.serialize_field("tag", &self.tag)?;
        state.serialize_field("name", &self.tag.to_string())?;
        state.serialize_field("header_length", &self.header_len)?;
        state.serialize_field("body_length", &(self.raw.bytes.len() - self.header_len))?;
        match &self.content {
            Content::Compound(children) => state.serialize_field("children", children)?,
            Content::Primitive(scalar) => state.serialize_field("value", scalar)?,
        }
        state.end()
    }
}

/// A top-level entry of a [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item<'a> {
    Node(TlvNode<'a>),
    /// A top-level item that broke while decoding. `partial` holds what was
    /// decoded of it before the error.
    Malformed {
        partial: Option<TlvNode<'a>>,
        error: StructuralError<'a>,
    },
}

/// Every top-level item of a buffer, decoded eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Forest<'a> {
    items: Vec<Item<'a>>,
}

impl<'a> Forest<'a> {
    pub fn items(&self) -> &[Item<'a>] {
        &self.items
    }

    /// Decodes `input` with the default [`Limits`].
    pub fn decode(input: &'a [u8]) -> Result<Self, Error> {
        Self::decode_with(input, Limits::default())
    }

    /// Decodes `input`, failing once nesting or node count exceed `limits`.
    ///
    /// Malformed TLVs are not errors here; they end up in
    /// [`Item::Malformed`].
    pub fn decode_with(input: &'a [u8], limits: Limits) -> Result<Self, Error> {
        let mut items = Vec::new();
        let mut open: Vec<(Tlv<'a>, Vec<TlvNode<'a>>)> = Vec::new();
        let mut leaf: Option<TlvNode<'a>> = None;
        let mut nodes = 0usize;

        for event in walk(input) {
            match event {
                Event::Enter(tlv) => {
                    nodes += 1;
                    if nodes > limits.max_nodes {
                        return Err(Error::NodeLimitExceeded(limits.max_nodes));
                    }
                    if open.len() >= limits.max_depth {
                        return Err(Error::DepthLimitExceeded(limits.max_depth));
                    }
                    if tlv.is_constructed() {
                        open.push((tlv, Vec::new()));
                    } else {
                        leaf = Some(TlvNode::leaf(tlv));
                    }
                }
                Event::Leave => {
                    let node = match leaf.take() {
                        Some(node) => node,
                        None => match open.pop() {
                            Some((tlv, children)) => TlvNode::compound(tlv, children),
                            None => continue,
                        },
                    };
                    match open.last_mut() {
                        Some((_, children)) => children.push(node),
                        None => items.push(Item::Node(node)),
                    }
                }
                Event::Malformed(error) => {
                    let mut partial = None;
                    while let Some((tlv, mut children)) = open.pop() {
                        children.extend(partial.take());
                        partial = Some(TlvNode::compound(tlv, children));
                    }
                    items.push(Item::Malformed { partial, error });
                }
            }
        }

        Ok(Forest { items })
    }
}

impl<'a> DecodableFrom<&'a [u8]> for Forest<'a> {}

impl<'a> Decoder<&'a [u8], Forest<'a>> for &'a [u8] {
    type Error = Error;

    fn decode(&self) -> Result<Forest<'a>, Self::Error> {
        Forest::decode(*self)
    }
}
