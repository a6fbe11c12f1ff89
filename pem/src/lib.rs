//! Splitting of PEM armored buffers into their blocks.
//!
//! A buffer is consumed block by block: [`split_next`] (or [`parse_block`],
//! which reports why a block did not match) returns the decoded block and
//! the bytes after its END line. [`blocks`] iterates that and keeps what
//! could not be split for the caller.
//!
//! ref: <https://www.rfc-editor.org/rfc/rfc7468.html#section-3>

pub mod error;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use derview::decoder::{DecodableFrom, Decoder};
use error::Error;
use regex::bytes::Regex;

// The label runs up to the first "-----"; trailing blanks are tolerated.
const BEGIN_LINE: &str = r"\A-----BEGIN ([\x20-\x7e]+?)-----[ \t]*\r?(?:\n|\z)";
const END_LINE: &str = r"(?m)^-----END ([\x20-\x7e]+?)-----[ \t]*\r?(?:\n|\z)";

/// Armor type named on the BEGIN and END lines, e.g. `CERTIFICATE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label(s.to_string())
    }
}

/// One decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    label: Label,
    // in source order, duplicates kept
    headers: Vec<(String, String)>,
    payload: Vec<u8>,
    consumed: usize,
}

impl PemBlock {
    pub fn from_bytes(label: Label, data: &[u8]) -> Self {
        PemBlock {
            label,
            headers: Vec::new(),
            payload: data.to_vec(),
            consumed: 0,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The base64-decoded body.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of source bytes this block was parsed from, leading
    /// whitespace and the END line terminator included. Zero for blocks
    /// built with [`PemBlock::from_bytes`].
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Display for PemBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "-----BEGIN {}-----", self.label)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        if !self.headers.is_empty() {
            writeln!(f)?;
        }
        // RFC 7468: base64 text should be wrapped at 64 characters
        let encoded = STANDARD.encode(&self.payload);
        for chunk in encoded.as_bytes().chunks(64) {
            let line = std::str::from_utf8(chunk).map_err(|_| std::fmt::Error)?;
            writeln!(f, "{}", line)?;
        }
        write!(f, "-----END {}-----", self.label)
    }
}

/// Parses the PEM block at the start of `input`, after any leading ASCII
/// whitespace, and returns it with the bytes following its END line.
///
/// # Example
/// ```
/// use pem::{Label, parse_block};
///
/// let input = b"-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END CERTIFICATE-----\nrest";
/// let (block, rest) = parse_block(input).unwrap();
/// assert_eq!(&Label::from("CERTIFICATE"), block.label());
/// assert_eq!(b"hello", block.payload());
/// assert_eq!(b"rest", rest);
/// ```
pub fn parse_block(input: &[u8]) -> Result<(PemBlock, &[u8]), Error> {
    let begin_line = Regex::new(BEGIN_LINE).map_err(|_| Error::InvalidEncapsulationBoundary)?;
    let end_line = Regex::new(END_LINE).map_err(|_| Error::InvalidEncapsulationBoundary)?;

    let skipped = input.iter().take_while(|b| b.is_ascii_whitespace()).count();
    let begin = begin_line
        .captures(&input[skipped..])
        .ok_or(Error::MissingPreEncapsulationBoundary)?;
    let label = std::str::from_utf8(&begin[1]).map_err(|_| Error::InvalidEncapsulationBoundary)?;
    let mut pos = skipped + begin[0].len();

    let mut headers = Vec::new();
    loop {
        let rest = &input[pos..];
        let line_len = rest
            .iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |i| i + 1);
        let line = &rest[..line_len];
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            break;
        };
        headers.push((
            String::from_utf8_lossy(line[..colon].trim_ascii()).into_owned(),
            String::from_utf8_lossy(line[colon + 1..].trim_ascii()).into_owned(),
        ));
        pos += line_len;
    }

    let end = end_line
        .captures(&input[pos..])
        .ok_or(Error::MissingPostEncapsulationBoundary)?;
    if &end[1] != label.as_bytes() {
        return Err(Error::LabelMismatch {
            begin: label.to_string(),
            end: String::from_utf8_lossy(&end[1]).into_owned(),
        });
    }
    let whole = end.get(0).ok_or(Error::MissingPostEncapsulationBoundary)?;

    let body: Vec<u8> = input[pos..pos + whole.start()]
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let payload = STANDARD.decode(&body).map_err(Error::Base64Decode)?;
    let consumed = pos + whole.end();

    Ok((
        PemBlock {
            label: Label::from(label),
            headers,
            payload,
            consumed,
        },
        &input[consumed..],
    ))
}

/// Like [`parse_block`], but a buffer that does not start with a valid block
/// is simply not a match.
pub fn split_next(input: &[u8]) -> Option<(PemBlock, &[u8])> {
    match parse_block(input) {
        Ok(split) => Some(split),
        Err(e) => {
            tracing::debug!(error = %e, "no PEM block");
            None
        }
    }
}

/// Iterates the consecutive PEM blocks of `input`.
pub fn blocks(input: &[u8]) -> PemBlocks<'_> {
    PemBlocks { rest: input }
}

/// Iterator returned by [`blocks`].
#[derive(Debug, Clone)]
pub struct PemBlocks<'a> {
    rest: &'a [u8],
}

impl<'a> PemBlocks<'a> {
    /// Bytes not consumed by the blocks yielded so far.
    pub fn remainder(&self) -> &'a [u8] {
        self.rest
    }
}

impl Iterator for PemBlocks<'_> {
    type Item = PemBlock;

    fn next(&mut self) -> Option<Self::Item> {
        let (block, rest) = split_next(self.rest)?;
        self.rest = rest;
        Some(block)
    }
}

impl FromStr for PemBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_block(s.as_bytes()).map(|(block, _)| block)
    }
}

impl DecodableFrom<&str> for PemBlock {}

impl Decoder<&str, PemBlock> for &str {
    type Error = Error;

    fn decode(&self) -> Result<PemBlock, Self::Error> {
        PemBlock::from_str(self)
    }
}

impl DecodableFrom<&[u8]> for PemBlock {}

impl Decoder<&[u8], PemBlock> for &[u8] {
    type Error = Error;

    fn decode(&self) -> Result<PemBlock, Self::Error> {
        parse_block(self).map(|(block, _)| block)
    }
}

impl DecodableFrom<PemBlock> for Vec<u8> {}

impl Decoder<PemBlock, Vec<u8>> for PemBlock {
    type Error = Error;

    fn decode(&self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.payload.clone())
    }
}
