//! Best-effort decoding of the ASN.1 character string types.
//!
//! Decoding never fails. Bytes that do not fit the charset are kept as
//! `\xNN` escapes (or `\uNNNN` for unpaired UTF-16 code units) so the
//! renderer can still show them.

use std::borrow::Cow;
use std::fmt::{Display, Formatter, Write};

use serde::Serialize;

use crate::tag::UniversalTag;

/// Character set of a decoded text string, named after its ASN.1 type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Charset {
    UTF8String,
    NumericString,
    PrintableString,
    T61String,
    IA5String,
    VisibleString,
    GeneralString,
    BMPString,
}

impl Charset {
    pub fn from_universal(tag: UniversalTag) -> Option<Self> {
        match tag {
            UniversalTag::UTF8String => Some(Charset::UTF8String),
            UniversalTag::NumericString => Some(Charset::NumericString),
            UniversalTag::PrintableString => Some(Charset::PrintableString),
            UniversalTag::T61String => Some(Charset::T61String),
            UniversalTag::IA5String => Some(Charset::IA5String),
            UniversalTag::VisibleString => Some(Charset::VisibleString),
            UniversalTag::GeneralString => Some(Charset::GeneralString),
            UniversalTag::BMPString => Some(Charset::BMPString),
            _ => None,
        }
    }

    pub fn decode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::UTF8String => decode_utf8(data),
            Charset::NumericString
            | Charset::PrintableString
            | Charset::IA5String
            | Charset::VisibleString => decode_ascii(data),
            Charset::T61String | Charset::GeneralString => decode_latin1(data),
            Charset::BMPString => Cow::Owned(decode_utf16be(data)),
        }
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Charset::UTF8String => "UTF8String",
            Charset::NumericString => "NumericString",
            Charset::PrintableString => "PrintableString",
            Charset::T61String => "T61String",
            Charset::IA5String => "IA5String",
            Charset::VisibleString => "VisibleString",
            Charset::GeneralString => "GeneralString",
            Charset::BMPString => "BMPString",
        };
        write!(f, "{}", name)
    }
}

/// A decoded character string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text<'a> {
    charset: Charset,
    value: Cow<'a, str>,
}

impl<'a> Text<'a> {
    pub fn new(charset: Charset, data: &'a [u8]) -> Self {
        Text {
            charset,
            value: charset.decode(data),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Display for Text<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

fn escape_byte(output: &mut String, byte: u8) {
    // writing to a String cannot fail
    let _ = write!(output, "\\x{:02X}", byte);
}

fn decode_utf8(data: &[u8]) -> Cow<'_, str> {
    if let Ok(s) = std::str::from_utf8(data) {
        return Cow::Borrowed(s);
    }
    let mut output = String::with_capacity(data.len());
    for chunk in data.utf8_chunks() {
        output.push_str(chunk.valid());
        for &b in chunk.invalid() {
            escape_byte(&mut output, b);
        }
    }
    Cow::Owned(output)
}

fn decode_ascii(data: &[u8]) -> Cow<'_, str> {
    if data.is_ascii() {
        return String::from_utf8_lossy(data);
    }
    let mut output = String::with_capacity(data.len());
    for &b in data {
        if b.is_ascii() {
            output.push(b as char);
        } else {
            escape_byte(&mut output, b);
        }
    }
    Cow::Owned(output)
}

fn decode_latin1(data: &[u8]) -> Cow<'_, str> {
    if data.is_ascii() {
        return String::from_utf8_lossy(data);
    }
    Cow::Owned(data.iter().map(|&b| b as char).collect())
}

fn decode_utf16be(data: &[u8]) -> String {
    let chunks = data.chunks_exact(2);
    let dangling = chunks.remainder().first().copied();
    let units = chunks.map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    let mut output = String::with_capacity(data.len() / 2);
    for c in char::decode_utf16(units) {
        match c {
            Ok(c) => output.push(c),
            Err(e) => {
                let _ = write!(output, "\\u{:04X}", e.unpaired_surrogate());
            }
        }
    }
    if let Some(b) = dangling {
        escape_byte(&mut output, b);
    }
    output
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use rstest::rstest;

    use super::Charset;

    #[rstest(charset, input, expected,
        case(Charset::UTF8String, b"hello".to_vec(), "hello"),
        case(Charset::UTF8String, vec![0xf0, 0x9f, 0x98, 0x8e], "\u{1f60e}"),
        case(Charset::UTF8String, vec![0x61, 0xff, 0x62], "a\\xFFb"),
        case(Charset::UTF8String, vec![0xe2, 0x82], "\\xE2\\x82"),
        case(Charset::PrintableString, b"Some-State".to_vec(), "Some-State"),
        case(Charset::IA5String, vec![0x61, 0x80], "a\\x80"),
        case(Charset::T61String, vec![0x43, 0xe9], "C\u{e9}"),
        case(Charset::GeneralString, b"x".to_vec(), "x"),
        case(Charset::BMPString, vec![0x00, 0x41, 0x00, 0x42], "AB"),
        case(Charset::BMPString, vec![0xd8, 0x00, 0x00, 0x41], "\\uD800A"),
        case(Charset::BMPString, vec![0x00, 0x41, 0x7f], "A\\x7F"),
    )]
    fn test_decode(charset: Charset, input: Vec<u8>, expected: &str) {
        assert_eq!(expected, charset.decode(&input));
    }

    #[test]
    fn test_valid_utf8_is_borrowed() {
        assert!(matches!(
            Charset::UTF8String.decode(b"abc"),
            Cow::Borrowed("abc")
        ));
    }
}
