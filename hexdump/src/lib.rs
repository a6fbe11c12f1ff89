//! Hex dump lines for arbitrary byte spans.
//!
//! A dump is a lazy sequence of [`Line`]s of [`BYTES_PER_LINE`] bytes each.
//! Every line offers a fixed-width hexadecimal column text and a
//! classification of each byte it covers. Turning the classes into glyphs
//! (and escaping them for a given markup) is left to the renderer.
//!
//! ```
//! use hexdump::{ByteClass, lines};
//!
//! let mut dump = lines(b"hi\n");
//! let line = dump.next().unwrap();
//! assert!(line.hex().starts_with("68 69 0A"));
//! assert_eq!(line.classes().last(), Some(ByteClass::Newline));
//! assert!(dump.next().is_none());
//! ```

#![forbid(unsafe_code)]

use std::iter::FusedIterator;

pub const BYTES_PER_LINE: usize = 16;

/// Columns before the mid-line group separator.
const GROUP: usize = 8;

/// Width of [`Line::hex`]: two digits per column, single spaces between
/// columns and one extra space between the two groups.
pub const HEX_WIDTH: usize = BYTES_PER_LINE * 3;

/// Classification of a single byte for the character column of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteClass {
    /// 0x00
    Zero,
    /// 0x0A
    Newline,
    /// 0xFF
    Ff,
    /// 0x20..=0x7E, rendered literally
    Printable(char),
    Unprintable,
}

impl From<u8> for ByteClass {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => ByteClass::Zero,
            b'\n' => ByteClass::Newline,
            0xff => ByteClass::Ff,
            0x20..=0x7e => ByteClass::Printable(byte as char),
            _ => ByteClass::Unprintable,
        }
    }
}

/// One line of a hex dump, borrowing at most [`BYTES_PER_LINE`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> Line<'a> {
    /// Offset of the first byte of this line within the dumped span.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Hex columns for this line, `None` where the line is short.
    pub fn columns(&self) -> impl Iterator<Item = Option<u8>> + 'a {
        let bytes = self.bytes;
        (0..BYTES_PER_LINE).map(move |i| bytes.get(i).copied())
    }

    /// Fixed-width hex text: `"30 82 01 0A 02 82 01 01  00 C3 ..."`.
    ///
    /// Missing columns on a short line are blank filler, so every line has
    /// the same width.
    pub fn hex(&self) -> String {
        let mut output = String::with_capacity(HEX_WIDTH);
        for (i, column) in self.columns().enumerate() {
            if i == GROUP {
                output.push(' ');
            }
            if i > 0 {
                output.push(' ');
            }
            match column {
                Some(byte) => output.push_str(&format!("{:02X}", byte)),
                None => output.push_str("  "),
            }
        }
        output
    }

    /// One class per byte actually present on this line.
    pub fn classes(&self) -> impl DoubleEndedIterator<Item = ByteClass> + ExactSizeIterator + 'a {
        self.bytes.iter().map(|&b| ByteClass::from(b))
    }
}

/// Lazy iterator over the lines of a dump. See [`lines`].
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let (bytes, rest) = self.data.split_at(self.data.len().min(BYTES_PER_LINE));
        let line = Line {
            offset: self.offset,
            bytes,
        };
        self.data = rest;
        self.offset += bytes.len();
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.data.len().div_ceil(BYTES_PER_LINE);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Lines<'_> {}

impl FusedIterator for Lines<'_> {}

/// Splits `data` into hex dump lines of [`BYTES_PER_LINE`] bytes.
///
/// An empty span produces no lines.
pub fn lines(data: &[u8]) -> Lines<'_> {
    Lines { data, offset: 0 }
}
