//! Interpretation of primitive ASN.1 values.
//!
//! [`interpret`] turns the content octets of a primitive TLV into a
//! [`Scalar`], dispatching on the tag. Content that cannot be interpreted is
//! never an error at this level: unknown tags become [`Scalar::Raw`] and
//! malformed content of a known type becomes [`Scalar::Invalid`], so a
//! renderer can fall back to a hex dump.

#![forbid(unsafe_code)]

use std::{fmt::Display, str::FromStr};

use chrono::NaiveDateTime;
use num_bigint::BigInt;
use serde::{Serialize, Serializer};

pub mod error;
mod tag;
mod text;

use error::Error;
pub use tag::{Class, TAG_CONSTRUCTED, Tag, UniversalTag};
pub use text::{Charset, Text};

/// The interpreted content of a primitive TLV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar<'a> {
    Boolean(bool),
    Integer(Integer),
    BitString(BitString<'a>),
    #[serde(serialize_with = "serialize_hex")]
    OctetString(&'a [u8]),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Text(Text<'a>),
    Time(Time),
    /// Content of a tag that is not interpreted.
    #[serde(serialize_with = "serialize_hex")]
    Raw(&'a [u8]),
    /// Content of a known tag that does not decode as that type.
    Invalid {
        #[serde(serialize_with = "serialize_hex")]
        content: &'a [u8],
        #[serde(serialize_with = "serialize_display")]
        error: Error,
    },
}

impl Scalar<'_> {
    /// Bytes a renderer should hex-dump instead of showing a value, if any.
    pub fn dump_bytes(&self) -> Option<&[u8]> {
        match self {
            Scalar::OctetString(data) | Scalar::Raw(data) => Some(data),
            Scalar::Invalid { content, .. } => Some(content),
            _ => None,
        }
    }
}

impl Display for Scalar<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "BOOLEAN {}", b),
            Scalar::Integer(i) => write!(f, "INTEGER {}", i),
            Scalar::BitString(bs) => write!(f, "BIT STRING ({} bits) {}", bs.bit_len(), bs),
            Scalar::OctetString(os) => write!(f, "OCTET STRING ({} bytes)", os.len()),
            Scalar::Null => write!(f, "NULL"),
            Scalar::ObjectIdentifier(oid) => write!(f, "OBJECT IDENTIFIER {}", oid),
            Scalar::Text(text) => write!(f, "{} {:?}", text.charset(), text.as_str()),
            Scalar::Time(time) => write!(f, "{}", time),
            Scalar::Raw(data) => write!(f, "({} bytes)", data.len()),
            Scalar::Invalid { error, .. } => write!(f, "invalid: {}", error),
        }
    }
}

/// Interprets `content` as a value of the type named by `tag`.
///
/// Only primitive tags of the universal class are interpreted; anything else
/// passes through as [`Scalar::Raw`]. A known type whose content is
/// malformed becomes [`Scalar::Invalid`].
pub fn interpret(tag: Tag, content: &[u8]) -> Scalar<'_> {
    match try_interpret(tag, content) {
        Ok(scalar) => scalar,
        Err(error) => {
            tracing::debug!(%tag, %error, "primitive content does not match its tag");
            Scalar::Invalid { content, error }
        }
    }
}

/// Like [`interpret`], but reports malformed content of a known type as an
/// error instead of folding it into [`Scalar::Invalid`].
pub fn try_interpret(tag: Tag, content: &[u8]) -> Result<Scalar<'_>, Error> {
    let universal = match tag.universal_tag() {
        Some(t) if !tag.is_constructed() => t,
        _ => return Ok(Scalar::Raw(content)),
    };

    match universal {
        UniversalTag::Boolean => match content {
            // Any nonzero octet is TRUE, not only 0xFF.
            [b] => Ok(Scalar::Boolean(*b != 0)),
            _ => Err(Error::InvalidBoolean(content.len())),
        },
        UniversalTag::Integer | UniversalTag::Enumerated => {
            Integer::try_from(content).map(Scalar::Integer)
        }
        UniversalTag::BitString => BitString::try_from(content).map(Scalar::BitString),
        UniversalTag::OctetString => Ok(Scalar::OctetString(content)),
        UniversalTag::Null => match content.len() {
            0 => Ok(Scalar::Null),
            n => Err(Error::NullWithContent(n)),
        },
        UniversalTag::ObjectIdentifier => {
            ObjectIdentifier::try_from(content).map(Scalar::ObjectIdentifier)
        }
        UniversalTag::UTCTime => Ok(Time::parse_utc(content)
            .map(Scalar::Time)
            .unwrap_or_else(|| Scalar::Text(Text::new(Charset::VisibleString, content)))),
        UniversalTag::GeneralizedTime => Ok(Time::parse_generalized(content)
            .map(Scalar::Time)
            .unwrap_or_else(|| Scalar::Text(Text::new(Charset::VisibleString, content)))),
        other => match Charset::from_universal(other) {
            Some(charset) => Ok(Scalar::Text(Text::new(charset, content))),
            None => Ok(Scalar::Raw(content)),
        },
    }
}

fn serialize_hex<S>(data: &&[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let hex_string = data.iter().map(|b| format!("{:02x}", b)).collect::<String>();
    serializer.serialize_str(&hex_string)
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

// ASN1 integer is possible to be a positive and negative value.
// This can be arbitrary sized values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    /// Returns a reference to the inner BigInt
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.inner.to_string())
    }
}

impl TryFrom<&[u8]> for Integer {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::IntegerNoData);
        }
        Ok(Integer {
            inner: BigInt::from_signed_bytes_be(value),
        })
    }
}

impl From<BigInt> for Integer {
    fn from(inner: BigInt) -> Self {
        Integer { inner }
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    inner: Vec<u128>,
}

impl ObjectIdentifier {
    pub fn components(&self) -> &[u128] {
        &self.inner
    }
}

impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut subidentifiers = Vec::new();
        let mut val = 0u128;
        let mut pending = false;
        for &b in value {
            if val.leading_zeros() < 7 {
                return Err(Error::ObjectIdentifierComponentOverflow);
            }
            val = (val << 7) | u128::from(b & 0x7f);
            pending = b & 0x80 != 0;
            if !pending {
                subidentifiers.push(val);
                val = 0;
            }
        }
        if pending {
            // the last octet still had its continuation bit set
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        // The first subidentifier packs the first two arcs as X*40+Y.
        let first = subidentifiers[0];
        let (x, y) = match first {
            0..40 => (0, first),
            40..80 => (1, first - 40),
            _ => (2, first - 80),
        };
        let mut inner = Vec::with_capacity(subidentifiers.len() + 1);
        inner.push(x);
        inner.push(y);
        inner.extend_from_slice(&subidentifiers[1..]);

        Ok(ObjectIdentifier { inner })
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self.inner.first() {
            Some(n) => self.inner[1..]
                .iter()
                .fold(n.to_string(), |s, n| s + "." + &n.to_string()),
            None => String::new(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::ObjectIdentifierEmptyString);
        }
        let inner = s
            .split('.')
            .map(|c| {
                c.parse::<u128>()
                    .map_err(|_| Error::ObjectIdentifierInvalidComponent(c.to_string()))
            })
            .collect::<Result<Vec<u128>, Error>>()?;
        Ok(ObjectIdentifier { inner })
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString<'a> {
    unused: u8,
    data: &'a [u8],
}

impl<'a> BitString<'a> {
    /// Returns the number of unused bits in the last byte
    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    /// Payload bytes as encoded, unused bits included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Payload bytes with the unused trailing bits cleared
    pub fn masked(&self) -> Vec<u8> {
        let mut data = self.data.to_vec();
        if let Some(last) = data.last_mut() {
            *last &= 0xff << self.unused;
        }
        data
    }

    /// Returns the total number of bits (excluding unused bits)
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8 - self.unused as usize
    }
}

impl Serialize for BitString<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("BitString", 2)?;
        state.serialize_field("bit_length", &self.bit_len())?;

        let hex_string = self
            .masked()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":");
        state.serialize_field("bits", &hex_string)?;

        state.end()
    }
}

impl<'a> TryFrom<&'a [u8]> for BitString<'a> {
    type Error = Error;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        match value.split_first() {
            Some((&unused, _)) if unused > 7 => Err(Error::BitStringUnusedBitsOutOfRange(unused)),
            Some((&unused, [])) if unused > 0 => Err(Error::BitStringUnusedBitsWithoutData(unused)),
            Some((&unused, data)) => Ok(BitString { unused, data }),
            None => Err(Error::BitStringNoData),
        }
    }
}

impl Display for BitString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut result = String::new();

        for (i, byte) in self.data.iter().enumerate() {
            if i == self.data.len() - 1 && self.unused > 0 {
                // Handle the last byte with unused bits
                let valid_bits = byte >> self.unused;
                let bit_count = 8 - self.unused as usize;
                result.push_str(&format!(
                    "{:0bit_count$b}",
                    valid_bits,
                    bit_count = bit_count
                ));
            } else {
                result.push_str(&format!("{:08b}", byte));
            }
        }

        write!(f, "{}", result)
    }
}

/// A UTCTime or GeneralizedTime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Time {
    Utc(NaiveDateTime),
    Generalized(NaiveDateTime),
}

impl Time {
    /// Parses `YYMMDDHHMM[SS]Z`. Two-digit years from 50 up are 19xx.
    fn parse_utc(data: &[u8]) -> Option<Time> {
        let s = std::str::from_utf8(data).ok()?;
        let yy: u32 = s.get(..2)?.parse().ok()?;
        let century = if yy >= 50 { "19" } else { "20" };
        let full = format!("{}{}", century, s);
        parse_time(&full).map(Time::Utc)
    }

    /// Parses `YYYYMMDDHHMM[SS[.fff]]Z`.
    fn parse_generalized(data: &[u8]) -> Option<Time> {
        let s = std::str::from_utf8(data).ok()?;
        parse_time(s).map(Time::Generalized)
    }

    pub fn as_datetime(&self) -> &NaiveDateTime {
        match self {
            Time::Utc(dt) | Time::Generalized(dt) => dt,
        }
    }
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y%m%d%H%MZ"))
        .ok()
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Time::Utc(dt) => write!(f, "UTCTime {}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            Time::Generalized(dt) => {
                write!(f, "GeneralizedTime {}", dt.format("%Y-%m-%d %H:%M:%S%.f UTC"))
            }
        }
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.as_datetime().format("%Y-%m-%dT%H:%M:%S%.fZ"))
    }
}
