//! Tag classes, tag numbers and the names of the universal tags.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Bit 6 of the first identifier octet.
pub const TAG_CONSTRUCTED: u8 = 0x20;

/// The four ASN.1 tag classes, taken from the top two identifier bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl Class {
    /// Class encoded in the top two bits of an identifier octet.
    pub fn from_identifier(octet: u8) -> Self {
        match octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::Universal => write!(f, "universal"),
            Class::Application => write!(f, "application"),
            Class::ContextSpecific => write!(f, "context specific"),
            Class::Private => write!(f, "private"),
        }
    }
}

/// A decoded identifier: class, compound flag and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tag {
    class: Class,
    constructed: bool,
    number: u32,
}

impl Tag {
    pub const fn new(class: Class, constructed: bool, number: u32) -> Self {
        Tag {
            class,
            constructed,
            number,
        }
    }

    /// Shorthand for a primitive universal tag.
    pub const fn universal(number: u32) -> Self {
        Tag::new(Class::Universal, false, number)
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// The universal type named by this tag, if it is in the universal class.
    pub fn universal_tag(&self) -> Option<UniversalTag> {
        match self.class {
            Class::Universal => Some(UniversalTag::from(self.number)),
            _ => None,
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.class {
            Class::Universal => match UniversalTag::from(self.number) {
                UniversalTag::Unimplemented(n) => write!(f, "[UNIVERSAL {}]", n),
                known => write!(f, "{}", known),
            },
            Class::Application => write!(f, "[APPLICATION {}]", self.number),
            Class::ContextSpecific => write!(f, "[{}]", self.number),
            Class::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}

/// Universal class tag numbers this crate knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniversalTag {
    EndOfContents,
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    ObjectDescriptor,
    External,
    Real,
    Enumerated,
    EmbeddedPdv,
    UTF8String,
    RelativeOid,
    Sequence,
    Set,
    NumericString,
    PrintableString,
    T61String,
    VideotexString,
    IA5String,
    UTCTime,
    GeneralizedTime,
    GraphicString,
    VisibleString,
    GeneralString,
    UniversalString,
    BMPString,
    Unimplemented(u32),
}

impl From<u32> for UniversalTag {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::EndOfContents,
            1 => Self::Boolean,
            2 => Self::Integer,
            3 => Self::BitString,
            4 => Self::OctetString,
            5 => Self::Null,
            6 => Self::ObjectIdentifier,
            7 => Self::ObjectDescriptor,
            8 => Self::External,
            9 => Self::Real,
            10 => Self::Enumerated,
            11 => Self::EmbeddedPdv,
            12 => Self::UTF8String,
            13 => Self::RelativeOid,
            16 => Self::Sequence,
            17 => Self::Set,
            18 => Self::NumericString,
            19 => Self::PrintableString,
            20 => Self::T61String,
            21 => Self::VideotexString,
            22 => Self::IA5String,
            23 => Self::UTCTime,
            24 => Self::GeneralizedTime,
            25 => Self::GraphicString,
            26 => Self::VisibleString,
            27 => Self::GeneralString,
            28 => Self::UniversalString,
            30 => Self::BMPString,
            _ => Self::Unimplemented(value),
        }
    }
}

impl Display for UniversalTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EndOfContents => "END OF CONTENTS",
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BitString => "BIT STRING",
            Self::OctetString => "OCTET STRING",
            Self::Null => "NULL",
            Self::ObjectIdentifier => "OBJECT IDENTIFIER",
            Self::ObjectDescriptor => "ObjectDescriptor",
            Self::External => "EXTERNAL",
            Self::Real => "REAL",
            Self::Enumerated => "ENUMERATED",
            Self::EmbeddedPdv => "EMBEDDED PDV",
            Self::UTF8String => "UTF8String",
            Self::RelativeOid => "RELATIVE-OID",
            Self::Sequence => "SEQUENCE",
            Self::Set => "SET",
            Self::NumericString => "NumericString",
            Self::PrintableString => "PrintableString",
            Self::T61String => "T61String",
            Self::VideotexString => "VideotexString",
            Self::IA5String => "IA5String",
            Self::UTCTime => "UTCTime",
            Self::GeneralizedTime => "GeneralizedTime",
            Self::GraphicString => "GraphicString",
            Self::VisibleString => "VisibleString",
            Self::GeneralString => "GeneralString",
            Self::UniversalString => "UniversalString",
            Self::BMPString => "BMPString",
            Self::Unimplemented(n) => return write!(f, "UNIVERSAL {}", n),
        };
        write!(f, "{}", name)
    }
}
