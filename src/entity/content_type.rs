//! `Content-Type` parsing and the charsets bodies can be decoded with.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{BodyError, BodyResult};

/// A text encoding for string views of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// UTF-8, the default when a message declares no charset.
    #[default]
    Utf8,
    /// 7-bit US-ASCII.
    UsAscii,
    /// ISO-8859-1 (Latin-1).
    Iso8859_1,
}

impl Charset {
    /// Looks a charset up by its IANA name or a common alias.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Decode`] for charsets this crate cannot decode.
    pub fn for_label(label: &str) -> BodyResult<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "us-ascii" | "ascii" => Ok(Charset::UsAscii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Ok(Charset::Iso8859_1),
            _ => Err(BodyError::Decode(format!("unsupported charset: {label}"))),
        }
    }

    /// Canonical name, as written into headers.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
        }
    }

    /// Decodes bytes to text.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Decode`] if the bytes are not valid in this charset.
    pub fn decode(&self, bytes: &[u8]) -> BodyResult<String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| BodyError::Decode(format!("invalid UTF-8: {e}"))),
            Charset::UsAscii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(BodyError::Decode(format!(
                    "invalid US-ASCII byte 0x{:02x} at offset {at}",
                    bytes[at]
                ))),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Charset::Iso8859_1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encodes text, replacing characters this charset cannot hold with `?`.
    pub fn encode(&self, text: &str) -> Bytes {
        let max = match self {
            Charset::Utf8 => return Bytes::copy_from_slice(text.as_bytes()),
            Charset::UsAscii => 0x7f,
            Charset::Iso8859_1 => 0xff,
        };
        text.chars()
            .map(|c| if (c as u32) <= max { c as u8 } else { b'?' })
            .collect::<Vec<u8>>()
            .into()
    }
}

impl FromStr for Charset {
    type Err = BodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::for_label(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed `Content-Type` value: media type plus optional charset label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    charset: Option<String>,
}

impl ContentType {
    /// Parses `type/subtype; param=value; ...`. Never fails; unknown
    /// parameters are ignored and the media type is lower-cased.
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let charset = parts
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, v)| v.trim().trim_matches('"').to_owned())
            .filter(|v| !v.is_empty());
        Self {
            media_type,
            charset,
        }
    }

    /// The media type, e.g. `application/json`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The raw charset label, if one was given.
    pub fn charset_label(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The declared charset.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Decode`] if the label names an unsupported charset.
    pub fn charset(&self) -> BodyResult<Option<Charset>> {
        self.charset.as_deref().map(Charset::for_label).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_charset() {
        let ct = ContentType::parse("Text/Plain; Charset=\"ISO-8859-1\"");
        assert_eq!(ct.media_type(), "text/plain");
        assert_eq!(ct.charset_label(), Some("ISO-8859-1"));
        assert_eq!(ct.charset().unwrap(), Some(Charset::Iso8859_1));
    }

    #[test]
    fn test_parse_without_charset() {
        let ct = ContentType::parse("application/json");
        assert_eq!(ct.media_type(), "application/json");
        assert_eq!(ct.charset().unwrap(), None);

        let ct = ContentType::parse("text/html; boundary=x; charset=");
        assert_eq!(ct.charset_label(), None);
    }

    #[test]
    fn test_unknown_charset_is_decode_error() {
        let ct = ContentType::parse("text/plain; charset=ebcdic");
        assert!(ct.charset().unwrap_err().is_decode());
    }

    #[test]
    fn test_decode() {
        assert_eq!(Charset::Utf8.decode("héllo".as_bytes()).unwrap(), "héllo");
        assert_eq!(Charset::Iso8859_1.decode(&[0x68, 0xe9]).unwrap(), "hé");
        assert!(Charset::Utf8.decode(&[0xff, 0xfe]).is_err());
        assert!(Charset::UsAscii.decode(&[0x41, 0xe9]).is_err());
    }

    #[test]
    fn test_encode_replaces_unmappable() {
        assert_eq!(Charset::Iso8859_1.encode("hé€").as_ref(), &[0x68, 0xe9, b'?']);
        assert_eq!(Charset::UsAscii.encode("hé").as_ref(), b"h?");
        assert_eq!(Charset::Utf8.encode("é").as_ref(), "é".as_bytes());
    }

    #[test]
    fn test_labels() {
        assert_eq!("utf8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("LATIN1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert_eq!(Charset::UsAscii.to_string(), "US-ASCII");
    }
}
