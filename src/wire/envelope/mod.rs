use std::fmt;

use crate::message::{
    VersionFlags, MIN_EXTENDED_MESSAGE_LEN, MIN_LEGACY_MESSAGE_LEN, SOURCE_CLIENT_ID_LEN,
};

/// Which header layout a writer produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeFormat {
    #[default]
    Extended,
    /// Timestamp, attempts, id and body only. For consumers that predate the version byte.
    Legacy,
}

impl EnvelopeFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "extended" => Some(Self::Extended),
            "legacy" => Some(Self::Legacy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extended => "extended",
            Self::Legacy => "legacy",
        }
    }
}

/// The three record generations a reader may encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvelopeLayout {
    Legacy,
    Extended,
    ExtendedWithSource,
}

impl EnvelopeLayout {
    pub fn from_flags(flags: VersionFlags) -> Self {
        if !flags.contains(VersionFlags::EXTENDED_FORMAT) {
            return Self::Legacy;
        }
        if flags.contains(VersionFlags::HAS_SOURCE) {
            Self::ExtendedWithSource
        } else {
            Self::Extended
        }
    }

    /// Bytes that precede the body for this layout.
    pub fn header_len(self) -> usize {
        match self {
            Self::Legacy => MIN_LEGACY_MESSAGE_LEN,
            Self::Extended => MIN_EXTENDED_MESSAGE_LEN,
            Self::ExtendedWithSource => MIN_EXTENDED_MESSAGE_LEN + SOURCE_CLIENT_ID_LEN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Extended => "extended",
            Self::ExtendedWithSource => "extended_with_source",
        }
    }
}

impl fmt::Display for EnvelopeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout announced by the first byte of a stored record. Says nothing about
/// whether the record is long enough to actually hold that layout.
pub fn detect_layout(bytes: &[u8]) -> Option<EnvelopeLayout> {
    bytes
        .first()
        .map(|first| EnvelopeLayout::from_flags(VersionFlags::from_bits(*first)))
}

#[cfg(test)]
mod tests {
    use super::{detect_layout, EnvelopeFormat, EnvelopeLayout};

    #[test]
    fn header_lengths_per_generation() {
        assert_eq!(EnvelopeLayout::Legacy.header_len(), 26);
        assert_eq!(EnvelopeLayout::Extended.header_len(), 31);
        assert_eq!(EnvelopeLayout::ExtendedWithSource.header_len(), 39);
    }

    #[test]
    fn detects_layout_by_bit_test() {
        assert_eq!(detect_layout(&[]), None);
        assert_eq!(detect_layout(&[0x00, 1, 2]), Some(EnvelopeLayout::Legacy));
        assert_eq!(detect_layout(&[0x7F]), Some(EnvelopeLayout::Legacy));
        assert_eq!(detect_layout(&[0x80]), Some(EnvelopeLayout::Extended));
        assert_eq!(detect_layout(&[0xF0]), Some(EnvelopeLayout::Extended));
        assert_eq!(
            detect_layout(&[0xFF]),
            Some(EnvelopeLayout::ExtendedWithSource)
        );
    }

    #[test]
    fn parses_format_names() {
        assert_eq!(EnvelopeFormat::parse("extended"), Some(EnvelopeFormat::Extended));
        assert_eq!(EnvelopeFormat::parse("legacy"), Some(EnvelopeFormat::Legacy));
        assert_eq!(EnvelopeFormat::parse("v3"), None);
        assert_eq!(EnvelopeFormat::default().as_str(), "extended");
    }
}
