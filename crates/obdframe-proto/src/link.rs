//! Link-layer protocol classification.
//!
//! Catalogs name protocols with free-form strings (`"SAE J1850 VPW"`,
//! `"ISO 15765 Extended Id"`); the engine needs a closed set to pick the
//! right header builder and frame cleaner. Classification is a substring
//! match on the catalog name, mirroring how scan-tool definition files are
//! written in practice.

use crate::errors::{Result, WireError};

/// Link-layer protocol family resolved from a catalog protocol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkProtocol {
    /// SAE J1850 (PWM or VPW). Legacy fixed 3-byte header.
    SaeJ1850,
    /// ISO 9141-2. Legacy fixed 3-byte header.
    Iso9141,
    /// ISO 14230 (KWP2000). Variable 1–4 byte header driven by the format
    /// byte; see [`crate::kwp`].
    Iso14230,
    /// ISO 15765 with 11-bit identifiers, stored as 2 header bytes.
    Iso15765Standard,
    /// ISO 15765 with 29-bit identifiers, stored as 4 header bytes.
    Iso15765Extended,
}

impl LinkProtocol {
    /// Classify a catalog protocol name.
    ///
    /// - contains `"SAE J1850"` → [`Self::SaeJ1850`]
    /// - equals `"ISO 9141-2"` → [`Self::Iso9141`]
    /// - equals `"ISO 14230"` → [`Self::Iso14230`]
    /// - contains `"ISO 15765"` → [`Self::Iso15765Standard`], or
    ///   [`Self::Iso15765Extended`] when the name also contains
    ///   `"Extended Id"`
    ///
    /// Matching is case-sensitive.
    ///
    /// # Errors
    ///
    /// `WireError::UnsupportedProtocol` for any other name.
    pub fn classify(name: &str) -> Result<Self> {
        if name.contains("SAE J1850") {
            Ok(Self::SaeJ1850)
        } else if name == "ISO 9141-2" {
            Ok(Self::Iso9141)
        } else if name == "ISO 14230" {
            Ok(Self::Iso14230)
        } else if name.contains("ISO 15765") {
            if name.contains("Extended Id") {
                Ok(Self::Iso15765Extended)
            } else {
                Ok(Self::Iso15765Standard)
            }
        } else {
            Err(WireError::UnsupportedProtocol {
                name: name.to_string(),
            })
        }
    }

    /// Legacy protocols share the fixed `[prio] [target] [source]` header
    /// and need no length encoding.
    #[must_use]
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::SaeJ1850 | Self::Iso9141)
    }

    /// Whether this is either ISO 15765 variant.
    #[must_use]
    pub fn is_iso15765(self) -> bool {
        matches!(self, Self::Iso15765Standard | Self::Iso15765Extended)
    }

    /// Width in bytes of the expected response header.
    ///
    /// Legacy and ISO 14230 replies are matched against a 3-byte template
    /// (ISO 14230's actual on-wire header length varies per frame; the
    /// cleaner adapts the template at runtime).
    #[must_use]
    pub fn response_header_len(self) -> usize {
        match self {
            Self::SaeJ1850 | Self::Iso9141 | Self::Iso14230 => 3,
            Self::Iso15765Standard => 2,
            Self::Iso15765Extended => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_names() {
        assert_eq!(
            LinkProtocol::classify("SAE J1850 VPW").unwrap(),
            LinkProtocol::SaeJ1850
        );
        assert_eq!(
            LinkProtocol::classify("SAE J1850 PWM").unwrap(),
            LinkProtocol::SaeJ1850
        );
        assert_eq!(
            LinkProtocol::classify("ISO 9141-2").unwrap(),
            LinkProtocol::Iso9141
        );
        assert_eq!(
            LinkProtocol::classify("ISO 14230").unwrap(),
            LinkProtocol::Iso14230
        );
        assert_eq!(
            LinkProtocol::classify("ISO 15765 Standard Id").unwrap(),
            LinkProtocol::Iso15765Standard
        );
        assert_eq!(
            LinkProtocol::classify("ISO 15765 Extended Id").unwrap(),
            LinkProtocol::Iso15765Extended
        );
    }

    #[test]
    fn classify_is_exact_for_non_can_iso() {
        // Trailing qualifiers are only recognized for the substring-matched
        // families.
        assert!(LinkProtocol::classify("ISO 9141-2 fast init").is_err());
        assert!(LinkProtocol::classify("ISO 14230-4").is_err());
        assert!(LinkProtocol::classify("").is_err());
        assert!(LinkProtocol::classify("CAN").is_err());
    }

    #[test]
    fn header_widths() {
        assert_eq!(LinkProtocol::SaeJ1850.response_header_len(), 3);
        assert_eq!(LinkProtocol::Iso9141.response_header_len(), 3);
        assert_eq!(LinkProtocol::Iso14230.response_header_len(), 3);
        assert_eq!(LinkProtocol::Iso15765Standard.response_header_len(), 2);
        assert_eq!(LinkProtocol::Iso15765Extended.response_header_len(), 4);
    }

    #[test]
    fn legacy_split() {
        assert!(LinkProtocol::SaeJ1850.is_legacy());
        assert!(LinkProtocol::Iso9141.is_legacy());
        assert!(!LinkProtocol::Iso14230.is_legacy());
        assert!(!LinkProtocol::Iso15765Standard.is_legacy());
    }
}
