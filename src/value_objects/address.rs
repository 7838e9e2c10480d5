//! EIP-55 checksummed account addresses

use crate::errors::AddressError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account address held in its mixed-case checksum form
///
/// Construction normalizes any casing, so two addresses compare equal exactly
/// when they name the same account.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChecksumAddress {
    text: String,
    bytes: [u8; 20],
}

impl ChecksumAddress {
    /// Normalize a `0x`-prefixed (or bare) hex address to checksum form
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 40 {
            return Err(AddressError::InvalidLength {
                input: raw.to_string(),
                length: digits.len(),
            });
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex {
            input: raw.to_string(),
        })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Checksum a raw 20-byte address
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let lower = hex::encode(bytes);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut checksummed = String::with_capacity(42);
        checksummed.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c);
            }
        }

        Self {
            text: checksummed,
            bytes,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.bytes
    }
}

impl fmt::Display for ChecksumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for ChecksumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChecksumAddress").field(&self.text).finish()
    }
}

impl FromStr for ChecksumAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChecksumAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChecksumAddress> for String {
    fn from(value: ChecksumAddress) -> Self {
        value.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_checksums() {
        let vectors = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];

        for expected in vectors {
            let from_lower = ChecksumAddress::parse(&expected.to_lowercase()).unwrap();
            assert_eq!(from_lower.as_str(), expected);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            ChecksumAddress::parse("0x1234"),
            Err(AddressError::InvalidLength { length: 4, .. })
        ));
        assert!(matches!(
            ChecksumAddress::parse("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(AddressError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_bytes_survive_normalization() {
        let address = ChecksumAddress::parse("0xD1220A0CF47C7B9BE7A2E6BA89F429762E7B9ADB").unwrap();
        let bytes = address.to_bytes();
        assert_eq!(bytes[0], 0xd1);
        assert_eq!(bytes[19], 0xdb);
        assert_eq!(ChecksumAddress::from_bytes(bytes), address);
    }

    #[test]
    fn test_prefix_is_optional() {
        let bare = ChecksumAddress::parse("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(bare.as_str(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_serde_normalizes() {
        let address: ChecksumAddress =
            serde_json::from_value(serde_json::json!("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"))
                .unwrap();
        assert_eq!(address.as_str(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    proptest! {
        #[test]
        fn casing_never_changes_the_address(bytes in proptest::array::uniform20(any::<u8>())) {
            let lower = format!("0x{}", hex::encode(bytes));
            let upper = format!("0x{}", hex::encode_upper(bytes));

            let a = ChecksumAddress::parse(&lower).unwrap();
            let b = ChecksumAddress::parse(&upper).unwrap();

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.to_bytes(), bytes);
            prop_assert_eq!(ChecksumAddress::parse(a.as_str()).unwrap(), a);
        }
    }
}
