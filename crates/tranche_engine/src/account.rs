//! Account identifiers

use core::fmt;
use core::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Prefix marking a config account as a label for [`AccountId::derived`]
pub const LABEL_PREFIX: &str = "label:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAccountError {
    #[error("`{0}` is not valid base58 (use `label:<name>` for derived accounts)")]
    InvalidBase58(String),
    #[error("`{input}` decodes to {len} bytes, expected 32")]
    WrongLength { input: String, len: usize },
    #[error("empty account label")]
    EmptyLabel,
}

/// 32-byte account address, rendered in base58
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a protocol-owned or test account
    ///
    /// Each 8-byte lane is FNV-1a over a lane tag followed by the label.
    pub fn derived(label: &str) -> Self {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut bytes = [0u8; 32];
        for (lane, chunk) in bytes.chunks_exact_mut(8).enumerate() {
            let mut h = OFFSET;
            for b in core::iter::once(lane as u8).chain(label.bytes()) {
                h ^= u64::from(b);
                h = h.wrapping_mul(PRIME);
            }
            chunk.copy_from_slice(&h.to_le_bytes());
        }
        Self(bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_base58();
        write!(f, "AccountId({}..)", &s[..s.len().min(8)])
    }
}

impl FromStr for AccountId {
    type Err = ParseAccountError;

    /// `label:<name>` derives an account from `<name>`; anything else must
    /// be base58 decoding to exactly 32 bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(label) = s.strip_prefix(LABEL_PREFIX) {
            if label.is_empty() {
                return Err(ParseAccountError::EmptyLabel);
            }
            return Ok(Self::derived(label));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParseAccountError::InvalidBase58(s.to_string()))?;
        let raw: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseAccountError::WrongLength {
                input: s.to_string(),
                len: bytes.len(),
            })?;
        Ok(Self(raw))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_is_deterministic_and_distinct() {
        assert_eq!(AccountId::derived("alice"), AccountId::derived("alice"));
        assert_ne!(AccountId::derived("alice"), AccountId::derived("bob"));
        assert_ne!(AccountId::derived("alice"), AccountId::default());
    }

    #[test]
    fn test_parse_base58_and_explicit_label() {
        let id = AccountId::derived("engine");
        let parsed: AccountId = id.to_base58().parse().unwrap();
        assert_eq!(parsed, id);

        let label: AccountId = "label:engine".parse().unwrap();
        assert_eq!(label, id);
    }

    #[test]
    fn test_mistyped_address_is_rejected() {
        let mut typo = AccountId::derived("alice").to_base58();
        // '0' is outside the base58 alphabet
        typo.replace_range(3..4, "0");
        assert!(matches!(
            typo.parse::<AccountId>(),
            Err(ParseAccountError::InvalidBase58(_))
        ));

        // a bare name is no longer a label
        assert!("alice".parse::<AccountId>().is_err());

        let short = bs58::encode([7u8; 31]).into_string();
        assert!(matches!(
            short.parse::<AccountId>(),
            Err(ParseAccountError::WrongLength { len: 31, .. })
        ));
        assert_eq!("label:".parse::<AccountId>(), Err(ParseAccountError::EmptyLabel));
    }
}
