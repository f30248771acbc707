//! Recipient identity resolution (handle → wallet address)

use crate::error::{ConfigError, PipelineError};
use crate::types::RecipientIdentity;
use alloy_primitives::Address;
use std::collections::BTreeMap;

/// Case-insensitive handle directory
#[derive(Debug, Clone, Default)]
pub struct RecipientDirectory {
    entries: BTreeMap<String, Address>,
}

impl RecipientDirectory {
    /// Build from configured entries
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateRecipient` if two handles normalize to the same key
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, Address)>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (handle, address) in entries {
            let key = normalize(handle.as_ref());
            if key.is_empty() {
                return Err(ConfigError::invalid("recipients", "empty handle"));
            }
            if map.insert(key.clone(), address).is_some() {
                return Err(ConfigError::DuplicateRecipient(key));
            }
        }
        Ok(Self { entries: map })
    }

    /// Resolve a handle to its wallet address
    ///
    /// # Errors
    /// Returns `PipelineError::UnknownRecipient` when no mapping exists
    pub fn resolve(&self, handle: &str) -> Result<RecipientIdentity, PipelineError> {
        let key = normalize(handle);
        self.entries
            .get(&key)
            .map(|address| RecipientIdentity {
                handle: key.clone(),
                address: *address,
            })
            .ok_or_else(|| PipelineError::UnknownRecipient {
                handle: handle.to_string(),
            })
    }

    /// Number of configured handles
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no handles are configured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn normalize(handle: &str) -> String {
    handle.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const AOTH: Address = address!("3fAb8CC827b4C41Dc9e6C07d522fD2f48A431f23");

    #[test]
    fn resolves_case_insensitively() {
        let dir = RecipientDirectory::from_entries([("Aoth", AOTH)]).unwrap();
        let who = dir.resolve("  AOTH ").unwrap();
        assert_eq!(who.address, AOTH);
        assert_eq!(who.handle, "aoth");
    }

    #[test]
    fn unknown_handle() {
        let dir = RecipientDirectory::from_entries([("aoth", AOTH)]).unwrap();
        match dir.resolve("mallory") {
            Err(PipelineError::UnknownRecipient { handle }) => assert_eq!(handle, "mallory"),
            other => panic!("expected UnknownRecipient, got {other:?}"),
        }
        assert!(dir.resolve("").is_err());
    }

    #[test]
    fn duplicate_after_normalization() {
        let err = RecipientDirectory::from_entries([("aoth", AOTH), ("AOTH", Address::ZERO)]);
        assert!(matches!(err, Err(ConfigError::DuplicateRecipient(h)) if h == "aoth"));
    }
}
