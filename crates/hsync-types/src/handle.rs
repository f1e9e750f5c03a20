use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A document handle issued by the sync engine.
///
/// Handles are base58 strings (Bitcoin alphabet). Nothing here interprets
/// the decoded bytes; a handle is accepted as long as it decodes to at least
/// one byte.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHandle(String);

impl DocumentHandle {
    /// Validate and wrap a handle string.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::Empty { field: "handle" });
        }
        let decoded = bs58::decode(&value)
            .into_vec()
            .map_err(|e| TypeError::InvalidHandle(e.to_string()))?;
        if decoded.is_empty() {
            return Err(TypeError::InvalidHandle("decodes to zero bytes".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DocumentHandle {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DocumentHandle> for String {
    fn from(handle: DocumentHandle) -> Self {
        handle.0
    }
}

impl AsRef<str> for DocumentHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentHandle({})", self.0)
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_engine_style_handle() {
        let raw = "4NMNnkMhL8jXrdJ9jamS58PAVdXu";
        let handle = DocumentHandle::parse(raw).unwrap();
        assert_eq!(handle.as_str(), raw);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            DocumentHandle::parse(""),
            Err(TypeError::Empty { field: "handle" })
        );
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        // '0', 'O', 'I' and 'l' are not in the base58 alphabet.
        for raw in ["not-valid-base58!!", "0abc", "OOO", "Il", "has space"] {
            let err = DocumentHandle::parse(raw).unwrap_err();
            assert!(matches!(err, TypeError::InvalidHandle(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn serde_rejects_invalid_handle() {
        assert!(serde_json::from_str::<DocumentHandle>("\"bad!\"").is_err());
        let ok: DocumentHandle = serde_json::from_str("\"2NEpo7TZRRrLZSi2U\"").unwrap();
        assert_eq!(ok.as_str(), "2NEpo7TZRRrLZSi2U");
    }

    proptest! {
        #[test]
        fn encoded_bytes_always_validate(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
            let encoded = bs58::encode(&bytes).into_string();
            prop_assert!(DocumentHandle::parse(encoded).is_ok());
        }
    }
}
