use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Instance identifier: the key a client uses to find a document handle.
///
/// The value is opaque. The only rule is that it is not empty; everything
/// else (length, alphabet, uniqueness) is the client's business.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iid(String);

impl Iid {
    /// Validate and wrap a client-supplied identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::Empty { field: "iid" });
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

impl TryFrom<String> for Iid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Iid> for String {
    fn from(iid: Iid) -> Self {
        iid.0
    }
}

impl AsRef<str> for Iid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iid({:?})", self.0)
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
