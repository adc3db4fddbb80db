//! Bounded free-text reason attached to reputation entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Opaque human-written reason. Never parsed, only length-checked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reason(String);

impl Reason {
    /// Maximum reason length in bytes.
    pub const MAX_LEN: usize = 1024;

    pub fn new(text: impl Into<String>) -> Result<Self, TypeError> {
        let text = text.into();
        if text.len() > Self::MAX_LEN {
            return Err(TypeError::ReasonTooLong {
                len: text.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(text))
    }

    /// Build a reason, cutting it at the last char boundary within
    /// [`Self::MAX_LEN`]. Used for generated reasons that embed user text.
    pub fn truncated(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.len() > Self::MAX_LEN {
            let mut cut = Self::MAX_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Reason {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Reason> for String {
    fn from(r: Reason) -> Self {
        r.0
    }
}
