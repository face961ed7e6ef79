//! Type-safe identifier wrappers.
//!
//! Newtypes keep room ids, message ids and correlation keys from being
//! mixed up at compile time.
//!
//! | Type | Wraps | Example |
//! |------|-------|---------|
//! | [`RoomId`] | chat room id or alias | `!abc:example.org` |
//! | [`MessageId`] | chat event id | `$event:example.org` |
//! | [`LogicalKey`] | correlation topic | `job status` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Macros
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// ============================================================================
// Identifiers
// ============================================================================

string_id! {
    /// Chat room identity (room id or alias).
    RoomId
}

string_id! {
    /// Chat message id returned by the gateway on send.
    MessageId
}

string_id! {
    /// Label naming what a message is about, used for edit correlation.
    LogicalKey
}

impl LogicalKey {
    /// Key used for the periodic job status message.
    #[inline]
    #[must_use]
    pub fn job_status() -> Self {
        Self::new("job status")
    }
}

// ============================================================================
// Tests
// ============================================================================
