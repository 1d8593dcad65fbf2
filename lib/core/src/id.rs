//! Identifier newtypes for engine-generated entities.
//!
//! Job instances and runs are identified by ULIDs, so ids sort by creation
//! time when listed out of the store. The textual form carries a short type
//! prefix (`job_01H…`, `run_01H…`); parsing accepts the bare ULID as well,
//! since operators paste both shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error from parsing an identifier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidId {
    /// Prefix the identifier type expects.
    pub expected_prefix: &'static str,
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for InvalidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a valid {}_ identifier",
            self.input, self.expected_prefix
        )
    }
}

impl std::error::Error for InvalidId {}

/// Declares a prefixed ULID newtype.
macro_rules! ulid_id {
    ($(#[$doc:meta])* $name:ident => $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Mints a fresh identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bare = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                bare.parse::<Ulid>().map(Self).map_err(|_| InvalidId {
                    expected_prefix: $prefix,
                    input: s.to_string(),
                })
            }
        }
    };
}

ulid_id! {
    /// Identifies one concrete job instance.
    JobId => "job"
}

ulid_id! {
    /// Identifies one execution (run) of a workflow.
    RunId => "run"
}
