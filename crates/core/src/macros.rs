// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the workspace.
//!
//! - [`define_id!`] — prefixed random ID newtype around `SmolStr`
//! - [`simple_display!`] — `Display` impl mapping enum variants to string literals

/// Define a newtype ID wrapper around `SmolStr` with a type prefix.
///
/// The ID format is `{prefix}{nanoid}` where the prefix is a short type
/// indicator (e.g. "wks-", "trm-") and the nanoid is 19 random characters,
/// so the whole ID fits SmolStr's inline capacity.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct WorkspaceId("wks-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random ID with the type prefix
            pub fn new() -> Self {
                Self(smol_str::SmolStr::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(19)
                )))
            }

            /// Create ID from existing string (for parsing/deserialization)
            pub fn from_string(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Get the ID suffix (without prefix)
            pub fn suffix(&self) -> &str {
                self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
            }

            /// Returns a string slice of the suffix truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                let suffix = self.suffix();
                let end = std::cmp::min(n, suffix.len());
                &suffix[..end]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` or
/// `{ .. }` to ignore fields.
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}
