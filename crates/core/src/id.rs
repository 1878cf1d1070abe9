// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Identifier newtypes

/// Separator between a namespace and a partial job id.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Define a newtype ID wrapper around `SmolStr`.
///
/// The plain form wraps caller-supplied identifiers (job ids come from
/// definitions). The prefixed form additionally generates random ids of
/// the shape `{prefix}{nanoid}` via `generate()`.
///
/// ```ignore
/// define_id! {
///     /// Fully-qualified job identifier.
///     pub struct JobId;
/// }
/// define_id! {
///     /// Session identifier.
///     pub struct SessionId("ses-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $crate::define_id! {
            $(#[$meta])*
            pub struct $name;
        }

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random ID with the type prefix
            pub fn generate() -> Self {
                Self::with_prefix(Self::PREFIX)
            }

            /// Generate a new random ID with a caller-chosen prefix
            pub fn with_prefix(prefix: &str) -> Self {
                Self(smol_str::SmolStr::new(format!("{}{}", prefix, nanoid::nanoid!(12))))
            }
        }
    };
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub fn new(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                Self::new(s.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Fully-qualified job identifier (`namespace::partial_id`).
    pub struct JobId;
}

crate::define_id! {
    /// Identifier of one persisted session.
    pub struct SessionId("tb-");
}

impl JobId {
    /// Namespace part of a qualified id, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once(NAMESPACE_SEPARATOR).map(|(ns, _)| ns)
    }

    /// Partial (unqualified) part of the id.
    pub fn partial(&self) -> &str {
        self.0
            .rsplit_once(NAMESPACE_SEPARATOR)
            .map(|(_, partial)| partial)
            .unwrap_or(&self.0)
    }
}

/// Qualify `partial` with `namespace` unless it is already qualified.
pub fn qualify(namespace: Option<&str>, partial: &str) -> JobId {
    match namespace {
        Some(ns) if !ns.is_empty() && !partial.contains(NAMESPACE_SEPARATOR) => {
            JobId::new(format!("{ns}{NAMESPACE_SEPARATOR}{partial}"))
        }
        _ => JobId::new(partial),
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
