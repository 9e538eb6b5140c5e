//! Template string newtypes
//!
//! Opaque wrappers around strings carrying `{{dirs.x}}` and
//! `{{parentEnv.NAME}}` substitution points. Keeping them as distinct types
//! stops unresolved templates from leaking into spawn arguments.

use serde::{Deserialize, Serialize};

macro_rules! template_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

template_newtype!(
    /// A filesystem path that may contain template bindings.
    PathTemplate
);

template_newtype!(
    /// An environment-variable value that may contain template bindings.
    EnvTemplate
);

template_newtype!(
    /// A shell command line that may contain template bindings.
    CommandTemplate
);
