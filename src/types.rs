//! NewType wrappers for strong typing across the dispatch layer.
//!
//! These keep tool names, image references and prompt names from being
//! mixed up with the free-form strings that flow through parameter bags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag applied to an image reference when a plan names an image without one.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Registry key of a tool (e.g., "create_network").
    ///
    /// Plans refer to tools by this name in their `action` field, and the
    /// language model sees the same name in the tool catalogue.
    ToolName
);

newtype_string!(
    /// A fully qualified image reference such as "nginx:latest".
    ImageRef
);

newtype_string!(
    /// Name of a prompt in the prompt catalogue (e.g., "docker_compose").
    PromptName
);

impl ImageRef {
    /// Build a reference from a repository name and an optional tag.
    ///
    /// An absent or empty tag resolves to [`DEFAULT_IMAGE_TAG`].
    pub fn from_parts(name: &str, tag: Option<&str>) -> Self {
        let tag = tag.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_IMAGE_TAG);
        Self(format!("{}:{}", name, tag))
    }

    /// Split the reference into repository and tag for the engine's pull API.
    ///
    /// A reference without a tag resolves to [`DEFAULT_IMAGE_TAG`]; the engine
    /// would otherwise pull every tag of the repository. A digest reference
    /// (`repo@sha256:...`) yields the digest in the tag position and drops any
    /// tag written before it. A colon that belongs to a registry port
    /// (`host:5000/repo`) is not mistaken for a tag separator.
    pub fn split(&self) -> (&str, &str) {
        if let Some((name, digest)) = self.0.split_once('@') {
            return (Self::strip_tag(name).0, digest);
        }
        let (repository, tag) = Self::strip_tag(&self.0);
        (repository, tag.unwrap_or(DEFAULT_IMAGE_TAG))
    }

    fn strip_tag(name: &str) -> (&str, Option<&str>) {
        match name.rfind(':') {
            Some(idx) if !name[idx + 1..].contains('/') => (&name[..idx], Some(&name[idx + 1..])),
            _ => (name, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_creation() {
        let name = ToolName::new("create_network");
        assert_eq!(name.as_str(), "create_network");
        assert_eq!(name.to_string(), "create_network");
    }

    #[test]
    fn test_tool_name_serde() {
        let name = ToolName::new("pull_image");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"pull_image\"");

        let parsed: ToolName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_image_ref_defaults_tag() {
        assert_eq!(ImageRef::from_parts("redis", None).as_str(), "redis:latest");
        assert_eq!(ImageRef::from_parts("redis", Some("")).as_str(), "redis:latest");
        assert_eq!(ImageRef::from_parts("redis", Some("7")).as_str(), "redis:7");
    }

    #[test]
    fn test_image_ref_split() {
        assert_eq!(ImageRef::new("nginx:1.27").split(), ("nginx", "1.27"));
        assert_eq!(ImageRef::new("nginx").split(), ("nginx", "latest"));
        assert_eq!(
            ImageRef::new("registry.local:5000/app").split(),
            ("registry.local:5000/app", "latest")
        );
        assert_eq!(
            ImageRef::new("registry.local:5000/app:v2").split(),
            ("registry.local:5000/app", "v2")
        );
        assert_eq!(
            ImageRef::new("alpine@sha256:abcd").split(),
            ("alpine", "sha256:abcd")
        );
        assert_eq!(
            ImageRef::new("alpine:3.20@sha256:abcd").split(),
            ("alpine", "sha256:abcd")
        );
    }
}
