//! Shared identifiers, run metadata, and small utilities for workspace crates.
//!
//! ```rust
//! use pcommon::{ConversationId, MessageId, RunMetadata};
//!
//! let metadata = RunMetadata::new("run-1", "thread-1").with_provider("openai");
//! assert_eq!(metadata.message_id(), MessageId::from("run-1"));
//! assert_eq!(metadata.conversation_id(), ConversationId::from("thread-1"));
//! assert_eq!(metadata.provider.as_deref(), Some("openai"));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use pcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod ids {
    //! String newtypes for the identifiers that travel with every attachment.
    //!
    //! ```rust
    //! use pcommon::{MessageId, UserId};
    //!
    //! let message = MessageId::new("msg-42");
    //! let user = UserId::from("user-7");
    //! assert_eq!(message.to_string(), "msg-42");
    //! assert_eq!(user.as_str(), "user-7");
    //! ```

    macro_rules! string_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(
                Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }

                pub fn is_empty(&self) -> bool {
                    self.0.is_empty()
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(
        /// Chat message id. The orchestration engine calls it `run_id`.
        MessageId
    );
    string_id!(
        /// Conversation id. The orchestration engine calls it `thread_id`.
        ConversationId
    );
    string_id!(UserId);
}

pub mod metadata {
    //! Per-step context supplied by the orchestration engine alongside each event.

    use serde::{Deserialize, Serialize};

    use crate::{ConversationId, MessageId};

    /// Immutable for the lifetime of one handler or dispatcher callback.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct RunMetadata {
        pub run_id: String,
        pub thread_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub provider: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub agent_index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_agent_index: Option<u32>,
        #[serde(default)]
        pub hide_sequential_outputs: bool,
    }

    impl RunMetadata {
        pub fn new(run_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
            Self {
                run_id: run_id.into(),
                thread_id: thread_id.into(),
                ..Self::default()
            }
        }

        pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
            self.provider = Some(provider.into());
            self
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = Some(model.into());
            self
        }

        pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
            self.name = Some(name.into());
            self
        }

        pub fn with_agent_position(mut self, agent_index: u32, last_agent_index: u32) -> Self {
            self.agent_index = Some(agent_index);
            self.last_agent_index = Some(last_agent_index);
            self
        }

        pub fn hide_sequential_outputs(mut self) -> Self {
            self.hide_sequential_outputs = true;
            self
        }

        pub fn message_id(&self) -> MessageId {
            MessageId::new(self.run_id.clone())
        }

        pub fn conversation_id(&self) -> ConversationId {
            ConversationId::new(self.thread_id.clone())
        }

        /// Both indices absent also counts as the last agent.
        pub fn is_last_agent(&self) -> bool {
            self.agent_index == self.last_agent_index
        }

        pub fn shows_sequential_outputs(&self) -> bool {
            !self.hide_sequential_outputs
        }
    }
}

pub mod error {
    //! Configuration loading errors shared by the policy crates.

    use std::error::Error;
    use std::fmt::{Display, Formatter};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigErrorKind {
        Io,
        Parse,
        Invalid,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ConfigError {
        pub kind: ConfigErrorKind,
        pub message: String,
    }

    impl ConfigError {
        pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
            Self {
                kind,
                message: message.into(),
            }
        }

        pub fn io(message: impl Into<String>) -> Self {
            Self::new(ConfigErrorKind::Io, message)
        }

        pub fn parse(message: impl Into<String>) -> Self {
            Self::new(ConfigErrorKind::Parse, message)
        }

        pub fn invalid(message: impl Into<String>) -> Self {
            Self::new(ConfigErrorKind::Invalid, message)
        }
    }

    impl Display for ConfigError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}: {}", self.kind, self.message)
        }
    }

    impl Error for ConfigError {}
}

pub mod registry {
    //! Generic keyed table used for handler dispatch.
    //!
    //! ```rust
    //! use pcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use error::{ConfigError, ConfigErrorKind};
pub use future::BoxFuture;
pub use ids::{ConversationId, MessageId, UserId};
pub use metadata::RunMetadata;
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{ConversationId, MessageId, Registry, RunMetadata, UserId};

    #[test]
    fn ids_serialize_as_plain_strings() {
        let message = MessageId::new("msg-1");
        let rendered = serde_json::to_string(&message).expect("id should serialize");

        assert_eq!(rendered, "\"msg-1\"");
        assert_eq!(UserId::from("u-1").as_str(), "u-1");
        assert!(ConversationId::default().is_empty());
    }

    #[test]
    fn run_metadata_maps_run_and_thread_ids() {
        let metadata = RunMetadata::new("run-9", "thread-9").with_model("gpt-4o");

        assert_eq!(metadata.message_id().as_str(), "run-9");
        assert_eq!(metadata.conversation_id().as_str(), "thread-9");
        assert_eq!(metadata.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn agent_position_drives_visibility_helpers() {
        let single = RunMetadata::new("run", "thread");
        assert!(single.is_last_agent());
        assert!(single.shows_sequential_outputs());

        let middle = RunMetadata::new("run", "thread")
            .with_agent_position(0, 2)
            .hide_sequential_outputs();
        assert!(!middle.is_last_agent());
        assert!(!middle.shows_sequential_outputs());
    }

    #[test]
    fn run_metadata_deserializes_with_defaults() {
        let metadata: RunMetadata =
            serde_json::from_str(r#"{"run_id":"r","thread_id":"t","agent_index":1}"#)
                .expect("metadata should parse");

        assert_eq!(metadata.agent_index, Some(1));
        assert_eq!(metadata.last_agent_index, None);
        assert!(!metadata.hide_sequential_outputs);
    }

    #[test]
    fn registry_basic_lifecycle() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("alpha".to_string(), 1_u32);
        assert_eq!(registry.get("alpha"), Some(&1));
        assert_eq!(registry.keys().count(), 1);

        assert_eq!(registry.remove("alpha"), Some(1));
        assert!(registry.is_empty());
    }
}
