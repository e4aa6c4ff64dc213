//! Display names for history labels.
//!
//! Resolution order for an identity seen in a conversation: the group alias
//! (groups only), the bot's own name when the identity is the bot, the contact
//! nickname, and finally the raw identity.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

/// Maps an identity to the name shown next to its messages.
#[async_trait]
pub trait DisplayNameResolver: Send + Sync {
    async fn resolve(&self, identity: &str, conversation: &str) -> String;
}

/// Read access to the platform's contact data.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Nickname the member set inside a group, if any.
    async fn room_alias(&self, identity: &str, room: &str) -> Option<String>;

    /// Contact nickname or remark.
    async fn contact_name(&self, identity: &str) -> Option<String>;
}

/// Applies the resolution order on top of a [`Directory`].
pub struct DirectoryResolver<D> {
    directory: D,
    self_id: String,
    self_name: String,
}

impl<D: Directory> DirectoryResolver<D> {
    pub fn new(directory: D, self_id: impl Into<String>, self_name: impl Into<String>) -> Self {
        Self {
            directory,
            self_id: self_id.into(),
            self_name: self_name.into(),
        }
    }
}

#[async_trait]
impl<D: Directory> DisplayNameResolver for DirectoryResolver<D> {
    async fn resolve(&self, identity: &str, conversation: &str) -> String {
        // a one-to-one conversation is keyed by the peer; it has no aliases
        let is_room = conversation != identity && conversation.ends_with(ferry_core::types::GROUP_SUFFIX);
        if is_room {
            if let Some(alias) = self
                .directory
                .room_alias(identity, conversation)
                .await
                .filter(|a| !a.is_empty())
            {
                return alias;
            }
        }
        if identity == self.self_id {
            return self.self_name.clone();
        }
        self.directory
            .contact_name(identity)
            .await
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| identity.to_string())
    }
}

/// Memoizes another resolver per `(identity, conversation)`.
pub struct CachedResolver<R> {
    inner: R,
    cache: DashMap<(String, String), String>,
}

impl<R: DisplayNameResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Drop cached names, e.g. after a member renamed themselves.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<R: DisplayNameResolver> DisplayNameResolver for CachedResolver<R> {
    async fn resolve(&self, identity: &str, conversation: &str) -> String {
        let key = (identity.to_string(), conversation.to_string());
        if let Some(name) = self.cache.get(&key) {
            return name.clone();
        }
        let name = self.inner.resolve(identity, conversation).await;
        self.cache.insert(key, name.clone());
        name
    }
}

/// Fixed contact data, loaded once (e.g. from the contact table or config).
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    contacts: HashMap<String, String>,
    aliases: HashMap<(String, String), String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(mut self, identity: &str, name: &str) -> Self {
        self.contacts.insert(identity.to_string(), name.to_string());
        self
    }

    pub fn with_alias(mut self, identity: &str, room: &str, alias: &str) -> Self {
        self.aliases
            .insert((identity.to_string(), room.to_string()), alias.to_string());
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn room_alias(&self, identity: &str, room: &str) -> Option<String> {
        self.aliases
            .get(&(identity.to_string(), room.to_string()))
            .cloned()
    }

    async fn contact_name(&self, identity: &str) -> Option<String> {
        self.contacts.get(identity).cloned()
    }
}
