// SPDX-License-Identifier: MIT OR Apache-2.0
//! Instance cache shared across compiles.
//!
//! Each (socket, definition) pair keeps the instance object it produced the
//! first time, so recompiling an unchanged part of a graph reuses the same
//! objects. Lookups take a shared lock; insert and remove are exclusive.

use crate::catalog::DefinitionId;
use crate::object::Object;
use lumen_graph::PortId;
use parking_lot::RwLock;
use std::collections::HashMap;

type Key = (PortId, DefinitionId);

/// Cache of node instances by socket and definition
#[derive(Debug, Default)]
pub struct SocketInstanceCache {
    entries: RwLock<HashMap<Key, Object>>,
}

impl SocketInstanceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance
    pub fn get(&self, socket: PortId, definition: DefinitionId) -> Option<Object> {
        self.entries.read().get(&(socket, definition)).cloned()
    }

    /// Store an instance, returning the one it replaced
    pub fn insert(&self, socket: PortId, definition: DefinitionId, instance: Object) -> Option<Object> {
        self.entries.write().insert((socket, definition), instance)
    }

    /// Cached instance, creating it on a miss
    pub fn get_or_insert_with(
        &self,
        socket: PortId,
        definition: DefinitionId,
        create: impl FnOnce() -> Object,
    ) -> Object {
        if let Some(instance) = self.get(socket, definition) {
            return instance;
        }
        self.entries
            .write()
            .entry((socket, definition))
            .or_insert_with(create)
            .clone()
    }

    /// Drop every entry for a socket
    pub fn remove_socket(&self, socket: PortId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(port, _), _| *port != socket);
        before - entries.len()
    }

    /// Keep only entries whose socket passes the predicate
    pub fn retain_sockets(&self, mut keep: impl FnMut(PortId) -> bool) {
        self.entries.write().retain(|(port, _), _| keep(*port));
    }

    /// Number of cached instances
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove everything
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_is_created_once() {
        let cache = SocketInstanceCache::new();
        let socket = PortId::new();
        let definition = DefinitionId::new();
        let first = cache.get_or_insert_with(socket, definition, || Object::int(1));
        let second = cache.get_or_insert_with(socket, definition, || Object::int(2));
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_by_socket() {
        let cache = SocketInstanceCache::new();
        let (a, b) = (PortId::new(), PortId::new());
        cache.insert(a, DefinitionId::new(), Object::int(1));
        cache.insert(a, DefinitionId::new(), Object::int(2));
        cache.insert(b, DefinitionId::new(), Object::int(3));

        assert_eq!(cache.remove_socket(a), 2);
        assert_eq!(cache.len(), 1);
        cache.retain_sockets(|port| port != b);
        assert!(cache.is_empty());
    }
}
