//  Copyright 2024 groupcache-rs contributors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Consistent-hash ring mapping keys to peer identities.

use std::sync::Arc;

/// `h(data) -> u32`. Default is CRC-32/IEEE, matching the upstream Go
/// reference's `hash/crc32.ChecksumIEEE` byte for byte, so two processes
/// built with the same `(peers, replicas)` agree on every lookup.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

pub fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Sorted virtual-point ring plus the point -> peer mapping.
///
/// Not concurrency-safe by itself: `add` mutates the sorted `keys` vector in
/// place. Callers that need atomic replacement under concurrent lookups
/// should build a fresh `Ring` and swap an `Arc<Ring>` rather than mutate a
/// shared instance (see `PeerPool` in the transport crate).
pub struct Ring {
    replicas: usize,
    hash_fn: HashFn,
    keys: Vec<u32>,
    points: hashbrown::HashMap<u32, String>,
}

impl Ring {
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, Arc::new(crc32_ieee))
    }

    pub fn with_hash_fn(replicas: usize, hash_fn: HashFn) -> Self {
        Self {
            replicas,
            hash_fn,
            keys: Vec::new(),
            points: hashbrown::HashMap::new(),
        }
    }

    /// Builds a ring with all of `peers` already added (the common case:
    /// membership changes rebuild the ring from the full peer list, there is
    /// no incremental `remove`).
    pub fn with_peers(replicas: usize, peers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut ring = Self::new(replicas);
        ring.add(peers);
        ring
    }

    /// Adds each peer's `replicas` virtual points to the ring. The virtual
    /// point key is `ascii(i) ++ peer` — this exact recipe must match across
    /// nodes built with identical configuration.
    pub fn add(&mut self, peers: impl IntoIterator<Item = impl Into<String>>) {
        for peer in peers {
            let peer = peer.into();
            for i in 0..self.replicas {
                let virtual_key = format!("{i}{peer}");
                let point = (self.hash_fn)(virtual_key.as_bytes());
                self.keys.push(point);
                self.points.insert(point, peer.clone());
            }
        }
        self.keys.sort_unstable();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns the peer that owns `key` under the current ring, or `None` if
    /// the ring has no members.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash_fn)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < hash);
        let point = self.keys[idx % self.keys.len()];
        self.points.get(&point).map(String::as_str)
    }
}
