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

//! HTTP implementation of [`PeerPicker`]: owns the consistent-hash ring and
//! one [`HttpPeerGetter`] per peer (spec §4.2, §6, §9 "shared ring
//! updates", supplemented from `original_source/http.go`'s `HttpPool`).

use std::collections::HashMap;
use std::sync::Arc;

use groupcache_core::{PeerGetter, PeerPicker, Ring};
use parking_lot::RwLock;

use crate::getter::HttpPeerGetter;

/// Mirrors the upstream reference's `defaultPath`.
pub const DEFAULT_PATH_PREFIX: &str = "/_cache/";
/// Mirrors the spec's recommended default replica count (§4.2).
pub const DEFAULT_REPLICAS: usize = 50;

struct Peers {
    ring: Ring,
    getters: HashMap<String, Arc<HttpPeerGetter>>,
}

/// This node's view of the peer group over HTTP.
///
/// `set_peers` rebuilds the ring and getter map from the full membership
/// list and swaps them in as one atomic `Arc` replacement under the pool's
/// own lock, so a lookup concurrent with a membership change sees either
/// the complete old or the complete new ring (spec §5, §9) -- never a torn
/// mix of the two.
pub struct HttpPool {
    self_addr: String,
    path_prefix: String,
    replicas: usize,
    peers: RwLock<Arc<Peers>>,
}

impl HttpPool {
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_options(self_addr, DEFAULT_PATH_PREFIX, DEFAULT_REPLICAS)
    }

    pub fn with_options(self_addr: impl Into<String>, path_prefix: impl Into<String>, replicas: usize) -> Self {
        Self {
            self_addr: self_addr.into(),
            path_prefix: path_prefix.into(),
            replicas,
            peers: RwLock::new(Arc::new(Peers {
                ring: Ring::new(replicas),
                getters: HashMap::new(),
            })),
        }
    }

    /// Replaces the full peer list (spec §4.2 non-goal: "no removal
    /// operation; membership changes rebuild the ring from the current full
    /// peer list"). `addrs` should include every peer in the group,
    /// including this node's own address.
    pub fn set_peers(&self, addrs: impl IntoIterator<Item = impl Into<String>>) {
        let addrs: Vec<String> = addrs.into_iter().map(Into::into).collect();
        let mut ring = Ring::new(self.replicas);
        ring.add(addrs.iter().cloned());
        let getters = addrs
            .iter()
            .filter(|addr| addr.as_str() != self.self_addr)
            .map(|addr| {
                let base = format!("{addr}{}", self.path_prefix);
                (addr.clone(), Arc::new(HttpPeerGetter::new(base)))
            })
            .collect();
        *self.peers.write() = Arc::new(Peers { ring, getters });
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }
}

impl PeerPicker for HttpPool {
    /// Routes `key` through the ring; returns `(None, false)` when the ring
    /// is empty, names this node, or (defensively) names a peer with no
    /// registered getter (spec §4.4 self-routing rule).
    fn pick_peer(&self, key: &str) -> (Option<Arc<dyn PeerGetter>>, bool) {
        let peers = self.peers.read().clone();
        let Some(owner) = peers.ring.get(key) else {
            return (None, false);
        };
        if owner == self.self_addr {
            return (None, false);
        }
        match peers.getters.get(owner) {
            Some(getter) => (Some(getter.clone() as Arc<dyn PeerGetter>), true),
            None => (None, false),
        }
    }
}
