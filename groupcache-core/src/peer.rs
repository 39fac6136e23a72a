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

//! Abstractions the transport layer implements so the core never depends on
//! a concrete wire format (spec §6: "dynamic-dispatch abstractions as small,
//! object-safe trait contracts").

use async_trait::async_trait;

/// Fetches a key's value from a specific remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync + 'static {
    /// Returns the raw bytes for `key` in `group`, or an error on any
    /// transport failure or remote-absence. The group's load pipeline
    /// recovers from any error here by falling through to the local loader.
    async fn get(&self, group: &str, key: &str) -> anyhow::Result<bytes::Bytes>;
}

/// Chooses which peer, if any, owns a key.
pub trait PeerPicker: Send + Sync + 'static {
    /// Returns `(Some(getter), true)` when `key` is owned by a remote peer,
    /// or `(None, false)` when the ring names this node itself (self-routing:
    /// the picker must compare the chosen owner against its own identity).
    fn pick_peer(&self, key: &str) -> (Option<std::sync::Arc<dyn PeerGetter>>, bool);
}
