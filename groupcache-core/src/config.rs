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

//! Builder-style construction for a [`Group`](crate::group::Group), matching
//! the teacher pack's preference for struct-literal/builder config objects
//! over a handful of positional setters.

use std::time::Duration;

use groupcache_common::ByteView;

use crate::singleflight::DEFAULT_GRACE;

/// Callback invoked, outside the store's lock, whenever an entry is evicted.
pub type EvictHook = Box<dyn FnMut(&String, &ByteView) + Send>;

/// Tunables for one [`Group`](crate::group::Group): local store capacity,
/// single-flight grace period, and an optional eviction hook.
pub struct GroupConfig {
    pub(crate) capacity_bytes: usize,
    pub(crate) grace: Duration,
    pub(crate) on_evict: Option<EvictHook>,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 0,
            grace: DEFAULT_GRACE,
            on_evict: None,
        }
    }
}

impl std::fmt::Debug for GroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupConfig")
            .field("capacity_bytes", &self.capacity_bytes)
            .field("grace", &self.grace)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}

/// Builds a [`GroupConfig`]. `capacity_bytes` defaults to `0` (unbounded, per
/// the LRU store's contract); `grace` defaults to the coalescer's 10-second
/// default.
#[derive(Default)]
pub struct GroupBuilder {
    config: GroupConfig,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the local store to `bytes` of `key.len() + value.len()`
    /// accounting. `0` means unbounded.
    pub fn capacity_bytes(mut self, bytes: usize) -> Self {
        self.config.capacity_bytes = bytes;
        self
    }

    /// How long a completed single-flight record lingers before a fresh
    /// caller re-executes the load (spec §4.3).
    pub fn grace(mut self, grace: Duration) -> Self {
        self.config.grace = grace;
        self
    }

    /// Registers a callback run whenever the local store evicts an entry.
    pub fn on_evict(mut self, hook: impl FnMut(&String, &ByteView) + Send + 'static) -> Self {
        self.config.on_evict = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> GroupConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_with_standard_grace() {
        let config = GroupBuilder::new().build();
        assert_eq!(config.capacity_bytes, 0);
        assert_eq!(config.grace, DEFAULT_GRACE);
        assert!(config.on_evict.is_none());
    }

    #[test]
    fn builder_applies_overrides() {
        let config = GroupBuilder::new()
            .capacity_bytes(1024)
            .grace(Duration::from_secs(1))
            .on_evict(|_, _| {})
            .build();
        assert_eq!(config.capacity_bytes, 1024);
        assert_eq!(config.grace, Duration::from_secs(1));
        assert!(config.on_evict.is_some());
    }
}
