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

//! The `name -> Group` registry (spec §4.4, §6). Per spec §9's REDESIGN
//! FLAG, the registry is an explicit [`CacheSystem`] object rather than a
//! bare global map; `new_group`/`get_group` are a thin process-wide facade
//! over a lazily constructed default instance, matching the upstream
//! reference's package-level `NewGroup`/`GetGroup` ergonomics.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use groupcache_common::{GroupCacheError, Result};
use parking_lot::RwLock;

use crate::config::GroupConfig;
use crate::group::Group;
use crate::loader::Loader;

/// Owns the process's named groups. Read-heavy: writes only happen when a
/// new group is registered (spec §5: "a readers-writer lock (writes only at
/// `NewGroup`)").
#[derive(Default)]
pub struct CacheSystem {
    groups: RwLock<HashMap<String, Group>>,
}

impl CacheSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with a default [`GroupConfig`] (unbounded store, the
    /// coalescer's standard grace period). Rejects a duplicate name rather
    /// than overwriting the existing group (spec §4.4: "repeated names
    /// overwrite is not permitted").
    pub fn new_group(&self, name: impl Into<String>, capacity_bytes: usize, loader: impl Loader) -> Result<Group> {
        self.new_group_with_config(
            name,
            GroupConfig {
                capacity_bytes,
                ..GroupConfig::default()
            },
            loader,
        )
    }

    /// Same as [`Self::new_group`] but with full control over the group's
    /// capacity, grace period, and eviction hook via [`GroupConfig`]/
    /// [`crate::config::GroupBuilder`].
    pub fn new_group_with_config(
        &self,
        name: impl Into<String>,
        config: GroupConfig,
        loader: impl Loader,
    ) -> Result<Group> {
        let name = name.into();
        let mut groups = self.groups.write();
        if groups.contains_key(&name) {
            return Err(GroupCacheError::Configuration(format!(
                "group {name:?} is already registered"
            )));
        }
        let group = Group::new(Arc::from(name.as_str()), Arc::new(loader), config);
        groups.insert(name, group.clone());
        Ok(group)
    }

    pub fn get_group(&self, name: &str) -> Option<Group> {
        self.groups.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL: OnceLock<CacheSystem> = OnceLock::new();

fn global() -> &'static CacheSystem {
    GLOBAL.get_or_init(CacheSystem::new)
}

/// Registers `name` in the process-wide [`CacheSystem`]. See
/// [`CacheSystem::new_group`].
pub fn new_group(name: impl Into<String>, capacity_bytes: usize, loader: impl Loader) -> Result<Group> {
    global().new_group(name, capacity_bytes, loader)
}

/// Looks `name` up in the process-wide [`CacheSystem`].
pub fn get_group(name: &str) -> Option<Group> {
    global().get_group(name)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::loader::FnLoader;

    fn loader() -> impl Loader {
        FnLoader::new(|key: &str| {
            let key = key.to_string();
            async move { Ok(Bytes::from(key)) }
        })
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let system = CacheSystem::new();
        assert!(system.new_group("g", 0, loader()).is_ok());
        let err = system.new_group("g", 0, loader()).unwrap_err();
        assert!(matches!(err, GroupCacheError::Configuration(_)));
    }

    #[test]
    fn get_group_returns_the_registered_group() {
        let system = CacheSystem::new();
        assert!(system.get_group("g").is_none());
        system.new_group("g", 0, loader()).unwrap();
        assert!(system.get_group("g").is_some());
        assert_eq!(system.len(), 1);
    }
}
