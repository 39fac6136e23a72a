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

//! Composes the LRU store, single-flight coalescer, and peer routing into
//! the read path (spec §4.4): local hit -> peer fetch -> local loader, with
//! the coalescer fanning one execution's result out to every waiter.

use std::sync::Arc;

use groupcache_common::{ByteView, GroupCacheError, Result};
use parking_lot::{Mutex, RwLock};

use crate::config::GroupConfig;
use crate::loader::Loader;
use crate::lru::LruStore;
use crate::peer::{PeerGetter, PeerPicker};
use crate::singleflight::Coalescer;

struct GroupInner {
    loader: Arc<dyn Loader>,
    store: Mutex<LruStore<String, ByteView>>,
    peer_picker: RwLock<Option<Arc<dyn PeerPicker>>>,
    coalescer: Coalescer<Result<ByteView>>,
}

/// A named cache domain: its own loader, local LRU store, and (once
/// registered) a view of the peer group. Cheap to clone -- every clone
/// shares the same store, coalescer, and peer-picker slot through `Arc`.
#[derive(Clone)]
pub struct Group {
    name: Arc<str>,
    inner: Arc<GroupInner>,
}

impl Group {
    pub(crate) fn new(name: Arc<str>, loader: Arc<dyn Loader>, config: GroupConfig) -> Self {
        let GroupConfig {
            capacity_bytes,
            grace,
            on_evict,
        } = config;
        Self {
            name,
            inner: Arc::new(GroupInner {
                loader,
                store: Mutex::new(LruStore::with_evict_hook(capacity_bytes, on_evict)),
                peer_picker: RwLock::new(None),
                coalescer: Coalescer::with_grace(grace),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers this node's view of the peer group. May be called at most
    /// once per group; a second call is a configuration error, fatal at the
    /// call site (spec §4.4: "subsequent calls are fatal").
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        let mut slot = self.inner.peer_picker.write();
        if slot.is_some() {
            panic!("RegisterPeers called more than once on group {:?}", self.name);
        }
        *slot = Some(picker);
    }

    /// Number of entries currently resident in this node's local store.
    /// Exposed for tests that assert a remote fetch bypassed local caching.
    pub fn local_len(&self) -> usize {
        self.inner.store.lock().len()
    }

    /// Fetches `key`: a local hit returns immediately; a miss is coalesced
    /// through the single-flight group so concurrent callers for the same
    /// key share one execution of the peer-fetch-then-load pipeline.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(GroupCacheError::EmptyKey);
        }

        if let Some(view) = self.inner.store.lock().get(&key.to_string()) {
            tracing::debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }

        let inner = self.inner.clone();
        let name = self.name.clone();
        let owned_key = key.to_string();
        self.inner
            .coalescer
            .do_once(key, move || Self::load(inner, name, owned_key))
            .await
            .map_err(|_| GroupCacheError::loader(anyhow::anyhow!("load was cancelled before it completed")))?
    }

    async fn load(inner: Arc<GroupInner>, name: Arc<str>, key: String) -> Result<ByteView> {
        let picker = inner.peer_picker.read().clone();
        if let Some(picker) = picker {
            let (getter, is_remote) = picker.pick_peer(&key);
            if is_remote {
                if let Some(getter) = getter {
                    match getter.get(&name, &key).await {
                        // Deliberately not inserted into the local store: the
                        // authoritative copy lives on the owning peer (spec
                        // §4.4, §9 hot-key caveat).
                        Ok(bytes) => return Ok(ByteView::new(bytes)),
                        Err(err) => {
                            tracing::warn!(
                                group = %name,
                                key,
                                error = %err,
                                "peer fetch failed, falling through to local loader"
                            );
                        }
                    }
                }
            }
        }

        let bytes = inner.loader.load(&key).await.map_err(GroupCacheError::loader)?;
        let view = ByteView::new(bytes);
        inner.store.lock().add(key, view.clone());
        Ok(view)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::loader::FnLoader;

    fn group_with(capacity_bytes: usize, loader: impl Loader) -> Group {
        Group::new(
            Arc::from("test"),
            Arc::new(loader),
            GroupConfig {
                capacity_bytes,
                grace: Duration::from_millis(50),
                on_evict: None,
            },
        )
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_any_load() {
        let g = group_with(
            0,
            FnLoader::new(|_: &str| async { unreachable!("loader must not run for an empty key") }),
        );
        assert!(matches!(g.get("").await, Err(GroupCacheError::EmptyKey)));
    }

    #[tokio::test]
    async fn miss_then_hit_uses_loader_once_and_caches_locally() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let g = group_with(
            0,
            FnLoader::new(move |key: &str| {
                let calls = calls_clone.clone();
                let key = key.to_string();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::from(format!("value-{key}")))
                }
            }),
        );

        let a = g.get("k1").await.unwrap();
        assert_eq!(a.as_bytes(), b"value-k1");
        assert_eq!(g.local_len(), 1);

        let b = g.get("k1").await.unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second get should hit the local store");
    }

    #[tokio::test]
    async fn loader_error_propagates_and_is_not_cached() {
        let g = group_with(0, FnLoader::new(|_: &str| async { Err(anyhow::anyhow!("backing store down")) }));
        let err = g.get("k1").await.unwrap_err();
        assert!(matches!(err, GroupCacheError::LoaderFailed(_)));
        assert_eq!(g.local_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_loader_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let g = group_with(
            0,
            FnLoader::new(move |_: &str| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Bytes::from_static(b"v"))
                }
            }),
        );

        let mut handles = Vec::new();
        for _ in 0..10 {
            let g = g.clone();
            handles.push(tokio::spawn(async move { g.get("hot").await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct RemotePeer {
        bytes: Result<Bytes, ()>,
    }

    #[async_trait]
    impl PeerGetter for RemotePeer {
        async fn get(&self, _group: &str, _key: &str) -> anyhow::Result<Bytes> {
            self.bytes.clone().map_err(|_| anyhow::anyhow!("peer unreachable"))
        }
    }

    struct AlwaysRemote(Arc<RemotePeer>);

    impl PeerPicker for AlwaysRemote {
        fn pick_peer(&self, _key: &str) -> (Option<Arc<dyn PeerGetter>>, bool) {
            (Some(self.0.clone() as Arc<dyn PeerGetter>), true)
        }
    }

    #[tokio::test]
    async fn successful_peer_fetch_bypasses_local_store() {
        let g = group_with(0, FnLoader::new(|_: &str| async { unreachable!("loader must not run") }));
        g.register_peers(Arc::new(AlwaysRemote(Arc::new(RemotePeer {
            bytes: Ok(Bytes::from_static(b"remote-value")),
        }))));

        let view = g.get("k1").await.unwrap();
        assert_eq!(view.as_bytes(), b"remote-value");
        assert_eq!(g.local_len(), 0, "remote fetches must not populate the local store");
    }

    #[tokio::test]
    async fn failed_peer_fetch_falls_through_to_loader() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let g = group_with(
            0,
            FnLoader::new(move |_: &str| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::from_static(b"local-value"))
                }
            }),
        );
        g.register_peers(Arc::new(AlwaysRemote(Arc::new(RemotePeer { bytes: Err(()) }))));

        let view = g.get("k1").await.unwrap();
        assert_eq!(view.as_bytes(), b"local-value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(g.local_len(), 1, "fallthrough load must cache locally");
    }

    #[tokio::test]
    #[should_panic(expected = "RegisterPeers called more than once")]
    async fn registering_peers_twice_panics() {
        let g = group_with(0, FnLoader::new(|_: &str| async { Ok(Bytes::new()) }));
        g.register_peers(Arc::new(AlwaysRemote(Arc::new(RemotePeer { bytes: Err(()) }))));
        g.register_peers(Arc::new(AlwaysRemote(Arc::new(RemotePeer { bytes: Err(()) }))));
    }
}
