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

//! Drives spec.md §8 scenario 6 end to end against real HTTP listeners on
//! ephemeral ports: three nodes share one ring; a client asks node A for a
//! key owned by a peer; A forwards over HTTP, the peer loads and returns it,
//! and A never caches the remote value locally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use groupcache_core::{CacheSystem, FnLoader, Group};
use groupcache_transport::HttpPool;
use tokio::net::TcpListener;

type Database = Arc<Mutex<HashMap<String, String>>>;

async fn spin_up_node(listener: TcpListener, self_url: String, peer_urls: Vec<String>, db: Database) -> Group {
    let system = Arc::new(CacheSystem::new());
    let loader = FnLoader::new(move |key: &str| {
        let db = db.clone();
        let key = key.to_string();
        async move { db.lock().unwrap().get(&key).cloned().map(Bytes::from).ok_or_else(|| anyhow::anyhow!("{key} not found")) }
    });
    let group = system.new_group("scores", 0, loader).unwrap();

    let pool = Arc::new(HttpPool::new(self_url));
    pool.set_peers(peer_urls);
    group.register_peers(pool);

    tokio::spawn(groupcache_transport::serve_on(listener, system, groupcache_transport::DEFAULT_PATH_PREFIX));
    group
}

async fn build_cluster(db: Database, n: usize) -> Vec<Group> {
    let mut listeners = Vec::new();
    let mut self_urls = Vec::new();
    for _ in 0..n {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        listeners.push(listener);
        self_urls.push(format!("http://{addr}"));
    }

    let mut groups = Vec::new();
    for (listener, self_url) in listeners.into_iter().zip(self_urls.iter().cloned()) {
        groups.push(spin_up_node(listener, self_url, self_urls.clone(), db.clone()).await);
    }

    // Let every acceptor loop actually start before the client issues
    // requests against it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    groups
}

#[tokio::test]
async fn client_fetch_forwards_to_the_owning_peer_without_caching_locally() {
    let db: Database = Arc::new(Mutex::new(
        [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ));
    let groups = build_cluster(db, 3).await;
    let a = &groups[0];

    for (key, expected) in [("Tom", "630"), ("Jack", "589"), ("Sam", "567")] {
        let view = a.get(key).await.unwrap();
        assert_eq!(view.as_bytes(), expected.as_bytes());
    }

    // Whichever keys A does not itself own were served by a peer over HTTP
    // and must not have been cached locally afterwards.
    let local_after_first_round = a.local_len();

    let repeat = a.get("Tom").await.unwrap();
    assert_eq!(repeat.as_bytes(), b"630");
    assert_eq!(
        a.local_len(),
        local_after_first_round,
        "a second fetch of a remotely-owned key must not grow A's local store"
    );
}

#[tokio::test]
async fn unknown_key_surfaces_the_loader_error_through_the_peer_hop() {
    let db: Database = Arc::new(Mutex::new(HashMap::new()));
    let groups = build_cluster(db, 2).await;
    let a = &groups[0];

    let err = a.get("missing").await.unwrap_err();
    assert!(matches!(err, groupcache_common::GroupCacheError::LoaderFailed(_)));
}
