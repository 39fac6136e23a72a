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

//! Boots three in-process groupcache nodes sharing one consistent-hash ring,
//! then drives spec.md §8 scenario 6 end to end: a client asks node A for a
//! key, A's ring routes it to whichever peer owns it, that peer loads it
//! from the shared "database" and returns it, and A never caches the
//! remote-fetched value locally.
//!
//! Run with: `cargo run --example three_node_cluster -p groupcache-demos`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use groupcache_core::{CacheSystem, FnLoader, Group};
use groupcache_transport::HttpPool;

const GROUP_NAME: &str = "scores";
const NODES: [(&str, &str); 3] = [
    ("127.0.0.1:18081", "http://127.0.0.1:18081"),
    ("127.0.0.1:18082", "http://127.0.0.1:18082"),
    ("127.0.0.1:18083", "http://127.0.0.1:18083"),
];

/// Stands in for a slow backing store every node's loader reads from.
type Database = Arc<Mutex<HashMap<String, String>>>;

async fn start_node(bind: &str, self_url: &str, peer_urls: &[String], db: Database) -> Group {
    let system = Arc::new(CacheSystem::new());
    let loader = FnLoader::new(move |key: &str| {
        let db = db.clone();
        let key = key.to_string();
        async move {
            tracing::info!(key, "loading from shared database");
            db.lock()
                .unwrap()
                .get(&key)
                .cloned()
                .map(Bytes::from)
                .ok_or_else(|| anyhow::anyhow!("{key} not found"))
        }
    });
    let group = system.new_group(GROUP_NAME, 0, loader).expect("group registration");

    let pool = Arc::new(HttpPool::new(self_url));
    pool.set_peers(peer_urls.to_vec());
    group.register_peers(pool);

    let bind: SocketAddr = bind.parse().expect("valid bind address");
    tokio::spawn(groupcache_transport::serve(bind, system, groupcache_transport::DEFAULT_PATH_PREFIX));

    group
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db: Database = Arc::new(Mutex::new(
        [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ));

    let peer_urls: Vec<String> = NODES.iter().map(|(_, url)| url.to_string()).collect();

    let mut groups = Vec::new();
    for (bind, self_url) in NODES {
        groups.push(start_node(bind, self_url, &peer_urls, db.clone()).await);
    }

    // Give every listener a moment to bind before the client starts issuing
    // requests against them.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = &groups[0]; // "node A" from the client's point of view

    for key in ["Tom", "Jack", "Sam"] {
        let view = client.get(key).await?;
        println!("A fetched {key} = {:?} (A local entries: {})", view.as_str(), client.local_len());
    }

    // Second fetch of the same key: if A owns it locally this is a cache
    // hit; if a peer owns it, A repeats the forward and still does not
    // cache the value (spec.md §8 scenario 6).
    let second = client.get("Tom").await?;
    println!("A fetched Tom again = {:?} (A local entries: {})", second.as_str(), client.local_len());

    Ok(())
}
