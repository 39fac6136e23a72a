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

//! Runs a single node of a groupcache peer group over HTTP: registers one
//! group backed by an in-memory demo "slow store", wires up this node's view
//! of the peer list, and serves the group's HTTP transport until killed.
//!
//! Mirrors the upstream reference's `main_test.go` demo (a `scores` group
//! backed by a `map[string]string`), generalized into a standalone binary
//! that three invocations (one per `--bind`) turn into a working peer group.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use groupcache_core::{CacheSystem, FnLoader};
use groupcache_transport::HttpPool;

/// Run a single node of a groupcache peer group.
#[derive(Parser, Debug)]
#[command(name = "groupcache-node", version, about)]
struct Cli {
    /// Socket address this node's HTTP transport binds to, e.g. 127.0.0.1:8001
    #[arg(long)]
    bind: SocketAddr,

    /// This node's own address as the rest of the group knows it,
    /// e.g. http://127.0.0.1:8001 -- must appear in `--peers` verbatim.
    #[arg(long)]
    self_url: String,

    /// Every peer in the group, including this node, comma-separated.
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Group name shared by every node.
    #[arg(long, default_value = "scores")]
    group: String,

    /// Local store capacity in bytes; 0 means unbounded.
    #[arg(long, default_value_t = 0)]
    capacity_bytes: usize,

    /// Path prefix shared by every peer's HTTP transport. Must match
    /// `groupcache_transport::DEFAULT_PATH_PREFIX` if left at its default.
    #[arg(long, default_value = "/_cache/")]
    path_prefix: String,

    /// Backing-store entry for the demo loader, `KEY=VALUE`; repeatable.
    /// Defaults to the `Tom`/`Jack`/`Sam` scores used by the upstream demo
    /// when none are given.
    #[arg(long = "entry")]
    entries: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let backing_store = parse_backing_store(&cli.entries)?;
    tracing::info!(entries = backing_store.len(), "demo backing store ready");

    let loader = FnLoader::new(move |key: &str| {
        let backing_store = backing_store.clone();
        let key = key.to_string();
        async move {
            tracing::debug!(key, "loading from backing store");
            backing_store
                .get(&key)
                .cloned()
                .map(Bytes::from)
                .ok_or_else(|| anyhow::anyhow!("{key} not found in backing store"))
        }
    });

    let system = Arc::new(CacheSystem::new());
    let group = system
        .new_group(cli.group.clone(), cli.capacity_bytes, loader)
        .context("registering group")?;

    let pool = Arc::new(HttpPool::with_options(
        cli.self_url.clone(),
        cli.path_prefix.clone(),
        groupcache_transport::DEFAULT_REPLICAS,
    ));
    pool.set_peers(cli.peers.clone());
    group.register_peers(pool);

    tracing::info!(
        bind = %cli.bind,
        self_url = %cli.self_url,
        group = %cli.group,
        peers = cli.peers.len(),
        "starting groupcache node"
    );
    groupcache_transport::serve(cli.bind, system, cli.path_prefix).await
}

fn parse_backing_store(entries: &[String]) -> anyhow::Result<HashMap<String, String>> {
    if entries.is_empty() {
        return Ok([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect());
    }
    entries
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("invalid --entry {raw:?}, expected KEY=VALUE"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backing_store_matches_the_upstream_demo() {
        let store = parse_backing_store(&[]).unwrap();
        assert_eq!(store.get("Tom"), Some(&"630".to_string()));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn custom_entries_override_the_defaults() {
        let store = parse_backing_store(&["a=1".to_string(), "b=2".to_string()]).unwrap();
        assert_eq!(store.get("a"), Some(&"1".to_string()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn malformed_entry_is_rejected() {
        assert!(parse_backing_store(&["no-equals-sign".to_string()]).is_err());
    }
}
