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

//! HTTP server side of the transport: parses `/<prefix>/<group>/<key>`,
//! looks the group up in a [`CacheSystem`], calls `Group::get`, and writes
//! the value back as the response body (spec §6, §1 "HTTP transport and its
//! wire envelope", supplemented from `original_source/http.go`'s
//! `HttpPool.ServeHTTP`).

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use groupcache_core::CacheSystem;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;

use crate::error::TransportError;

/// Binds `addr` and serves every group in `system` under `path_prefix`
/// (e.g. `/_cache/<group>/<key>`) until the process exits or the caller
/// drops the returned task. Runs forever; spawn it.
pub async fn serve(addr: SocketAddr, system: Arc<CacheSystem>, path_prefix: impl Into<String>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, system, path_prefix).await
}

/// Same as [`serve`] but takes an already-bound listener, so a caller that
/// bound to port `0` can read back the OS-assigned port via
/// `listener.local_addr()` before serving -- the pattern an integration test
/// needs for an ephemeral-port multi-node cluster (spec.md §8 scenario 6).
pub async fn serve_on(listener: TcpListener, system: Arc<CacheSystem>, path_prefix: impl Into<String>) -> anyhow::Result<()> {
    let path_prefix = Arc::new(normalize_prefix(path_prefix.into()));
    tracing::info!(addr = %listener.local_addr()?, prefix = %path_prefix, "groupcache HTTP transport listening");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let system = system.clone();
        let path_prefix = path_prefix.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let system = system.clone();
                let path_prefix = path_prefix.clone();
                async move { handle(req, system, path_prefix).await }
            });
            if let Err(err) = AutoBuilder::new(TokioExecutor::new()).serve_connection(io, service).await {
                tracing::warn!(%peer_addr, error = %err, "groupcache connection error");
            }
        });
    }
}

fn normalize_prefix(mut prefix: String) -> String {
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

async fn handle(
    req: Request<Incoming>,
    system: Arc<CacheSystem>,
    path_prefix: Arc<String>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let path = req.uri().path().to_string();
    Ok(match route(&path, &path_prefix, &system).await {
        Ok(view) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/octet-stream")
            .body(Full::new(Bytes::copy_from_slice(view.as_bytes())))
            .expect("well-formed response"),
        Err(err) => {
            let status = err.status();
            tracing::debug!(path, %status, error = %err, "groupcache request failed");
            Response::builder()
                .status(status)
                .body(Full::new(Bytes::from(err.to_string())))
                .expect("well-formed response")
        }
    })
}

async fn route(
    path: &str,
    prefix: &str,
    system: &CacheSystem,
) -> Result<groupcache_common::ByteView, TransportError> {
    let rest = path
        .strip_prefix(prefix)
        .ok_or_else(|| TransportError::BadRequest(format!("unexpected path: {path}")))?;

    let mut parts = rest.splitn(2, '/');
    let group_name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TransportError::BadRequest("missing group name".to_string()))?;
    let key = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TransportError::BadRequest("missing key".to_string()))?;

    let group = system
        .get_group(group_name)
        .ok_or_else(|| TransportError::GroupNotFound(group_name.to_string()))?;
    group.get(key).await.map_err(TransportError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn route_rejects_path_missing_prefix() {
        let system = CacheSystem::new();
        let err = route("/other/group/key", "/_cache/", &system).await.unwrap_err();
        assert!(matches!(err, TransportError::BadRequest(_)));
    }

    #[tokio::test]
    async fn route_rejects_missing_key() {
        let system = CacheSystem::new();
        let err = route("/_cache/group", "/_cache/", &system).await.unwrap_err();
        assert!(matches!(err, TransportError::BadRequest(_)));
    }

    #[tokio::test]
    async fn route_reports_unknown_group() {
        let system = CacheSystem::new();
        let err = route("/_cache/nope/key", "/_cache/", &system).await.unwrap_err();
        assert!(matches!(err, TransportError::GroupNotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn route_serves_a_value_from_the_loader() {
        let system = CacheSystem::new();
        system
            .new_group("g", 0, groupcache_core::FnLoader::new(|key: &str| {
                let key = key.to_string();
                async move { Ok(Bytes::from(format!("value-{key}"))) }
            }))
            .unwrap();

        let view = route("/_cache/g/k1", "/_cache/", &system).await.unwrap();
        assert_eq!(view.as_bytes(), b"value-k1");
    }
}
