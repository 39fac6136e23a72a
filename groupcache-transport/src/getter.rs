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

//! HTTP client side of [`PeerGetter`]: fetches a key from one specific
//! remote peer (spec §6, supplemented from `original_source/http.go`'s
//! `HttpGetter`).

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use groupcache_core::PeerGetter;

type HyperClient = Client<HttpConnector, Empty<Bytes>>;

/// Talks to one peer at `base_url` (e.g. `http://10.0.0.2:8001/_cache/`,
/// already including the shared path prefix).
pub struct HttpPeerGetter {
    base_url: String,
    client: HyperClient,
}

impl HttpPeerGetter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }
}

#[async_trait]
impl PeerGetter for HttpPeerGetter {
    /// `GET {base_url}{group}/{key}`; any non-200 status or transport
    /// failure is an error, recovered by the group's load pipeline falling
    /// through to the local loader (spec §4.4, §7).
    async fn get(&self, group: &str, key: &str) -> anyhow::Result<Bytes> {
        let uri: Uri = format!("{}{group}/{key}", self.base_url).parse()?;
        let req = Request::builder().method(Method::GET).uri(uri).body(Empty::<Bytes>::new())?;
        let res = self.client.request(req).await?;
        if res.status() != StatusCode::OK {
            anyhow::bail!("peer {} returned status {}", self.base_url, res.status());
        }
        let body = res.into_body().collect().await?.to_bytes();
        Ok(body)
    }
}
