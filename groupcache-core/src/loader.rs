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

//! The user-supplied callback that fills a key absent from every node's
//! cache, usually backed by a slower store (spec §6 `Loader`).

use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait Loader: Send + Sync + 'static {
    /// Must be referentially transparent for the duration of one
    /// `Group::get` flight: the single-flight coalescer may run this exactly
    /// once for a burst of concurrent misses on the same key.
    async fn load(&self, key: &str) -> anyhow::Result<Bytes>;
}

/// Adapts a plain async closure into a [`Loader`], mirroring the Go
/// reference's `GetterFunc`.
pub struct FnLoader<F>(F);

impl<F, Fut> FnLoader<F>
where
    F: Fn(&str) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Bytes>> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(&str) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Bytes>> + Send,
{
    async fn load(&self, key: &str) -> anyhow::Result<Bytes> {
        (self.0)(key).await
    }
}
