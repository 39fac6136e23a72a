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

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by the cache core.
///
/// `GroupNotFound` is never constructed here — it belongs to the transport
/// layer, which maps it onto an HTTP status. It is listed so that transports
/// can fold their own error enum into this one without inventing a second
/// taxonomy.
#[derive(Error, Debug, Clone)]
pub enum GroupCacheError {
    #[error("key is required")]
    EmptyKey,

    #[error("no such group: {0}")]
    GroupNotFound(String),

    #[error("loader failed: {0}")]
    LoaderFailed(#[source] Arc<anyhow::Error>),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GroupCacheError {
    pub fn loader(err: anyhow::Error) -> Self {
        Self::LoaderFailed(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GroupCacheError>;
