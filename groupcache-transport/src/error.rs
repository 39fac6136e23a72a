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

//! Maps core errors (and transport-only errors the core never produces) onto
//! HTTP statuses (spec §6 wire note: "HTTP status != 200 is an error"; §7:
//! `GroupNotFound` "from the transport layer; not produced by the core").

use groupcache_common::GroupCacheError;
use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("no such group: {0}")]
    GroupNotFound(String),
    #[error(transparent)]
    Core(#[from] GroupCacheError),
}

impl TransportError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::GroupNotFound(_) => StatusCode::NOT_FOUND,
            Self::Core(GroupCacheError::EmptyKey) => StatusCode::BAD_REQUEST,
            Self::Core(GroupCacheError::GroupNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(GroupCacheError::LoaderFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(GroupCacheError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
