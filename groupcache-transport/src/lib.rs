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

//! HTTP transport for groupcache: the external collaborator spec.md §1
//! treats as out of scope for the core, implementing the informative wire
//! format from spec.md §6 over `hyper`.
//!
//! - [`server::serve`] exposes every group in a [`groupcache_core::CacheSystem`]
//!   at `/<prefix>/<group>/<key>`.
//! - [`HttpPeerGetter`] implements `groupcache_core::PeerGetter` as an HTTP
//!   client.
//! - [`HttpPool`] implements `groupcache_core::PeerPicker` by routing
//!   through a consistent-hash ring of peer addresses.

pub mod error;
pub mod getter;
pub mod pool;
pub mod server;

pub use error::TransportError;
pub use getter::HttpPeerGetter;
pub use pool::{HttpPool, DEFAULT_PATH_PREFIX, DEFAULT_REPLICAS};
pub use server::{serve, serve_on};
