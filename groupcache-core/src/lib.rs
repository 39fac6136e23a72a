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

//! Core of groupcache: a bounded LRU store, a consistent-hash ring, a
//! single-flight coalescer, and the `Group` pipeline that composes them into
//! a distributed read path. Transports (HTTP or otherwise) plug in through
//! the [`Loader`], [`PeerPicker`], and [`PeerGetter`] traits; this crate has
//! no knowledge of any wire format.

pub mod config;
pub mod group;
pub mod loader;
pub mod lru;
pub mod peer;
pub mod registry;
pub mod ring;
pub mod singleflight;

pub use config::{GroupBuilder, GroupConfig};
pub use group::Group;
pub use groupcache_common::{ByteView, GroupCacheError, Result};
pub use loader::{FnLoader, Loader};
pub use peer::{PeerGetter, PeerPicker};
pub use registry::{get_group, new_group, CacheSystem};
pub use ring::Ring;
