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

use std::fmt;

use bytes::Bytes;

/// An immutable, length-known view over cached bytes.
///
/// Cheap to clone (`Bytes` is reference-counted internally); the underlying
/// storage is never mutated once constructed. Callers that need an owned,
/// independently-mutable buffer should use [`ByteView::to_vec`], which always
/// returns a fresh copy.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteView {
    b: Bytes,
}

impl ByteView {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { b: bytes.into() }
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Borrow the underlying bytes without copying.
    pub fn as_bytes(&self) -> &[u8] {
        &self.b
    }

    /// Defensive copy. Mutating the returned buffer never affects this view
    /// or any other clone of it.
    pub fn to_vec(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.b)
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView").field("len", &self.len()).finish()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for ByteView {
    fn from(v: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(v))
    }
}

impl From<String> for ByteView {
    fn from(v: String) -> Self {
        Self::new(v.into_bytes())
    }
}
