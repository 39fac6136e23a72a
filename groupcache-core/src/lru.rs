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

//! A bounded, byte-accounted LRU store.
//!
//! The recency order is an intrusive doubly linked list threaded through
//! heap-allocated nodes (the same `NonNull`-and-`Box::into_raw` technique the
//! teacher's cache tiers use for their eviction containers), indexed by a
//! `key -> NonNull<Node>` hash map for O(1) promote/evict. Unlike the
//! teacher's generic cache, entries here carry no external reference count:
//! `get`/`add` always return an owned, cloned value, so a node is either in
//! the store or it isn't.

use std::ptr::NonNull;

use hashbrown::HashMap;

/// Bytes charged for one entry: `key.weight() + value.weight()`.
pub trait Weighted {
    fn weight(&self) -> usize;
}

impl Weighted for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Weighted for groupcache_common::ByteView {
    fn weight(&self) -> usize {
        self.len()
    }
}

struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
}

/// Bounded, byte-accounted, recency-ordered key/value store.
///
/// `max_bytes == 0` disables the bound entirely (the eviction loop never
/// runs). Not concurrency-safe on its own — callers serialize access with
/// their own lock, exactly as `cache.go`'s `sync.Mutex` does in the upstream
/// reference.
pub struct LruStore<K, V, F = Box<dyn FnMut(&K, &V) + Send>>
where
    K: std::hash::Hash + Eq + Weighted,
    V: Weighted,
{
    map: HashMap<K, NonNull<Node<K, V>>>,
    /// most-recently-used end
    head: Option<NonNull<Node<K, V>>>,
    /// least-recently-used end
    tail: Option<NonNull<Node<K, V>>>,
    used_bytes: usize,
    max_bytes: usize,
    on_evict: Option<F>,
}

// SAFETY: all raw-pointer access happens behind `&mut self`; nothing escapes
// the store, so it is safe to move/share across threads under an external
// lock, same justification foyer gives `GenericCacheEntry`.
unsafe impl<K, V, F> Send for LruStore<K, V, F>
where
    K: std::hash::Hash + Eq + Weighted + Send,
    V: Weighted + Send,
    F: Send,
{
}

impl<K, V, F> LruStore<K, V, F>
where
    K: std::hash::Hash + Eq + Weighted + Clone,
    V: Weighted + Clone,
    F: FnMut(&K, &V),
{
    pub fn new(max_bytes: usize) -> Self {
        Self::with_evict_hook(max_bytes, None)
    }

    pub fn with_evict_hook(max_bytes: usize, on_evict: Option<F>) -> Self {
        Self {
            map: HashMap::new(),
            head: None,
            tail: None,
            used_bytes: 0,
            max_bytes,
            on_evict,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn usage(&self) -> usize {
        self.used_bytes
    }

    pub fn capacity(&self) -> usize {
        self.max_bytes
    }

    /// Looks up `key`, promoting it to most-recently-used on hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let ptr = *self.map.get(key)?;
        self.move_to_front(ptr);
        Some(unsafe { ptr.as_ref().value.clone() })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or overwrites `key`. Promotes to most-recently-used, then
    /// evicts least-recently-used entries while `usage() > capacity()`.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&ptr) = self.map.get(&key) {
            let old_weight = unsafe { ptr.as_ref().value.weight() };
            let new_weight = value.weight();
            unsafe {
                (*ptr.as_ptr()).value = value;
            }
            self.used_bytes = self.used_bytes + new_weight - old_weight;
            self.move_to_front(ptr);
        } else {
            let charge = key.weight() + value.weight();
            let node = Box::new(Node {
                key: key.clone(),
                value,
                prev: None,
                next: self.head,
            });
            let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(node)) };
            if let Some(mut head) = self.head {
                unsafe { head.as_mut().prev = Some(ptr) };
            }
            self.head = Some(ptr);
            if self.tail.is_none() {
                self.tail = Some(ptr);
            }
            self.map.insert(key, ptr);
            self.used_bytes += charge;
        }

        self.evict_to_capacity();
        #[cfg(feature = "strict_assertions")]
        self.assert_invariants();
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let ptr = self.map.remove(key)?;
        self.unlink(ptr);
        let node = unsafe { Box::from_raw(ptr.as_ptr()) };
        self.used_bytes -= node.key.weight() + node.value.weight();
        #[cfg(feature = "strict_assertions")]
        self.assert_invariants();
        Some(node.value)
    }

    /// Checks the invariants spec.md §3 states for the LRU entry: every
    /// key in the map has exactly one position in the recency order, and
    /// the byte budget holds unless unbounded. Walks the whole list, so
    /// it's gated behind `strict_assertions` rather than always on.
    #[cfg(feature = "strict_assertions")]
    fn assert_invariants(&self) {
        let mut seen = 0usize;
        let mut cur = self.head;
        while let Some(ptr) = cur {
            seen += 1;
            cur = unsafe { ptr.as_ref().next };
        }
        assert_eq!(seen, self.map.len(), "recency order and map disagree on entry count");
        assert!(
            self.max_bytes == 0 || self.used_bytes <= self.max_bytes,
            "used_bytes {} exceeds max_bytes {}",
            self.used_bytes,
            self.max_bytes
        );
    }

    fn evict_to_capacity(&mut self) {
        if self.max_bytes == 0 {
            return;
        }
        while self.used_bytes > self.max_bytes {
            let Some(tail) = self.tail else { break };
            self.unlink(tail);
            let node = unsafe { Box::from_raw(tail.as_ptr()) };
            self.map.remove(&node.key);
            self.used_bytes -= node.key.weight() + node.value.weight();
            if let Some(hook) = self.on_evict.as_mut() {
                hook(&node.key, &node.value);
            }
        }
    }

    fn move_to_front(&mut self, ptr: NonNull<Node<K, V>>) {
        if self.head == Some(ptr) {
            return;
        }
        self.unlink(ptr);
        unsafe {
            (*ptr.as_ptr()).prev = None;
            (*ptr.as_ptr()).next = self.head;
        }
        if let Some(mut head) = self.head {
            unsafe { head.as_mut().prev = Some(ptr) };
        }
        self.head = Some(ptr);
        if self.tail.is_none() {
            self.tail = Some(ptr);
        }
    }

    /// Detaches `ptr` from the linked list without freeing it.
    fn unlink(&mut self, ptr: NonNull<Node<K, V>>) {
        let (prev, next) = unsafe { (ptr.as_ref().prev, ptr.as_ref().next) };
        match prev {
            Some(mut prev) => unsafe { prev.as_mut().next = next },
            None => self.head = next,
        }
        match next {
            Some(mut next) => unsafe { next.as_mut().prev = prev },
            None => self.tail = prev,
        }
    }
}

impl<K, V, F> Drop for LruStore<K, V, F>
where
    K: std::hash::Hash + Eq + Weighted,
    V: Weighted,
{
    fn drop(&mut self) {
        let mut cur = self.head;
        while let Some(ptr) = cur {
            let node = unsafe { Box::from_raw(ptr.as_ptr()) };
            cur = node.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_bytes: usize) -> LruStore<String, String> {
        LruStore::new(max_bytes)
    }

    #[test]
    fn add_then_get_promotes_to_mru() {
        let mut s = store(0);
        s.add("k1".into(), "v1".into());
        assert_eq!(s.get(&"k1".to_string()), Some("v1".to_string()));
    }

    #[test]
    fn eviction_order_matches_spec_scenario_1() {
        // capacity = len("k1")+len("v1")+len("k2")+len("v2")
        let mut s = store(2 + 2 + 2 + 2);
        s.add("k1".into(), "v1".into());
        s.add("k2".into(), "v2".into());
        s.get(&"k1".to_string());
        s.add("k3".into(), "v3".into());

        assert!(s.get(&"k2".to_string()).is_none(), "k2 should have been evicted");
        assert_eq!(s.get(&"k1".to_string()), Some("v1".to_string()));
        assert_eq!(s.get(&"k3".to_string()), Some("v3".to_string()));
    }

    #[test]
    fn unbounded_when_max_bytes_is_zero() {
        let mut s = store(0);
        for i in 0..1000 {
            s.add(format!("k{i}"), "v".repeat(64));
        }
        assert_eq!(s.len(), 1000);
    }

    #[test]
    fn overwrite_updates_byte_accounting() {
        let mut s = store(0);
        s.add("k".into(), "v".into());
        assert_eq!(s.usage(), 1 + 1);
        s.add("k".into(), "value".into());
        assert_eq!(s.usage(), 1 + 5);
    }

    #[test]
    fn oversize_insert_is_accepted_then_evicted() {
        let mut s: LruStore<String, String> = LruStore::new(4);
        s.add("k".into(), "toobig".into()); // weight 1 + 6 = 7 > 4
        assert!(s.get(&"k".to_string()).is_none());
        assert_eq!(s.usage(), 0);
    }

    #[test]
    fn on_evict_hook_is_invoked() {
        use std::sync::{Arc, Mutex};
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let evicted_clone = evicted.clone();
        let mut s: LruStore<String, String, _> =
            LruStore::with_evict_hook(4, Some(move |k: &String, _v: &String| {
                evicted_clone.lock().unwrap().push(k.clone());
            }));
        s.add("a".into(), "a".into());
        s.add("b".into(), "b".into());
        s.add("c".into(), "cc".into());
        assert_eq!(*evicted.lock().unwrap(), vec!["a".to_string()]);
    }
}
