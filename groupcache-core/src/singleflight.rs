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

//! Single-flight coalescer: collapses concurrent duplicate loads for the
//! same key into one execution, fanning the shared result out to every
//! waiter (mirrors `singleflight.go` in the upstream reference, reshaped
//! around `tokio::sync::oneshot` the way the teacher's `GenericCache::entry`
//! queues one receiver per concurrent miss).
//!
//! The thunk for the owning caller runs on a detached `tokio::spawn`ed task
//! rather than inline in `do_once`'s own future: per spec §5, a cancelled
//! caller must not abort the in-flight thunk other waiters depend on, only
//! stop waiting on it locally. Dropping the owner's `do_once` future drops
//! its `JoinHandle`, which detaches from the task without aborting it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Default grace period before a completed flight's record is forgotten,
/// matching the Go reference's `time.Sleep(time.Second * 10)`.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Returned to a waiter whose flight never published a result because the
/// owning task was aborted or panicked before completing the thunk.
#[derive(Debug, Clone, thiserror::Error)]
#[error("single-flight call did not complete: owning task was cancelled or panicked")]
pub struct FlightFailed;

enum CallState<T> {
    InFlight(Vec<oneshot::Sender<T>>),
    Done(T),
}

struct Call<T> {
    state: Mutex<CallState<T>>,
}

/// Cleans up an abandoned flight if dropped before `complete` runs: clears
/// the in-flight record (dropping every waiter's sender, which turns their
/// `rx.await` into an error) and removes the dead entry from the map so the
/// next caller starts a fresh flight instead of waiting on nothing.
struct CallGuard<T> {
    inflight: Arc<Mutex<HashMap<String, Arc<Call<T>>>>>,
    key: String,
    call: Arc<Call<T>>,
    done: bool,
}

impl<T: Clone> CallGuard<T> {
    fn complete(&mut self, result: T) -> Vec<oneshot::Sender<T>> {
        self.done = true;
        let mut state = self.call.state.lock();
        match std::mem::replace(&mut *state, CallState::Done(result)) {
            CallState::InFlight(waiters) => waiters,
            CallState::Done(_) => unreachable!("a flight publishes its result exactly once"),
        }
    }
}

impl<T> Drop for CallGuard<T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut map = self.inflight.lock();
        if let Some(current) = map.get(&self.key) {
            if Arc::ptr_eq(current, &self.call) {
                map.remove(&self.key);
            }
        }
        drop(map);
        let mut state = self.call.state.lock();
        if let CallState::InFlight(waiters) = std::mem::replace(&mut *state, CallState::InFlight(Vec::new())) {
            drop(waiters); // each sender's drop turns a waiter's `rx.await` into an error
        }
    }
}

/// De-duplicates concurrent `do_once` calls for the same key.
///
/// Cheap to clone: internally `Arc`-backed, so a coalescer can be shared with
/// the grace-period cleanup task spawned for every completed flight without
/// the caller needing to wrap it in its own `Arc`.
pub struct Coalescer<T> {
    inflight: Arc<Mutex<HashMap<String, Arc<Call<T>>>>>,
    grace: Duration,
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            inflight: self.inflight.clone(),
            grace: self.grace,
        }
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            grace,
        }
    }

    /// Number of keys currently in flight or within their grace window.
    pub fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `thunk` at most once across all callers whose `do_once` calls for
    /// `key` overlap in time; every such caller observes the same result.
    ///
    /// Returns `Err(FlightFailed)` only if the owning task is aborted or
    /// panics before the thunk publishes a result -- dropping the owner's
    /// own `do_once` future does not do this (see module docs); it just
    /// stops that one caller from waiting, exactly as spec §5 requires.
    pub async fn do_once<F, Fut>(&self, key: &str, thunk: F) -> Result<T, FlightFailed>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = T> + Send + 'static,
    {
        let (call, is_owner) = {
            let mut map = self.inflight.lock();
            if let Some(call) = map.get(key) {
                (call.clone(), false)
            } else {
                let call = Arc::new(Call {
                    state: Mutex::new(CallState::InFlight(Vec::new())),
                });
                map.insert(key.to_string(), call.clone());
                (call, true)
            }
        };

        if !is_owner {
            let rx = {
                let mut state = call.state.lock();
                match &mut *state {
                    CallState::Done(v) => return Ok(v.clone()),
                    CallState::InFlight(waiters) => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        rx
                    }
                }
            };
            return rx.await.map_err(|_| FlightFailed);
        }

        let coalescer = self.clone();
        let owned_key = key.to_string();
        let inflight = self.inflight.clone();
        let task_call = call.clone();
        let handle = tokio::spawn(async move {
            let mut guard = CallGuard {
                inflight,
                key: owned_key.clone(),
                call: task_call.clone(),
                done: false,
            };
            let result = thunk().await;
            let waiters = guard.complete(result.clone());
            for tx in waiters {
                let _ = tx.send(result.clone());
            }
            coalescer.schedule_forget(owned_key, task_call);
            result
        });

        handle.await.map_err(|_| FlightFailed)
    }

    /// Immediately drops the record for `key`, regardless of grace period.
    pub fn forget(&self, key: &str) {
        self.inflight.lock().remove(key);
    }

    fn schedule_forget(&self, key: String, call: Arc<Call<T>>) {
        let inflight = self.inflight.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut map = inflight.lock();
            if let Some(current) = map.get(&key) {
                if Arc::ptr_eq(current, &call) {
                    map.remove(&key);
                }
            }
        });
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
