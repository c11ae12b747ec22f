/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Work-parallel scheduler handle. The dispatcher owns one scheduler for the
//! lifetime of the server; the type-check pipeline converts it to a
//! "parallel iff the batch is large" view per request.

use std::num::NonZeroUsize;
use std::thread;

#[derive(Debug, Clone)]
pub struct Scheduler {
    workers: NonZeroUsize,
    parallel: bool,
}

impl Scheduler {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            parallel: workers.get() > 1,
        }
    }

    /// A single-worker scheduler that never fans out.
    pub fn sequential() -> Self {
        Self::new(NonZeroUsize::MIN)
    }

    /// The same worker pool with parallelism forced on or off.
    pub fn with_parallel(&self, parallel: bool) -> Self {
        Self {
            workers: self.workers,
            parallel,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel && self.workers.get() > 1
    }

    /// Map `f` over `items`, preserving order. Fans out to the worker pool
    /// only when parallel; small batches are not worth the thread traffic.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        if !self.is_parallel() || items.len() <= 1 {
            return items.into_iter().map(f).collect();
        }
        let workers = self.workers.get().min(items.len());
        let chunk_size = items.len().div_ceil(workers);
        let mut chunks: Vec<Vec<T>> = Vec::with_capacity(workers);
        let mut items = items;
        while !items.is_empty() {
            let rest = items.split_off(items.len().min(chunk_size));
            chunks.push(items);
            items = rest;
        }
        let f = &f;
        thread::scope(|scope| {
            let handles = chunks
                .into_iter()
                .map(|chunk| scope.spawn(move || chunk.into_iter().map(f).collect::<Vec<R>>()))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().expect("scheduler worker panicked"))
                .collect()
        })
    }
}
