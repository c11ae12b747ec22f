/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The server's error store: an insertion-ordered multimap from file handle
//! to the errors last reported for that file, plus the reporter that shapes
//! response payloads from it.

use starlark_map::small_map::SmallMap;

use crate::error::error::TypeError;
use crate::state::handle::Handle;

#[derive(Debug, Default)]
pub struct ErrorStore {
    errors: SmallMap<Handle, Vec<TypeError>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error, keyed by the handle of its path.
    pub fn insert(&mut self, error: TypeError) {
        let handle = error.handle();
        match self.errors.get_mut(&handle) {
            Some(errors) => errors.push(error),
            None => {
                self.errors.insert(handle, vec![error]);
            }
        }
    }

    /// Drop all errors stored for a file.
    pub fn remove(&mut self, handle: &Handle) {
        self.errors.shift_remove(handle);
    }

    pub fn get(&self, handle: &Handle) -> &[TypeError] {
        self.errors.get(handle).map_or(&[], Vec::as_slice)
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.errors.keys()
    }

    /// Every stored error, in key insertion order.
    pub fn all(&self) -> Vec<TypeError> {
        self.errors.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Group `errors` by file. The result is seeded with an empty list for
    /// each of `checked` (or for every key in the store when `checked` is
    /// absent) so that files with no remaining errors still appear and
    /// clients can clear stale diagnostics. Seed order is preserved; errors
    /// within a file keep their order in `errors`.
    pub fn file_error_map(
        &self,
        checked: Option<&[Handle]>,
        errors: &[TypeError],
    ) -> Vec<(Handle, Vec<TypeError>)> {
        let mut map: SmallMap<Handle, Vec<TypeError>> = SmallMap::new();
        match checked {
            Some(handles) => {
                for handle in handles {
                    if !map.contains_key(handle) {
                        map.insert(handle.clone(), Vec::new());
                    }
                }
            }
            None => {
                for handle in self.errors.keys() {
                    map.insert(handle.clone(), Vec::new());
                }
            }
        }
        for error in errors {
            let handle = error.handle();
            match map.get_mut(&handle) {
                Some(entries) => entries.push(error.clone()),
                None => {
                    map.insert(handle, vec![error.clone()]);
                }
            }
        }
        map.into_iter().collect()
    }
}
