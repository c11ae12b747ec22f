/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::thread;

/// Static configuration of one server process. One server serves one
/// project root.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Absolute root the analyzed sources live under. File handles are
    /// relative to this root, and source text is read beneath it.
    pub local_root: PathBuf,
    /// Path of the Unix domain socket the server listens on.
    pub socket_path: PathBuf,
    /// Server log consumed by rage requests.
    pub log_path: Option<PathBuf>,
    pub workers: NonZeroUsize,
}

impl ServerConfig {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        let local_root = local_root.into();
        let socket_path = Self::socket_path_for(&local_root);
        Self {
            local_root,
            socket_path,
            log_path: None,
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn socket_path_for(root: &Path) -> PathBuf {
        root.join(".pyrite").join("server.sock")
    }
}
