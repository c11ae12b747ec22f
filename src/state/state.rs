/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Process-wide server state. Owned by the dispatcher thread and mutated
//! only there, except for [`Connections`], which the transport layer shares
//! and which is therefore mutex-guarded.

use std::collections::HashMap;
use std::os::unix::net::UnixListener;
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use parking_lot::Mutex;
use starlark_map::small_set::SmallSet;
use tracing::info;

use crate::analysis::environment::Environment;
use crate::analysis::lookup::LookupEntry;
use crate::analysis::scheduler::Scheduler;
use crate::error::store::ErrorStore;
use crate::protocol::request::TypeCheckRequest;
use crate::state::handle::Handle;

/// Registry of live transport endpoints. Shared with the accept loop and
/// guarded by the state's lock.
#[derive(Default)]
pub struct Connections {
    /// The listening socket; dropped on stop so new clients are refused.
    pub server_socket: Option<UnixListener>,
    /// Editor clients kept open across requests.
    pub persistent_clients: Vec<UnixStream>,
    /// External file-change notifiers. When any are attached, `didSave`
    /// does not re-check by itself; the notifier drives the refresh.
    pub file_notifiers: Vec<UnixStream>,
}

impl Connections {
    pub fn close(&mut self) {
        self.server_socket = None;
        self.persistent_clients.clear();
        self.file_notifiers.clear();
    }
}

pub struct ServerState {
    pub environment: Arc<dyn Environment>,
    /// Errors last reported, keyed by file handle.
    pub errors: ErrorStore,
    /// Every handle checked during this session.
    pub handles: SmallSet<Handle>,
    /// Per-document lookup tables, keyed by relative path. Populated lazily
    /// by `server::lookup::get` and removed only by `server::lookup::evict`.
    pub lookups: HashMap<String, LookupEntry>,
    pub scheduler: Scheduler,
    /// Follow-up checks queued by dependency fan-out, drained on flush.
    pub deferred_requests: Vec<TypeCheckRequest>,
    pub connections: Arc<Mutex<Connections>>,
    stopped: bool,
}

impl ServerState {
    pub fn new(environment: Arc<dyn Environment>, scheduler: Scheduler) -> Self {
        Self {
            environment,
            errors: ErrorStore::new(),
            handles: SmallSet::new(),
            lookups: HashMap::new(),
            scheduler,
            deferred_requests: Vec::new(),
            connections: Arc::new(Mutex::new(Connections::default())),
            stopped: false,
        }
    }

    /// Tear down all connections and mark the server stopped. The request
    /// loop exits after the current request completes.
    pub fn stop(&mut self, reason: &str) {
        info!("Stopping the server: {reason}");
        self.connections.lock().close();
        self.stopped = true;
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }
}
