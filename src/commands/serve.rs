/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The serve command: bind the native-protocol socket and run the request
//! loop. The embedding binary supplies the analysis engine and calls
//! [`Args::run`]; requests are dispatched strictly in arrival order on a
//! single thread, with per-client reader threads feeding one queue.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::os::unix::net::UnixListener;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context as _;
use clap::Parser;
use crossbeam_channel::Sender;
use crossbeam_channel::unbounded;
use tracing::info;

use crate::analysis::environment::Environment;
use crate::analysis::scheduler::Scheduler;
use crate::protocol::frame;
use crate::protocol::request::Request;
use crate::server::config::ServerConfig;
use crate::server::dispatch::ResponseWriter;
use crate::server::dispatch::process;
use crate::state::state::ServerState;

/// Arguments for the type server.
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Root of the project to analyze.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Unix domain socket to listen on; defaults to `<root>/.pyrite/server.sock`.
    #[arg(long)]
    pub socket: Option<PathBuf>,
    /// Server log file surfaced by rage requests.
    #[arg(long, env = "PYRITE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
    /// Worker threads for parallel parse and analysis.
    #[arg(long)]
    pub workers: Option<NonZeroUsize>,
}

impl Args {
    pub fn config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(&self.root);
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        config.log_path = self.log_file.clone();
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config
    }

    pub fn run(self, environment: Arc<dyn Environment>) -> anyhow::Result<()> {
        serve(&self.config(), environment)
    }
}

/// Run the request loop until a stop request arrives. Invalid requests and
/// non-disconnect I/O failures are fatal; the surrounding supervisor
/// restarts the server.
pub fn serve(config: &ServerConfig, environment: Arc<dyn Environment>) -> anyhow::Result<()> {
    let scheduler = Scheduler::new(config.workers);
    let mut state = ServerState::new(environment, scheduler);

    if let Some(parent) = config.socket_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if config.socket_path.exists() {
        fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("binding {}", config.socket_path.display()))?;
    state.connections.lock().server_socket = Some(listener.try_clone()?);
    info!("Listening on {}", config.socket_path.display());

    let (request_sender, request_receiver) = unbounded::<(Request, UnixStream)>();
    thread::spawn(move || accept_clients(listener, request_sender));

    for (request, mut stream) in request_receiver {
        match process(&mut stream, &mut state, config, request)? {
            Some(response) => {
                if let Err(error) = stream.write_response(&response) {
                    if frame::is_disconnect(&error) {
                        info!("Client disconnected before the response was written: {error}");
                    } else {
                        return Err(error.into());
                    }
                }
            }
            None => {}
        }
        if state.stopped() {
            break;
        }
    }

    let _ = fs::remove_file(&config.socket_path);
    Ok(())
}

fn accept_clients(listener: UnixListener, sender: Sender<(Request, UnixStream)>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let sender = sender.clone();
                thread::spawn(move || read_requests(stream, sender));
            }
            Err(error) => {
                info!("Stopped accepting clients: {error}");
                break;
            }
        }
    }
}

fn read_requests(mut stream: UnixStream, sender: Sender<(Request, UnixStream)>) {
    loop {
        match frame::read_frame::<_, Request>(&mut stream) {
            Ok(request) => {
                let Ok(reply) = stream.try_clone() else {
                    break;
                };
                if sender.send((request, reply)).is_err() {
                    break;
                }
            }
            Err(error) => {
                if error.kind() != io::ErrorKind::UnexpectedEof {
                    info!("Dropping client: {error}");
                }
                break;
            }
        }
    }
}
