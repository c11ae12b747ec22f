/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The request dispatcher: one exhaustive match from request variant to
//! handler, threading the server state through and emitting at most one
//! response per request. Requests are handled strictly in arrival order.

use std::fs;
use std::io;
use std::io::Write;
use std::mem;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::protocol::frame;
use crate::protocol::request::Request;
use crate::protocol::request::TypeCheckRequest;
use crate::protocol::response::Response;
use crate::server::check;
use crate::server::config::ServerConfig;
use crate::server::lookup;
use crate::server::lsp;
use crate::server::lsp::RageItem;
use crate::server::query;
use crate::state::state::ServerState;

/// How much of the server log a rage response carries.
const RAGE_LOG_TAIL_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The transport layer let through a request the dispatcher must never
    /// see. Fatal to the current request loop.
    #[error("request `{0}` cannot be dispatched")]
    InvalidRequest(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Where a response frame can be written back to. Any `Write` qualifies;
/// the server uses the client's socket, tests use a buffer.
pub trait ResponseWriter {
    fn write_response(&mut self, response: &Response) -> io::Result<()>;
}

impl<W: Write> ResponseWriter for W {
    fn write_response(&mut self, response: &Response) -> io::Result<()> {
        frame::write_frame(self, response)
    }
}

/// Handle one request against the server state, returning the response to
/// send, if any. `socket` is the requesting client's connection; only the
/// stop handler writes to it directly.
pub fn process(
    socket: &mut dyn ResponseWriter,
    state: &mut ServerState,
    config: &ServerConfig,
    request: Request,
) -> Result<Option<Response>, ServerError> {
    let kind = request.kind();
    let start = Instant::now();
    let result = dispatch(socket, state, config, request);
    debug!(
        target: "pyrite::perf",
        request = kind,
        ms = start.elapsed().as_millis() as u64,
        "processed request"
    );
    result
}

fn dispatch(
    socket: &mut dyn ResponseWriter,
    state: &mut ServerState,
    config: &ServerConfig,
    request: Request,
) -> Result<Option<Response>, ServerError> {
    match request {
        Request::TypeCheck(request) => {
            // Re-checking allocates heavily in shared memory; compact first.
            state.environment.collect_garbage();
            Ok(Some(check::process_type_check(state, config, request)?))
        }
        Request::TypeQuery(type_query) => {
            Ok(Some(query::process_type_query(state, config, type_query)))
        }
        Request::DisplayTypeErrors(files) => {
            let response = if files.is_empty() {
                let all = state.errors.all();
                state.errors.file_error_map(None, &all)
            } else {
                let handles: Vec<_> = files
                    .iter()
                    .filter_map(|file| file.handle(&config.local_root))
                    .collect();
                let errors: Vec<_> = handles
                    .iter()
                    .flat_map(|handle| state.errors.get(handle))
                    .cloned()
                    .collect();
                state.errors.file_error_map(Some(&handles), &errors)
            };
            Ok(Some(Response::type_check(response)))
        }
        Request::FlushTypeErrors => {
            // Drain the deferred FIFO iteratively; a long backlog must not
            // grow the stack.
            let deferred = mem::take(&mut state.deferred_requests);
            for request in deferred {
                process(socket, state, config, Request::TypeCheck(request))?;
            }
            let all = state.errors.all();
            Ok(Some(Response::type_check(
                state.errors.file_error_map(None, &all),
            )))
        }
        Request::Stop => {
            if let Err(error) = socket.write_response(&Response::Stop) {
                info!("Failed to write stop response: {error}");
            }
            state.stop("explicit request");
            Ok(None)
        }
        Request::LanguageServerProtocol(raw) => {
            match lsp::parse(&config.local_root, &raw) {
                Some(request) => process(socket, state, config, request),
                None => Ok(None),
            }
        }
        Request::ClientShutdown(id) => Ok(Some(Response::LanguageServerProtocol(
            lsp::shutdown_response(id),
        ))),
        Request::ClientExit(client) => {
            info!("Client of kind {client:?} exited");
            Ok(Some(Response::ClientExit(client)))
        }
        Request::Rage(id) => {
            let items = rage_items(config);
            Ok(Some(Response::LanguageServerProtocol(lsp::rage_response(
                id, items,
            ))))
        }
        Request::GetDefinition(request) => {
            let location = lookup::find_definition(state, config, &request.file, request.position);
            Ok(Some(Response::LanguageServerProtocol(
                lsp::definition_response(request.id, &config.local_root, location),
            )))
        }
        Request::Hover(request) => {
            let annotation = lookup::find_annotation(state, config, &request.file, request.position);
            Ok(Some(Response::LanguageServerProtocol(lsp::hover_response(
                request.id, annotation,
            ))))
        }
        Request::OpenDocument(file) => {
            // Re-prime the cache for the newly opened document.
            lookup::evict(state, config, &file);
            lookup::get(state, config, &file);
            Ok(None)
        }
        Request::CloseDocument(file) => {
            lookup::evict(state, config, &file);
            Ok(None)
        }
        Request::SaveDocument(file) => {
            lookup::evict(state, config, &file);
            // The critical section covers only the registry read; the
            // re-check must not run while holding the connections lock.
            let notifiers_attached = !state.connections.lock().file_notifiers.is_empty();
            if notifiers_attached {
                // The external notifier drives the refresh.
                Ok(None)
            } else {
                let request = TypeCheckRequest::new(vec![file.clone()], vec![file]);
                Ok(Some(check::process_type_check(state, config, request)?))
            }
        }
        Request::ClientConnection => Err(ServerError::InvalidRequest("client_connection")),
    }
}

/// Diagnostic log items for a rage response: the tail of the server log.
fn rage_items(config: &ServerConfig) -> Vec<RageItem> {
    let Some(path) = &config.log_path else {
        return Vec::new();
    };
    match fs::read_to_string(path) {
        Ok(data) => {
            let mut start = data.len().saturating_sub(RAGE_LOG_TAIL_BYTES);
            while !data.is_char_boundary(start) {
                start += 1;
            }
            vec![RageItem {
                title: Some(path.display().to_string()),
                data: data[start..].to_owned(),
            }]
        }
        Err(error) => {
            warn!("Unable to read server log for rage: {error}");
            Vec::new()
        }
    }
}
