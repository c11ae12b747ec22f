/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Requests accepted by the dispatcher. Native-protocol clients send these
//! directly over the framed socket; LSP clients send raw JSON wrapped in
//! [`Request::LanguageServerProtocol`], which the adapter lowers onto the
//! same variants.

use std::path::PathBuf;

use lsp_server::RequestId;
use serde::Deserialize;
use serde::Serialize;

use crate::analysis::lookup::Position;
use crate::state::handle::SourceFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    TypeCheck(TypeCheckRequest),
    TypeQuery(TypeQuery),
    DisplayTypeErrors(Vec<SourceFile>),
    FlushTypeErrors,
    Stop,
    /// A raw LSP message; the adapter decides whether it maps to a request.
    LanguageServerProtocol(String),
    ClientShutdown(RequestId),
    ClientExit(ClientKind),
    Rage(RequestId),
    GetDefinition(DocumentRequest),
    Hover(DocumentRequest),
    OpenDocument(SourceFile),
    CloseDocument(SourceFile),
    SaveDocument(SourceFile),
    /// Accepted by the wire type but illegal inside the dispatcher; the
    /// transport layer consumes it at accept time.
    ClientConnection,
}

impl Request {
    /// Stable name used for perf events and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeCheck(..) => "type_check",
            Self::TypeQuery(..) => "type_query",
            Self::DisplayTypeErrors(..) => "display_type_errors",
            Self::FlushTypeErrors => "flush_type_errors",
            Self::Stop => "stop",
            Self::LanguageServerProtocol(..) => "language_server_protocol",
            Self::ClientShutdown(..) => "client_shutdown",
            Self::ClientExit(..) => "client_exit",
            Self::Rage(..) => "rage",
            Self::GetDefinition(..) => "get_definition",
            Self::Hover(..) => "hover",
            Self::OpenDocument(..) => "open_document",
            Self::CloseDocument(..) => "close_document",
            Self::SaveDocument(..) => "save_document",
            Self::ClientConnection => "client_connection",
        }
    }
}

/// Incremental re-check: re-read `update_environment_with` into the
/// environment, then re-analyze `check`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCheckRequest {
    pub update_environment_with: Vec<SourceFile>,
    pub check: Vec<SourceFile>,
}

impl TypeCheckRequest {
    pub fn new(update_environment_with: Vec<SourceFile>, check: Vec<SourceFile>) -> Self {
        Self {
            update_environment_with,
            check,
        }
    }

    /// A re-analysis pass with no environment update, as queued by the
    /// dependency fan-out.
    pub fn check_only(check: Vec<SourceFile>) -> Self {
        Self {
            update_environment_with: Vec::new(),
            check,
        }
    }
}

/// An LSP-originated request against one document position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: RequestId,
    pub file: SourceFile,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientKind {
    Basic,
    Persistent,
}

/// Synchronous semantic queries answered against the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeQuery {
    Attributes(String),
    Methods(String),
    Join(String, String),
    Meet(String, String),
    LessOrEqual(String, String),
    NormalizeType(String),
    Signature(String),
    Superclasses(String),
    TypeAtLocation { path: PathBuf, position: Position },
}
