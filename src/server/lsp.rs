/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The LSP adapter: lowers raw editor messages onto native request variants
//! and assembles the JSON responses the dispatcher sends back.
//!
//! Position basis is converted here and nowhere else. The wire uses 0-based
//! lines; internally lines are 1-based. Outgoing positions are reported as
//! the environment produced them.

use std::path::Path;
use std::path::PathBuf;

use lsp_server::RequestId;
use lsp_types::DidCloseTextDocumentParams;
use lsp_types::DidOpenTextDocumentParams;
use lsp_types::DidSaveTextDocumentParams;
use lsp_types::GotoDefinitionResponse;
use lsp_types::Hover;
use lsp_types::HoverContents;
use lsp_types::MarkedString;
use lsp_types::Range;
use lsp_types::TextDocumentPositionParams;
use lsp_types::Url;
use lsp_types::notification::DidCloseTextDocument;
use lsp_types::notification::DidOpenTextDocument;
use lsp_types::notification::DidSaveTextDocument;
use lsp_types::notification::Exit;
use lsp_types::notification::Notification as _;
use lsp_types::request::GotoDefinition;
use lsp_types::request::HoverRequest;
use lsp_types::request::Request as _;
use lsp_types::request::Shutdown;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::analysis::environment::Ty;
use crate::analysis::lookup::Location;
use crate::analysis::lookup::Position;
use crate::analysis::lookup::Span;
use crate::protocol::request::ClientKind;
use crate::protocol::request::DocumentRequest;
use crate::protocol::request::Request;
use crate::state::handle::SourceFile;

pub const RAGE_METHOD: &str = "telemetry/rage";

#[derive(Debug, Deserialize)]
struct RawMessage {
    method: String,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    params: Value,
}

/// Lower one raw LSP message onto a request. Malformed messages and
/// unhandled methods are logged and produce nothing; they are never fatal.
pub fn parse(root: &Path, raw: &str) -> Option<Request> {
    let message: RawMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(error) => {
            warn!("Malformed LSP message: {error}");
            return None;
        }
    };
    let method = message.method.as_str();
    if method == GotoDefinition::METHOD {
        document_request(root, message).map(Request::GetDefinition)
    } else if method == HoverRequest::METHOD {
        document_request(root, message).map(Request::Hover)
    } else if method == DidOpenTextDocument::METHOD {
        let params: DidOpenTextDocumentParams = parse_params(message.params)?;
        Some(Request::OpenDocument(file_of_uri(
            root,
            params.text_document.uri.as_str(),
            None,
        )))
    } else if method == DidCloseTextDocument::METHOD {
        let params: DidCloseTextDocumentParams = parse_params(message.params)?;
        Some(Request::CloseDocument(file_of_uri(
            root,
            params.text_document.uri.as_str(),
            None,
        )))
    } else if method == DidSaveTextDocument::METHOD {
        let params: DidSaveTextDocumentParams = parse_params(message.params)?;
        Some(Request::SaveDocument(file_of_uri(
            root,
            params.text_document.uri.as_str(),
            params.text,
        )))
    } else if method == Shutdown::METHOD {
        message.id.map(Request::ClientShutdown)
    } else if method == Exit::METHOD {
        Some(Request::ClientExit(ClientKind::Persistent))
    } else if method == RAGE_METHOD {
        message.id.map(Request::Rage)
    } else {
        warn!("Unhandled request: {method}");
        None
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(params) => Some(params),
        Err(error) => {
            warn!("Malformed LSP parameters: {error}");
            None
        }
    }
}

fn document_request(root: &Path, message: RawMessage) -> Option<DocumentRequest> {
    let id = message.id?;
    let params: TextDocumentPositionParams = parse_params(message.params)?;
    Some(DocumentRequest {
        id,
        file: file_of_uri(root, params.text_document.uri.as_str(), None),
        position: Position::new(params.position.line + 1, params.position.character),
    })
}

/// Rewrite a document URI into a file rooted at `root`. URIs under the root
/// become relative paths; anything else passes through unchanged and fails
/// handle resolution downstream.
fn file_of_uri(root: &Path, uri: &str, content: Option<String>) -> SourceFile {
    let path = uri
        .strip_prefix("file://")
        .and_then(|path| path.strip_prefix(&format!("{}/", root.display())))
        .map(str::to_owned)
        .unwrap_or_else(|| uri.to_owned());
    SourceFile {
        path: PathBuf::from(path),
        content,
    }
}

/// One entry of a rage response: a log source and its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RageItem {
    pub title: Option<String>,
    pub data: String,
}

fn encode(id: RequestId, result: Value) -> String {
    let response = lsp_server::Response {
        id,
        result: Some(result),
        error: None,
    };
    serde_json::to_string(&response).unwrap()
}

pub fn shutdown_response(id: RequestId) -> String {
    encode(id, Value::Null)
}

pub fn definition_response(id: RequestId, root: &Path, location: Option<Location>) -> String {
    let result = match location.and_then(|location| location_to_lsp(root, location)) {
        Some(location) => GotoDefinitionResponse::Scalar(location),
        None => GotoDefinitionResponse::Array(Vec::new()),
    };
    encode(id, serde_json::to_value(result).unwrap())
}

pub fn hover_response(id: RequestId, annotation: Option<(Span, Ty)>) -> String {
    let result = match annotation {
        Some((span, ty)) => serde_json::to_value(Hover {
            contents: HoverContents::Scalar(MarkedString::String(ty.to_string())),
            range: Some(span_to_range(span)),
        })
        .unwrap(),
        None => Value::Null,
    };
    encode(id, result)
}

pub fn rage_response(id: RequestId, items: Vec<RageItem>) -> String {
    encode(id, serde_json::to_value(items).unwrap())
}

fn location_to_lsp(root: &Path, location: Location) -> Option<lsp_types::Location> {
    let uri = Url::from_file_path(root.join(&location.path)).ok()?;
    Some(lsp_types::Location {
        uri,
        range: span_to_range(location.span),
    })
}

/// Spans go out as the environment emitted them; only incoming positions
/// carry the wire's line bias.
fn span_to_range(span: Span) -> Range {
    Range {
        start: lsp_types::Position {
            line: span.start.line,
            character: span.start.column,
        },
        end: lsp_types::Position {
            line: span.stop.line,
            character: span.stop.column,
        },
    }
}
