/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Responses produced by the dispatcher. Each maps to one frame on the
//! native protocol; LSP payloads travel as pre-serialized JSON strings.

use serde::Deserialize;
use serde::Serialize;

use crate::analysis::environment::Ty;
use crate::error::error::TypeError;
use crate::protocol::request::ClientKind;
use crate::state::handle::Handle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    TypeCheck(Vec<FileErrors>),
    TypeQuery(QueryResponse),
    LanguageServerProtocol(String),
    Stop,
    ClientExit(ClientKind),
}

impl Response {
    /// Wrap a reporter-shaped file→errors map.
    pub fn type_check(map: Vec<(Handle, Vec<TypeError>)>) -> Self {
        Self::TypeCheck(
            map.into_iter()
                .map(|(handle, errors)| FileErrors { handle, errors })
                .collect(),
        )
    }
}

/// The errors currently attributed to one checked file. An empty list is
/// meaningful: it tells the client to clear stale diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileErrors {
    pub handle: Handle,
    pub errors: Vec<TypeError>,
}

/// Payload of a type-query response. User-visible failures are data, not
/// transport errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResponse {
    Attributes(Vec<Attribute>),
    Methods(Vec<Method>),
    Type(Ty),
    Boolean(bool),
    Superclasses(Vec<Ty>),
    Signature(Vec<Signature>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub annotation: Ty,
}

/// A method as reported by the `Methods` query: positional parameter types
/// beginning with the primitive `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub parameters: Vec<Ty>,
    pub return_annotation: Ty,
}

/// One overload reported by the `Signature` query. Unknown annotations are
/// omitted rather than reported as `Top`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub return_type: Option<Ty>,
    pub parameters: Vec<SignatureParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureParameter {
    pub parameter_name: String,
    pub annotation: Option<Ty>,
}
