/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Synchronous semantic queries against the environment. Failures are data:
//! every untracked type or missing definition becomes a
//! [`QueryResponse::Error`] payload, never a transport failure.

use std::iter;

use crate::analysis::environment::ClassDefinition;
use crate::analysis::environment::Environment;
use crate::analysis::environment::Ty;
use crate::analysis::environment::Untracked;
use crate::protocol::request::TypeQuery;
use crate::protocol::response::Attribute;
use crate::protocol::response::Method;
use crate::protocol::response::QueryResponse;
use crate::protocol::response::Response;
use crate::protocol::response::Signature;
use crate::protocol::response::SignatureParameter;
use crate::server::config::ServerConfig;
use crate::server::lookup;
use crate::state::handle::SourceFile;
use crate::state::state::ServerState;

struct QueryError(String);

impl From<Untracked> for QueryError {
    fn from(Untracked(name): Untracked) -> Self {
        Self(format!(
            "Type \"{name}\" was not found in the type order."
        ))
    }
}

pub fn process_type_query(
    state: &mut ServerState,
    config: &ServerConfig,
    query: TypeQuery,
) -> Response {
    let response = answer(state, config, query)
        .unwrap_or_else(|QueryError(message)| QueryResponse::Error(message));
    Response::TypeQuery(response)
}

fn answer(
    state: &mut ServerState,
    config: &ServerConfig,
    query: TypeQuery,
) -> Result<QueryResponse, QueryError> {
    let environment = &state.environment;
    match query {
        TypeQuery::Attributes(name) => {
            let class = class_definition(environment.as_ref(), &name)?;
            Ok(QueryResponse::Attributes(
                class
                    .attributes
                    .into_iter()
                    .map(|attribute| Attribute {
                        name: attribute.name,
                        annotation: attribute.annotation,
                    })
                    .collect(),
            ))
        }
        TypeQuery::Methods(name) => {
            let class = class_definition(environment.as_ref(), &name)?;
            Ok(QueryResponse::Methods(
                class
                    .methods
                    .into_iter()
                    .map(|method| Method {
                        name: method.name,
                        // The receiver is dropped and replaced by the
                        // primitive `self`, so the positional list always
                        // begins with `self`.
                        parameters: iter::once(Ty::primitive("self"))
                            .chain(method.parameters.into_iter().skip(1).map(|parameter| {
                                parameter.annotation.unwrap_or(Ty::Top)
                            }))
                            .collect(),
                        return_annotation: method.return_annotation,
                    })
                    .collect(),
            ))
        }
        TypeQuery::Join(left, right) => {
            let left = parse_tracked(environment.as_ref(), &left)?;
            let right = parse_tracked(environment.as_ref(), &right)?;
            Ok(QueryResponse::Type(environment.join(&left, &right)?))
        }
        TypeQuery::Meet(left, right) => {
            let left = parse_tracked(environment.as_ref(), &left)?;
            let right = parse_tracked(environment.as_ref(), &right)?;
            Ok(QueryResponse::Type(environment.meet(&left, &right)?))
        }
        TypeQuery::LessOrEqual(left, right) => {
            let left = parse_tracked(environment.as_ref(), &left)?;
            let right = parse_tracked(environment.as_ref(), &right)?;
            Ok(QueryResponse::Boolean(
                environment.less_or_equal(&left, &right)?,
            ))
        }
        TypeQuery::NormalizeType(expression) => Ok(QueryResponse::Type(parse_tracked(
            environment.as_ref(),
            &expression,
        )?)),
        TypeQuery::Signature(name) => {
            let overloads = environment
                .resolve_callable(&name)
                .ok_or_else(|| QueryError(format!("No signature found for {name}")))?;
            Ok(QueryResponse::Signature(
                overloads
                    .into_iter()
                    .map(|overload| Signature {
                        return_type: overload
                            .return_annotation
                            .filter(|annotation| !annotation.is_top()),
                        parameters: overload
                            .parameters
                            .into_iter()
                            .filter_map(|parameter| {
                                let name = parameter.name?;
                                Some(SignatureParameter {
                                    parameter_name: name,
                                    annotation: parameter
                                        .annotation
                                        .filter(|annotation| !annotation.is_top()),
                                })
                            })
                            .collect(),
                    })
                    .collect(),
            ))
        }
        TypeQuery::Superclasses(name) => {
            let class = class_definition(environment.as_ref(), &name)?;
            Ok(QueryResponse::Superclasses(
                state.environment.superclasses(&class.name),
            ))
        }
        TypeQuery::TypeAtLocation { path, position } => {
            let file = SourceFile::new(path.clone());
            let (_, ty) = lookup::find_annotation(state, config, &file, position).ok_or_else(
                || {
                    QueryError(format!(
                        "Not able to get lookup at {}:{position}",
                        path.display()
                    ))
                },
            )?;
            Ok(QueryResponse::Type(ty))
        }
    }
}

fn parse_tracked(environment: &dyn Environment, name: &str) -> Result<Ty, QueryError> {
    let ty = environment.parse_annotation(name)?;
    if environment.tracked(&ty) {
        Ok(ty)
    } else {
        Err(Untracked(name.to_owned()).into())
    }
}

fn class_definition(
    environment: &dyn Environment,
    name: &str,
) -> Result<ClassDefinition, QueryError> {
    let ty = parse_tracked(environment, name)?;
    environment
        .class_definition(&ty)
        .ok_or_else(|| QueryError(format!("No class definition found for {name}")))
}
