/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The per-document lookup cache. `get` and `evict` are the only mutators
//! of `state.lookups`; every code path that changes the environment for a
//! file must evict that file here first.

use crate::analysis::environment::Ty;
use crate::analysis::lookup::Location;
use crate::analysis::lookup::LookupEntry;
use crate::analysis::lookup::Position;
use crate::analysis::lookup::Span;
use crate::server::config::ServerConfig;
use crate::state::handle::SourceFile;
use crate::state::state::ServerState;

/// The cached entry for `file`, building it on a miss. Build order: AST out
/// of shared memory, position index from the environment, source text from
/// the file (empty when missing). When the AST is absent nothing is
/// inserted and nothing is returned.
pub fn get<'a>(
    state: &'a mut ServerState,
    config: &ServerConfig,
    file: &SourceFile,
) -> Option<&'a LookupEntry> {
    let handle = file.handle(&config.local_root)?;
    let key = handle.as_str().to_owned();
    if !state.lookups.contains_key(&key) {
        let ast = state.environment.ast(&handle)?;
        let table = state.environment.lookup_table(&ast);
        let source = file.read(&config.local_root);
        state.lookups.insert(key.clone(), LookupEntry { table, source });
    }
    state.lookups.get(&key)
}

/// Remove the entry keyed by `file`'s relative path, if any. Idempotent.
pub fn evict(state: &mut ServerState, config: &ServerConfig, file: &SourceFile) {
    if let Some(handle) = file.handle(&config.local_root) {
        state.lookups.remove(handle.as_str());
    }
}

pub fn find_annotation(
    state: &mut ServerState,
    config: &ServerConfig,
    file: &SourceFile,
    position: Position,
) -> Option<(Span, Ty)> {
    let entry = get(state, config, file)?;
    entry.table.annotation_at(position)
}

pub fn find_definition(
    state: &mut ServerState,
    config: &ServerConfig,
    file: &SourceFile,
    position: Position,
) -> Option<Location> {
    let entry = get(state, config, file)?;
    entry.table.definition_at(position)
}
