/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The incremental type-check pipeline: purge what changed, re-parse it,
//! repopulate the environment, re-analyze what the client asked about, and
//! queue the transitive dependents for the next flush.
//!
//! Per-file parse failures are absorbed (the file simply does not contribute
//! to repopulation); analyzer findings come back as error records. Only
//! scheduler and shared-memory failures escape as `Err`.

use std::path::PathBuf;

use dupe::Dupe;
use itertools::Itertools;
use starlark_map::small_set::SmallSet;
use tracing::debug;

use crate::protocol::request::TypeCheckRequest;
use crate::protocol::response::Response;
use crate::server::config::ServerConfig;
use crate::server::lookup;
use crate::state::handle::Handle;
use crate::state::handle::SourceFile;
use crate::state::state::ServerState;

/// A re-check of more than this many files fans out to the worker pool.
const PARALLEL_THRESHOLD: usize = 5;

pub fn process_type_check(
    state: &mut ServerState,
    config: &ServerConfig,
    request: TypeCheckRequest,
) -> anyhow::Result<Response> {
    let TypeCheckRequest {
        update_environment_with,
        check,
    } = request;
    let environment = state.environment.dupe();

    // Attribute memo tables are derived state; drop them before anything
    // else observes a half-updated environment.
    environment.clear_attribute_caches();

    let scheduler = state.scheduler.with_parallel(check.len() > PARALLEL_THRESHOLD);

    // Queue dependents of the updated modules for the next flush. Files the
    // client explicitly asked about are served now, not deferred.
    let check_handles: Vec<Handle> = check
        .iter()
        .filter_map(|file| file.handle(&config.local_root))
        .collect();
    if !update_environment_with.is_empty() {
        let checked: SmallSet<Handle> = check_handles.iter().cloned().collect();
        let mut dependents: SmallSet<Handle> = SmallSet::new();
        for file in &update_environment_with {
            if let Some(handle) = file.handle(&config.local_root) {
                for dependent in environment.dependents_of(&handle.qualifier()) {
                    if !checked.contains(&dependent) {
                        dependents.insert(dependent);
                    }
                }
            }
        }
        if !dependents.is_empty() {
            debug!("Deferring type check of {} dependents", dependents.len());
            state.deferred_requests.push(TypeCheckRequest::check_only(
                dependents
                    .iter()
                    .map(|handle| SourceFile::new(PathBuf::from(handle.as_str())))
                    .collect(),
            ));
        }
    }

    // Purge the updated modules from shared memory and drop their cached
    // lookup tables before the environment changes underneath them.
    let update_handles: Vec<Handle> = update_environment_with
        .iter()
        .filter_map(|file| file.handle(&config.local_root))
        .collect();
    environment.remove_asts(&update_handles);
    environment.purge(&update_handles);
    for file in &update_environment_with {
        lookup::evict(state, config, file);
    }

    // Stubs parse first so that a shadowed source never wins the qualifier.
    let (stubs, sources): (Vec<SourceFile>, Vec<SourceFile>) = update_environment_with
        .into_iter()
        .partition(SourceFile::is_stub);
    let mut repopulate_handles =
        environment.parse_sources(&scheduler, &stubs, &config.local_root)?;
    let sources: Vec<SourceFile> = sources
        .into_iter()
        .filter(|file| match file.handle(&config.local_root) {
            Some(handle) => match environment.module_handle(&handle.qualifier()) {
                Some(canonical) => canonical == handle,
                None => true,
            },
            None => false,
        })
        .collect();
    repopulate_handles.extend(environment.parse_sources(&scheduler, &sources, &config.local_root)?);
    if !repopulate_handles.is_empty() {
        debug!(
            "Repopulating the environment for {}",
            repopulate_handles.iter().join(", ")
        );
    }

    environment.populate(&repopulate_handles);
    environment.infer_protocols(&repopulate_handles);
    environment.register_ignores(&repopulate_handles);

    // A re-checked module's top-level defines may now resolve differently;
    // their memoized resolutions are stale.
    let mut defines: Vec<String> = Vec::new();
    for handle in &check_handles {
        if let Some(ast) = environment.ast(handle) {
            defines.extend(ast.defines().iter().cloned());
        }
    }
    environment.purge_resolution_memo(&defines);

    let new_errors = environment.analyze(&scheduler, &check_handles)?;

    for handle in &check_handles {
        state.errors.remove(handle);
    }
    for error in &new_errors {
        state.errors.insert(error.clone());
    }

    // Seed the response with every checked file so clients see empty lists
    // for files whose errors all went away.
    let response = state.errors.file_error_map(Some(&check_handles), &new_errors);

    for handle in check_handles {
        state.handles.insert(handle);
    }
    Ok(Response::type_check(response))
}
