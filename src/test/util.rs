/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Test utilities: an in-memory environment that can be seeded per test and
//! records every mutation the pipeline drives through it.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::analysis::ast::Ast;
use crate::analysis::environment::ClassDefinition;
use crate::analysis::environment::Environment;
use crate::analysis::environment::Overload;
use crate::analysis::environment::Ty;
use crate::analysis::environment::Untracked;
use crate::analysis::lookup::Location;
use crate::analysis::lookup::LookupTable;
use crate::analysis::lookup::Position;
use crate::analysis::lookup::Span;
use crate::analysis::scheduler::Scheduler;
use crate::error::error::TypeError;
use crate::server::config::ServerConfig;
use crate::state::handle::Handle;
use crate::state::handle::Qualifier;
use crate::state::handle::SourceFile;
use crate::state::state::ServerState;

pub fn ty(name: &str) -> Ty {
    Ty::primitive(name)
}

pub fn span(start: (u32, u32), stop: (u32, u32)) -> Span {
    Span::new(
        Position::new(start.0, start.1),
        Position::new(stop.0, stop.1),
    )
}

pub fn error(path: &str, description: &str) -> TypeError {
    TypeError::new(path, 9, span((1, 0), (1, 1)), description)
}

pub fn annotation_table(entries: &[(Span, Ty)]) -> LookupTable {
    LookupTable::new(entries.to_vec(), Vec::new())
}

pub fn definition_table(entries: &[(Span, Location)]) -> LookupTable {
    LookupTable::new(Vec::new(), entries.to_vec())
}

pub fn test_state(environment: Arc<TestEnvironment>) -> ServerState {
    ServerState::new(environment, Scheduler::sequential())
}

pub fn test_config(root: impl AsRef<Path>) -> ServerConfig {
    ServerConfig::new(root.as_ref())
}

/// What the test parser produces for one module.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    pub defines: Vec<String>,
    pub table: LookupTable,
}

#[derive(Default)]
struct Inner {
    tracked: HashSet<Ty>,
    joins: HashMap<(Ty, Ty), Ty>,
    meets: HashMap<(Ty, Ty), Ty>,
    subtypes: HashSet<(Ty, Ty)>,
    classes: HashMap<Ty, ClassDefinition>,
    superclasses: HashMap<Ty, Vec<Ty>>,
    callables: HashMap<String, Vec<Overload>>,
    dependents: HashMap<Qualifier, Vec<Handle>>,
    modules: HashMap<Qualifier, Handle>,
    asts: HashMap<Handle, Arc<Ast>>,
    tables: HashMap<Handle, LookupTable>,
    parse_plan: HashMap<Handle, ParsedModule>,
    analysis_plan: HashMap<Handle, Vec<TypeError>>,
    // Observation log.
    parsed: Vec<Handle>,
    populated: Vec<Handle>,
    protocols_inferred: Vec<Handle>,
    ignores_registered: Vec<Handle>,
    purged: Vec<Handle>,
    purged_defines: Vec<String>,
    analyzed: Vec<Handle>,
    analyzed_parallel: Vec<bool>,
    attribute_cache_clears: usize,
    gc_runs: usize,
}

/// An in-memory semantic database. Seeding methods take `&self` so a test
/// can keep its `Arc` and adjust the world between requests.
#[derive(Default)]
pub struct TestEnvironment {
    inner: Mutex<Inner>,
}

impl TestEnvironment {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // Seeding.

    pub fn track(&self, ty: Ty) {
        self.inner.lock().tracked.insert(ty);
    }

    pub fn add_class(&self, class: ClassDefinition) {
        let mut inner = self.inner.lock();
        inner.tracked.insert(class.name.clone());
        inner.classes.insert(class.name.clone(), class);
    }

    pub fn set_superclasses(&self, ty: Ty, superclasses: Vec<Ty>) {
        self.inner.lock().superclasses.insert(ty, superclasses);
    }

    pub fn add_join(&self, left: Ty, right: Ty, result: Ty) {
        let mut inner = self.inner.lock();
        inner
            .joins
            .insert((left.clone(), right.clone()), result.clone());
        inner.joins.insert((right, left), result);
    }

    pub fn add_meet(&self, left: Ty, right: Ty, result: Ty) {
        let mut inner = self.inner.lock();
        inner
            .meets
            .insert((left.clone(), right.clone()), result.clone());
        inner.meets.insert((right, left), result);
    }

    pub fn add_subtype(&self, subtype: Ty, supertype: Ty) {
        self.inner.lock().subtypes.insert((subtype, supertype));
    }

    pub fn add_callable(&self, name: &str, overloads: Vec<Overload>) {
        self.inner.lock().callables.insert(name.to_owned(), overloads);
    }

    pub fn add_dependent(&self, qualifier: Qualifier, dependent: Handle) {
        self.inner
            .lock()
            .dependents
            .entry(qualifier)
            .or_default()
            .push(dependent);
    }

    /// Make a module parseable: the next `parse_sources` over its file will
    /// produce this AST and lookup table.
    pub fn add_parseable(&self, handle: Handle, module: ParsedModule) {
        self.inner.lock().parse_plan.insert(handle, module);
    }

    /// Install a module as if it had been parsed earlier in the session.
    pub fn set_ast(&self, handle: Handle, module: ParsedModule) {
        let mut inner = self.inner.lock();
        let qualifier = handle.qualifier();
        inner.asts.insert(
            handle.clone(),
            Arc::new(Ast::new(handle.clone(), module.defines)),
        );
        inner.tables.insert(handle.clone(), module.table);
        inner.modules.entry(qualifier).or_insert(handle);
    }

    pub fn plan_errors(&self, handle: Handle, errors: Vec<TypeError>) {
        self.inner.lock().analysis_plan.insert(handle, errors);
    }

    // Observations.

    pub fn parsed(&self) -> Vec<Handle> {
        self.inner.lock().parsed.clone()
    }

    pub fn populated(&self) -> Vec<Handle> {
        self.inner.lock().populated.clone()
    }

    pub fn protocols_inferred(&self) -> Vec<Handle> {
        self.inner.lock().protocols_inferred.clone()
    }

    pub fn ignores_registered(&self) -> Vec<Handle> {
        self.inner.lock().ignores_registered.clone()
    }

    pub fn purged(&self) -> Vec<Handle> {
        self.inner.lock().purged.clone()
    }

    pub fn purged_defines(&self) -> Vec<String> {
        self.inner.lock().purged_defines.clone()
    }

    pub fn analyzed(&self) -> Vec<Handle> {
        self.inner.lock().analyzed.clone()
    }

    pub fn analyzed_parallel(&self) -> Vec<bool> {
        self.inner.lock().analyzed_parallel.clone()
    }

    pub fn attribute_cache_clears(&self) -> usize {
        self.inner.lock().attribute_cache_clears
    }

    pub fn gc_runs(&self) -> usize {
        self.inner.lock().gc_runs
    }

    pub fn has_ast(&self, handle: &Handle) -> bool {
        self.inner.lock().asts.contains_key(handle)
    }
}

impl Environment for TestEnvironment {
    fn parse_annotation(&self, expression: &str) -> Result<Ty, Untracked> {
        Ok(Ty::primitive(expression))
    }

    fn tracked(&self, ty: &Ty) -> bool {
        self.inner.lock().tracked.contains(ty)
    }

    fn join(&self, left: &Ty, right: &Ty) -> Result<Ty, Untracked> {
        let inner = self.inner.lock();
        for operand in [left, right] {
            if !inner.tracked.contains(operand) {
                return Err(Untracked(operand.to_string()));
            }
        }
        Ok(inner
            .joins
            .get(&(left.clone(), right.clone()))
            .cloned()
            .unwrap_or_else(|| if left == right { left.clone() } else { Ty::Top }))
    }

    fn meet(&self, left: &Ty, right: &Ty) -> Result<Ty, Untracked> {
        let inner = self.inner.lock();
        for operand in [left, right] {
            if !inner.tracked.contains(operand) {
                return Err(Untracked(operand.to_string()));
            }
        }
        Ok(inner
            .meets
            .get(&(left.clone(), right.clone()))
            .cloned()
            .unwrap_or_else(|| if left == right { left.clone() } else { Ty::Top }))
    }

    fn less_or_equal(&self, left: &Ty, right: &Ty) -> Result<bool, Untracked> {
        let inner = self.inner.lock();
        for operand in [left, right] {
            if !inner.tracked.contains(operand) {
                return Err(Untracked(operand.to_string()));
            }
        }
        Ok(left == right || inner.subtypes.contains(&(left.clone(), right.clone())))
    }

    fn class_definition(&self, ty: &Ty) -> Option<ClassDefinition> {
        self.inner.lock().classes.get(ty).cloned()
    }

    fn superclasses(&self, ty: &Ty) -> Vec<Ty> {
        self.inner.lock().superclasses.get(ty).cloned().unwrap_or_default()
    }

    fn resolve_callable(&self, name: &str) -> Option<Vec<Overload>> {
        self.inner.lock().callables.get(name).cloned()
    }

    fn dependents_of(&self, qualifier: &Qualifier) -> Vec<Handle> {
        self.inner
            .lock()
            .dependents
            .get(qualifier)
            .cloned()
            .unwrap_or_default()
    }

    fn module_handle(&self, qualifier: &Qualifier) -> Option<Handle> {
        self.inner.lock().modules.get(qualifier).cloned()
    }

    fn ast(&self, handle: &Handle) -> Option<Arc<Ast>> {
        self.inner.lock().asts.get(handle).cloned()
    }

    fn remove_asts(&self, handles: &[Handle]) {
        let mut inner = self.inner.lock();
        for handle in handles {
            inner.asts.remove(handle);
            inner.tables.remove(handle);
        }
    }

    fn purge(&self, handles: &[Handle]) {
        let mut inner = self.inner.lock();
        inner.purged.extend(handles.iter().cloned());
        let purged: HashSet<&Handle> = handles.iter().collect();
        inner.modules.retain(|_, handle| !purged.contains(handle));
    }

    fn parse_sources(
        &self,
        scheduler: &Scheduler,
        files: &[SourceFile],
        root: &Path,
    ) -> anyhow::Result<Vec<Handle>> {
        let handles: Vec<Handle> = files
            .iter()
            .filter_map(|file| file.handle(root))
            .collect();
        let parseable: Vec<Handle> = scheduler
            .map(handles, |handle| {
                let inner = self.inner.lock();
                inner.parse_plan.contains_key(&handle).then_some(handle)
            })
            .into_iter()
            .flatten()
            .collect();
        let mut inner = self.inner.lock();
        for handle in &parseable {
            let module = inner.parse_plan.get(handle).cloned().unwrap_or_default();
            inner.asts.insert(
                handle.clone(),
                Arc::new(Ast::new(handle.clone(), module.defines)),
            );
            inner.tables.insert(handle.clone(), module.table);
            inner
                .modules
                .entry(handle.qualifier())
                .or_insert_with(|| handle.clone());
            inner.parsed.push(handle.clone());
        }
        Ok(parseable)
    }

    fn populate(&self, handles: &[Handle]) {
        self.inner.lock().populated.extend(handles.iter().cloned());
    }

    fn infer_protocols(&self, handles: &[Handle]) {
        self.inner
            .lock()
            .protocols_inferred
            .extend(handles.iter().cloned());
    }

    fn register_ignores(&self, handles: &[Handle]) {
        self.inner
            .lock()
            .ignores_registered
            .extend(handles.iter().cloned());
    }

    fn clear_attribute_caches(&self) {
        self.inner.lock().attribute_cache_clears += 1;
    }

    fn purge_resolution_memo(&self, defines: &[String]) {
        self.inner
            .lock()
            .purged_defines
            .extend(defines.iter().cloned());
    }

    fn collect_garbage(&self) {
        self.inner.lock().gc_runs += 1;
    }

    fn analyze(&self, scheduler: &Scheduler, handles: &[Handle]) -> anyhow::Result<Vec<TypeError>> {
        {
            let mut inner = self.inner.lock();
            let parallel = scheduler.is_parallel();
            inner.analyzed.extend(handles.iter().cloned());
            inner.analyzed_parallel.push(parallel);
        }
        Ok(scheduler
            .map(handles.to_vec(), |handle| {
                self.inner
                    .lock()
                    .analysis_plan
                    .get(&handle)
                    .cloned()
                    .unwrap_or_default()
            })
            .into_iter()
            .flatten()
            .collect())
    }

    fn lookup_table(&self, ast: &Ast) -> LookupTable {
        self.inner
            .lock()
            .tables
            .get(ast.handle())
            .cloned()
            .unwrap_or_default()
    }
}
