//! The pass manager (spec §4.D): modules, named passes, named pipelines,
//! level gating, and `run`. Grounded on `cranelift-codegen::context::Context`
//! as "the thing that drives a compilation session's pipeline over one
//! function", generalised from a single hard-coded pipeline into the spec's
//! dynamically registered modules/passes/pipelines.

pub mod passes;

use crate::error::{Error, Result};
use crate::ir::Function;
use std::collections::HashMap;

/// Optimisation level gating a pass (spec §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    O0,
    O1,
    O2,
    O3,
    /// Optimise for size. Bypasses `min_level` gating entirely (§4.D,
    /// §9 Open Question #2): a `size`-level run executes every enabled pass
    /// regardless of its `min_level`.
    Size,
}

/// A named collaborator a pass may belong to, with optional lifecycle hooks
/// run once at registration / at manager teardown.
pub struct Module {
    pub name: String,
    finalize: Option<Box<dyn FnMut() + Send>>,
}

/// The run function a pass executes over one function.
pub type PassFn = Box<dyn FnMut(&mut Function) -> Result<()> + Send>;

/// A named transformation with a minimum optimisation level gate.
pub struct Pass {
    pub name: String,
    pub description: String,
    pub min_level: OptLevel,
    pub enabled: bool,
    pub module: Option<String>,
    run: PassFn,
}

/// A snapshot of a pass as captured into a pipeline (spec §4.D
/// `add_pass_to_pipeline`, §9 Open Question #1: pipelines are self-contained
/// once built, so later `enable()` calls on the source pass do not affect
/// entries already added).
struct PipelineEntry {
    pass_name: String,
    enabled: bool,
    min_level: OptLevel,
}

/// A named ordered list of pipeline entries.
pub struct Pipeline {
    pub name: String,
    entries: Vec<PipelineEntry>,
}

/// Owns registered modules, passes, and pipelines for the duration of a
/// compilation session (spec §4.D, §5 "the pass manager is owned by the
/// compilation session handle"). Exactly one instance is meant to exist per
/// session; nothing here is process-global (unlike the target registry),
/// matching spec §9's resolution to make the manager's lifetime explicit
/// rather than a hidden singleton.
pub struct PassManager {
    modules: HashMap<String, Module>,
    passes: HashMap<String, Pass>,
    pipelines: HashMap<String, Pipeline>,
    active_pipeline: Option<String>,
    opt_level: OptLevel,
}

impl PassManager {
    pub fn new() -> Self {
        PassManager {
            modules: HashMap::new(),
            passes: HashMap::new(),
            pipelines: HashMap::new(),
            active_pipeline: None,
            opt_level: OptLevel::O0,
        }
    }

    pub fn register_module(
        &mut self,
        name: impl Into<String>,
        init: Option<Box<dyn FnOnce() + Send>>,
        finalize: Option<Box<dyn FnMut() + Send>>,
    ) -> Result<()> {
        let name = name.into();
        if self.modules.contains_key(&name) {
            return Err(Error::duplicate_name(format!("module '{name}'")));
        }
        if let Some(init) = init {
            init();
        }
        self.modules.insert(name.clone(), Module { name, finalize });
        Ok(())
    }

    pub fn register_pass(
        &mut self,
        module: Option<&str>,
        name: impl Into<String>,
        description: impl Into<String>,
        run: PassFn,
        min_level: OptLevel,
    ) -> Result<()> {
        let name = name.into();
        if self.passes.contains_key(&name) {
            return Err(Error::duplicate_name(format!("pass '{name}'")));
        }
        if let Some(m) = module {
            if !self.modules.contains_key(m) {
                return Err(Error::unknown_name(format!("module '{m}'")));
            }
        }
        self.passes.insert(
            name.clone(),
            Pass {
                name,
                description: description.into(),
                min_level,
                enabled: true,
                module: module.map(str::to_string),
                run,
            },
        );
        Ok(())
    }

    pub fn enable(&mut self, pass: &str, enabled: bool) -> Result<()> {
        self.passes
            .get_mut(pass)
            .map(|p| p.enabled = enabled)
            .ok_or_else(|| Error::unknown_name(format!("pass '{pass}'")))
    }

    pub fn create_pipeline(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.pipelines.contains_key(&name) {
            return Err(Error::duplicate_name(format!("pipeline '{name}'")));
        }
        self.pipelines.insert(name.clone(), Pipeline { name, entries: Vec::new() });
        Ok(())
    }

    /// Append a *snapshot* of `pass`'s current `enabled`/`min_level` to
    /// `pipeline`. Subsequent `enable()` calls on the pass do not alter this
    /// entry (spec §4.D, §9 Open Question #1).
    pub fn add_pass_to_pipeline(&mut self, pipeline: &str, pass: &str) -> Result<()> {
        let p = self.passes.get(pass).ok_or_else(|| Error::unknown_name(format!("pass '{pass}'")))?;
        let entry = PipelineEntry { pass_name: p.name.clone(), enabled: p.enabled, min_level: p.min_level };
        let pl = self
            .pipelines
            .get_mut(pipeline)
            .ok_or_else(|| Error::unknown_name(format!("pipeline '{pipeline}'")))?;
        pl.entries.push(entry);
        Ok(())
    }

    pub fn set_pipeline(&mut self, name: &str) -> Result<()> {
        if !self.pipelines.contains_key(name) {
            return Err(Error::unknown_name(format!("pipeline '{name}'")));
        }
        self.active_pipeline = Some(name.to_string());
        Ok(())
    }

    pub fn get_pipeline(&self) -> Option<&str> {
        self.active_pipeline.as_deref()
    }

    pub fn set_opt_level(&mut self, level: OptLevel) {
        self.opt_level = level;
    }

    pub fn get_opt_level(&self) -> OptLevel {
        self.opt_level
    }

    /// Run the active pipeline over `function`, in registration order,
    /// skipping entries with `enabled == false` or (outside `size` level)
    /// `min_level > current_level`. Aborts and reports the failing pass's
    /// name on the first failure (spec §4.D "Failure model").
    pub fn run(&mut self, function: &mut Function) -> Result<()> {
        let pipeline_name = self
            .active_pipeline
            .clone()
            .ok_or_else(|| Error::unknown_name("no active pipeline set"))?;
        let pipeline = self
            .pipelines
            .get(&pipeline_name)
            .ok_or_else(|| Error::unknown_name(format!("pipeline '{pipeline_name}'")))?;

        let level = self.opt_level;
        for entry in &pipeline.entries {
            if !entry.enabled {
                continue;
            }
            if level != OptLevel::Size && entry.min_level > level {
                continue;
            }
            let pass = self
                .passes
                .get_mut(&entry.pass_name)
                .ok_or_else(|| Error::unknown_name(format!("pass '{}'", entry.pass_name)))?;
            log::debug!("running pass '{}'", pass.name);
            (pass.run)(function).map_err(|e| {
                Error::internal(format!("pass '{}' failed: {e}", pass.name))
            })?;
        }
        Ok(())
    }

    /// Tear the manager down, running each registered module's finalizer in
    /// registration order (spec §4.D "finalize() tears it down").
    pub fn finalize(mut self) {
        let mut modules: Vec<&mut Module> = self.modules.values_mut().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        for m in modules {
            if let Some(f) = &mut m.finalize {
                f();
            }
        }
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Function};
    use crate::types::TypeWord;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_pass(counter: Arc<AtomicU32>) -> PassFn {
        Box::new(move |_f| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn pipeline_gates_by_min_level() {
        // scenario 4: three passes with min_level 1,2,3; level=2 runs 1&2
        // only; level=Size runs all three.
        let mut mgr = PassManager::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));
        for (name, lvl) in [("p1", OptLevel::O1), ("p2", OptLevel::O2), ("p3", OptLevel::O3)] {
            let order = order.clone();
            mgr.register_pass(
                None,
                name,
                "",
                Box::new(move |_f| {
                    order.lock().unwrap().push(name);
                    Ok(())
                }),
                lvl,
            )
            .unwrap();
        }
        mgr.create_pipeline("pipe").unwrap();
        mgr.add_pass_to_pipeline("pipe", "p1").unwrap();
        mgr.add_pass_to_pipeline("pipe", "p2").unwrap();
        mgr.add_pass_to_pipeline("pipe", "p3").unwrap();
        mgr.set_pipeline("pipe").unwrap();
        mgr.set_opt_level(OptLevel::O2);

        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        f.append_block("entry");
        mgr.run(&mut f).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["p1", "p2"]);

        order.lock().unwrap().clear();
        mgr.set_opt_level(OptLevel::Size);
        mgr.run(&mut f).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn pipeline_is_a_snapshot_of_enabled_state() {
        let mut mgr = PassManager::new();
        let counter = Arc::new(AtomicU32::new(0));
        mgr.register_pass(None, "p", "", counting_pass(counter.clone()), OptLevel::O0).unwrap();
        mgr.create_pipeline("pipe").unwrap();
        mgr.add_pass_to_pipeline("pipe", "p").unwrap();
        mgr.enable("p", false).unwrap();
        mgr.set_pipeline("pipe").unwrap();

        let mut f = Function::new(FuncId::new(0), "f", TypeWord::VOID);
        f.append_block("entry");
        mgr.run(&mut f).unwrap();
        // the pipeline captured `enabled=true` at add-time; disabling the
        // source pass afterwards must not affect the already-added entry.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_pass_name_rejected() {
        let mut mgr = PassManager::new();
        mgr.register_pass(None, "p", "", Box::new(|_| Ok(())), OptLevel::O0).unwrap();
        let err = mgr.register_pass(None, "p", "", Box::new(|_| Ok(())), OptLevel::O0).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(_)));
    }
}
