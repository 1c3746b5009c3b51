//! The target registry (spec §4.J): a process-wide name → descriptor
//! mapping. Unlike the pass manager (owned by the compilation session,
//! spec §9), the registry is meant to be built once by the driver at
//! startup and treated read-only afterwards, so every other session can
//! safely share a `&TargetRegistry` (spec §5 "the target registry is
//! read-only from that point and may be safely shared"). `forgecc` does not
//! impose a global `static` for this (spec §9 "make both init/teardown
//! explicit, with the driver owning the lifetimes"): the driver constructs
//! one `TargetRegistry` value and owns it for the process lifetime.

use super::{TargetContext, TargetDescriptor};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Builds a fresh [`TargetDescriptor`] instance on demand. A factory rather
/// than a stored descriptor value, since each [`TargetContext`] needs its own
/// descriptor to own (descriptors are `Send` but not `Clone`, and a backend
/// may stash per-instance data even though the documented contract keeps
/// `TargetDescriptor` methods `&self`-only).
pub type DescriptorFactory = Box<dyn Fn() -> Box<dyn TargetDescriptor> + Send + Sync>;

#[derive(Default)]
pub struct TargetRegistry {
    factories: HashMap<String, DescriptorFactory>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        TargetRegistry { factories: HashMap::new() }
    }

    /// Register a target under `name`; fails with `DuplicateName` if already
    /// registered (spec §4.J).
    pub fn register_target(&mut self, name: impl Into<String>, factory: DescriptorFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::duplicate_name(format!("target '{name}'")));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn get_target_by_name(&self, name: &str) -> Option<Box<dyn TargetDescriptor>> {
        self.factories.get(name).map(|f| f())
    }

    pub fn get_all_targets(&self) -> Vec<Box<dyn TargetDescriptor>> {
        self.factories.values().map(|f| f()).collect()
    }

    pub fn has_feature(desc: &dyn TargetDescriptor, name: &str) -> bool {
        desc.features().contains(name)
    }

    /// Build a fresh descriptor for `name` and wrap it in a [`TargetContext`]
    /// (spec §4.J `create_context(desc) -> ctx`).
    pub fn create_context(&self, name: &str) -> Result<TargetContext> {
        let factory = self.factories.get(name).ok_or_else(|| Error::unknown_name(format!("target '{name}'")))?;
        TargetContext::new(factory())
    }

    /// Explicit teardown hook mirroring spec §4.J's `destroy_context`; in
    /// Rust the context's own `Drop` impl already runs `finalize`, so this is
    /// just taking ownership to end its lifetime early and deliberately.
    pub fn destroy_context(&self, ctx: TargetContext) {
        drop(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::x86_64::X86_64Target;

    fn x86_factory() -> DescriptorFactory {
        Box::new(|| Box::new(X86_64Target::new()) as Box<dyn TargetDescriptor>)
    }

    #[test]
    fn duplicate_target_name_rejected() {
        let mut reg = TargetRegistry::new();
        reg.register_target("x86_64", x86_factory()).unwrap();
        let err = reg.register_target("x86_64", x86_factory()).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(_)));
    }

    #[test]
    fn unknown_target_reported() {
        let reg = TargetRegistry::new();
        let err = reg.create_context("made_up").unwrap_err();
        assert!(matches!(err, Error::UnknownName(_)));
    }

    #[test]
    fn create_context_round_trip() {
        let mut reg = TargetRegistry::new();
        reg.register_target("x86_64", x86_factory()).unwrap();
        let ctx = reg.create_context("x86_64").unwrap();
        assert_eq!(ctx.descriptor().name(), "x86_64");
        assert_eq!(reg.get_all_targets().len(), 1);
        assert!(TargetRegistry::has_feature(reg.get_target_by_name("x86_64").unwrap().as_ref(), "sse2"));
    }
}
