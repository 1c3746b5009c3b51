//! `forgecc`: a retargetable low-level assembler and code-generation core.
//!
//! A front-end builds a typed IR [`Function`](ir::Function) through the
//! builder API in [`ir`], runs it through an [`OptLevel`](pass::OptLevel)-gated
//! [`PassManager`](pass::PassManager) pipeline, lowers it with a cost-ranked
//! [`Selector`](select::Selector) against a registered [`TargetDescriptor`](target::TargetDescriptor),
//! allocates registers with [`LinearScanAllocator`](regalloc::LinearScanAllocator),
//! and emits bytes (optionally as a relocatable object container) with an
//! [`Emitter`](emit::Emitter). None of this spans a thread boundary on its
//! own; see the module docs under each submodule for the exact contract.

pub mod analysis;
pub mod config;
pub mod diag;
pub mod emit;
pub mod error;
pub mod ir;
pub mod pass;
pub mod regalloc;
pub mod select;
pub mod target;
pub mod types;

pub use error::{Error, Result};
