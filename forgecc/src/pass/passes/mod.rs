//! Concrete IR→IR transformations (spec §4.E). Each function here is a raw
//! `fn(&mut Function) -> Result<()>` that callers wrap into a [`super::PassFn`]
//! via [`super::PassManager::register_pass`]; they're also exposed directly
//! so tests and ad-hoc pipelines can run one pass without going through a
//! manager. Every pass here is idempotent: running it twice in a row leaves
//! the IR unchanged by the second run (spec §4.E, §8 invariant 4).

mod constprop;
mod cse;
mod dce;
mod licm;
mod peephole;

pub use constprop::constant_propagation;
pub use cse::common_subexpression_elimination;
pub use dce::dead_code_elimination;
pub use licm::loop_invariant_code_motion;
pub use peephole::peephole;
