//! Lifecycle Controller
//!
//! ```text
//! GeneratorConfig ─▶ plan ─▶ register ─▶ start updater ─▶ serve ─▶ drain ─▶ stop updater
//! ```
//!
//! Registration happens once, before any updater task or HTTP connection
//! exists; a duplicate name aborts startup.

mod lifecycle;
mod plan;

pub use lifecycle::Generator;
pub use plan::{fixed_plan, plan_for, random_plan, FamilyPlan, RANDOM_COUNT_LIMIT};
