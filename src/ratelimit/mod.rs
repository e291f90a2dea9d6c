//! Admission control logic and per-client window state.

mod limiter;
mod registry;
mod rule;
mod window;

pub use limiter::{AdmissionController, Decision};
pub use registry::ClientRegistry;
pub use rule::{Rule, RuleStore};
pub use window::ClientWindow;
