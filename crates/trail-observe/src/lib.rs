pub mod errors;
pub mod exporter;
pub mod guard;
pub mod metrics;
pub mod policy;
pub mod tracing;

pub use errors::{ObserveError, ObserveResult};
pub use policy::{current_policy, set_policy, ObsPolicyView, PolicyHandle};
