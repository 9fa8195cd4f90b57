//! Built-in component implementations.
//!
//! The stock set covers the three component roles the controller is
//! exercised with: a leaf source (`static_value`), a processor
//! (`transform`), and an exporter that mirrors state into an external system
//! (`rule_sync`).

mod rule_sync;
mod static_value;
mod transform;

pub use rule_sync::RuleSync;
pub use static_value::StaticValue;
pub use transform::Transform;
