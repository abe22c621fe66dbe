pub mod arguments;
pub mod maintenance;
pub mod metrics;
pub mod panic_hook;
pub mod tracing;
