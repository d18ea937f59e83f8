pub mod meta;
pub mod tracing;
