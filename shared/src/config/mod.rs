//! Configuration types shared by the pipeline components.

pub mod retention;

pub use retention::{RetentionError, RetentionPolicy, DEFAULT_TTL_DAYS, MAX_TTL_DAYS};
