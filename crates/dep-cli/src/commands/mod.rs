//! Command implementations for dep-cli

pub mod clean;
pub mod get;
pub mod list;
pub mod validate;

pub use clean::run_clean;
pub use get::run_get;
pub use list::run_list;
pub use validate::run_validate;
