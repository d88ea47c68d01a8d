//! Command modules for the tvm CLI.
//!
//! Commands are the only layer that decides whether an outcome is reported
//! and the process carries on, or the error is returned to `main`.
//!
//! - [`list`] - List every release version in the catalog
//! - [`install`] - Install the newest release matching the project constraint
//! - [`exec`] - Delegate to the newest installed match

pub mod exec;
pub mod install;
pub mod list;
