//! Binding core for the native library family.
//!
//! Three cooperating pieces:
//!
//! ```text
//! caller ──▶ ComponentCell (one instance per component, lazy)
//!                 │ boot()
//!                 ▼
//!            resolver (platform naming table) ──▶ libloading
//!                 │
//!                 ▼
//!            NativeLibrary (typed symbols + encoding marshaling)
//! ```
//!
//! Component wrappers in [`crate::components`] sit on top: each owns a
//! [`NativeLibrary`], exposes typed operations, and is handed out as a shared
//! `Arc` by its [`ComponentCell`].

pub mod library;
pub mod resolver;
pub mod singleton;

pub use library::NativeLibrary;
pub use resolver::Platform;
pub use singleton::{Component, ComponentCell, ComponentConfig, DATA_DIR_ENV, LIB_DIR_ENV};

#[cfg(test)]
mod tests;
