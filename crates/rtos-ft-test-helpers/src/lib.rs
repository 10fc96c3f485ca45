//! Shared test utilities for rtos-ft.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`assertions`] - Assertion macros for dispositions and dispatcher state
//! - [`tracking`] - Allocation tracking for the report path
//! - [`mock`] - Recording handlers, sinks, clocks and reset controllers
//! - [`fixtures`] - Ready-made fault events
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! rtos-ft-test-helpers = { path = "crates/rtos-ft-test-helpers" }
//! ```
//!
//! ```rust,ignore
//! use rtos_ft_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod assertions;
pub mod fixtures;
pub mod must;
pub mod prelude;

#[cfg(feature = "tracking")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracking")))]
pub mod tracking;

#[cfg(feature = "mock")]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

pub use must::{must, must_some};
