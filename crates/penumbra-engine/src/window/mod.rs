//! Window and event loop.
//!
//! Owns the `winit` event loop and the single window, creates the device
//! against it and dispatches events to a [`crate::core::App`].

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
