//! Traits for abstraction and extensibility.
//!
//! This module provides the seams between the pool core and whatever
//! actually drives a browser:
//!
//! - [`Driver`]: the capability surface the pool consumes from a live
//!   browser instance.
//!
//! The pool never implements browser behavior itself; it only moves
//! drivers between the ready queue, callers, and the close path.

mod driver;

pub use driver::Driver;
