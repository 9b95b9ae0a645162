//! # In-Memory Log Sink
//!
//! The framebuffer crates report through the [`log`] facade. This crate
//! provides the sink: a [`log::Log`] implementation that keeps the most
//! recent records in a fixed-size ring so they can be inspected after the
//! fact (diagnostics endpoints, post-mortem dumps, tests asserting that a
//! misuse was reported).
//!
//! ## Output Mechanism
//! ```text
//! error!/warn!/info!/... (any crate)
//!     ↓
//! log facade (global max level)
//!     ↓
//! KernelLogger::log  ── level filter
//!     ↓
//! RwSpinLock<VecDeque<LogLine>>  (oldest dropped at capacity)
//!     ↓
//! records() / take() / clear()
//! ```
//!
//! ## Feature System
//!
//! ### `enabled` Feature (default)
//! Records are formatted and stored.
//!
//! When disabled, [`KernelLogger::log`](log::Log::log) returns immediately
//! and the ring stays empty, so release builds pay only for the level check.
//!
//! ## Usage
//! ```rust
//! use kernel_log::KernelLogger;
//! use log::LevelFilter;
//!
//! let logger = KernelLogger::init(LevelFilter::Debug).unwrap();
//! log::warn!(target: "vfb", "table is full");
//! assert!(logger.records().iter().any(|r| r.message == "table is full"));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod logger;

pub use logger::{KernelLogger, LOG_CAPACITY, LogLine};
