//! # Virtual Framebuffer Platform Configuration
//!
//! This crate is the single source of truth for the compile-time constants
//! shared by the virtual framebuffer crates: the page granularity of backing
//! stores, the size of the device table, and the defaults of the user-space
//! transport.
//!
//! ## Overview
//!
//! ```text
//! kernel-info ──┬──> kernel-fbmem   (page size, memory budget)
//!               ├──> kernel-vfb     (table capacity)
//!               └──> kernel-userfb  (default mode table length)
//! ```
//!
//! Runtime configuration (capacity, memory budget, page translation) lives in
//! `kernel_vfb::VfbConfig`, whose [`Default`] implementation is derived from
//! the constants below.
//!
//! ## Invariants
//! * [`PAGE_SIZE`](memory::PAGE_SIZE) is a power of two.
//! * The default memory budget is a whole number of pages.
//! * The device table holds at least one slot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod display;
pub mod memory;
