//! # User-space Framebuffer Sessions
//!
//! A control file through which user-space drivers own virtual framebuffers.
//! A driver opens the file, describes its modes one record at a time and then
//! sets the video memory size, which registers the framebuffer. Closing the
//! session unregisters it.
//!
//! ```rust
//! use std::sync::Arc;
//! use kernel_userfb::{ModeRecord, Request, UserFb};
//! use kernel_vfb::Framebuffers;
//!
//! let file = Arc::new(UserFb::new(Arc::new(Framebuffers::default())));
//! let mut session = file.open();
//! session.handle(Request::AddMode(ModeRecord::new(320, 240, 16, 2))).unwrap();
//! session.handle(Request::SetVideoMemory(320 * 240 * 2)).unwrap();
//! assert_eq!(session.handle(Request::CurrentMode), Ok(0));
//! assert_eq!(file.count(), 1);
//!
//! drop(session);
//! assert_eq!(file.count(), 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
mod record;
mod session;

pub use error::UserFbError;
pub use record::{ModeRecord, TRANSP_ALPHA, TRANSP_NONE};
pub use session::{Request, UserFb, UserFbSession};
