//! # Virtual Framebuffers
//!
//! Memory-backed display surfaces for panels that cannot be mapped directly,
//! such as displays behind a serial or USB transport. A driver registers the
//! modes it supports; this crate allocates the pixel memory, lets consumers
//! map it page by page, negotiates geometry changes against the mode table
//! and forwards driver-specific commands. The driver decides when to push
//! pixels to the real hardware.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Framebuffers                        │
//! │  register / open / release / unregister / dispatch       │
//! │  map / check_geometry / set_geometry / set_color_register│
//! └───────┬──────────────────┬───────────────────┬───────────┘
//!         │                  │                   │
//! ┌───────▼───────┐  ┌───────▼────────┐  ┌───────▼─────────┐
//! │   Registry    │  │     Device     │  │   negotiate()   │
//! │ fixed slots   │  │ modes, store,  │  │ pure, no state  │
//! │ RW spin lock  │  │ barrier, count │  │                 │
//! └───────────────┘  └───────┬────────┘  └─────────────────┘
//!                            │
//!                    ┌───────▼────────┐
//!                    │  BackingStore  │  (kernel-fbmem)
//!                    └────────────────┘
//! ```
//!
//! ## Lifetime of a device
//!
//! `register` publishes a device as present. Consumers `open` and `release`
//! it any number of times. `unregister` marks it absent, waits for running
//! commands to drain, and destroys it unless it is still open; in that case
//! the last `release` destroys it. Identities carry a slot generation, so a
//! handle to a destroyed device never reaches the slot's next occupant.
//!
//! ## Usage
//! ```rust
//! use std::sync::Arc;
//! use kernel_vfb::{Command, CommandRequest, Descriptor, Framebuffers, Geometry, Mode, Visual};
//!
//! let fbs = Framebuffers::default();
//! let modes = [
//!     Mode::new(640, 480, 8, Visual::PseudoColor),
//!     Mode::new(800, 600, 16, Visual::TrueColor),
//! ];
//! let echo = |req: CommandRequest<'_>| -> Result<u64, i32> { Ok(req.command.argument) };
//! let id = fbs
//!     .register(Descriptor::new(800 * 600 * 2, &modes).with_handler(Arc::new(echo)))
//!     .unwrap();
//!
//! fbs.open(id).unwrap();
//! let mode = fbs.set_geometry(id, Geometry::new(800, 600, 16)).unwrap();
//! assert_eq!(mode.index, 1);
//! assert_eq!(fbs.dispatch(id, Command::new(1, 42)), Ok(42));
//!
//! fbs.unregister(id).unwrap();
//! fbs.release(id).unwrap();
//! assert_eq!(fbs.stats().destroyed, 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod command;
mod config;
mod device;
mod display;
mod error;
mod layout;
mod lifecycle;
mod mode;
mod negotiate;
mod registry;
pub mod service;
mod surface;

pub use command::{Command, CommandHandler, CommandRequest, DriverContext};
pub use config::VfbConfig;
pub use device::{DeviceId, Presence};
pub use display::{BufferKind, Color, DisplayInfo, FixedInfo, ScreenInfo};
pub use error::VfbError;
pub use layout::{Bitfield, ColorLayout, rescale};
pub use lifecycle::{Descriptor, Framebuffers, ShutdownReport, Stats};
pub use mode::{Geometry, Mode, ModeTable, Visual};
pub use negotiate::{Negotiated, SUPPORTED_DEPTHS, negotiate};
pub use surface::{MapRejected, MapTarget};

pub use kernel_fbmem::{PageTranslator, PhysicalAddress, StoreHandle};
