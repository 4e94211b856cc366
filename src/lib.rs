//! # enip-motion
//!
//! Host-side driver for a single-axis motor drive over EtherNet/IP (ENIP),
//! using a Class-1 implicit I/O connection: a TCP handshake (RegisterSession,
//! ForwardOpen) followed by a cyclic UDP O->T/T->O stream at a configured
//! Requested Packet Interval (RPI).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use enip_motion::{DriveConfig, Drive};
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! fn main() -> enip_motion::Result<()> {
//!     let config = DriveConfig::new(Ipv4Addr::new(192, 168, 0, 20)).with_rpi_ms(10);
//!     let mut drive = Drive::connect(config)?;
//!
//!     let reached = drive.operation_1(Duration::from_secs(30), None);
//!     println!("operation 1 reached in-position: {reached}");
//!
//!     drive.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - ports, sizes, timing constants, and [`DriveConfig`]
//! - [`wire`] - hex-literal decoding and little-endian field helpers
//! - [`cpf`] - Common Packet Format codec for O->T/T->O frames
//! - [`encap`] - ENIP encapsulation: RegisterSession, ForwardOpen, SendUnitData
//! - [`status`] - Fixed-I/O status word decoding and offset auto-detection
//! - [`payloads`] - the canned 44-byte command payloads
//! - [`sender`] - the cyclic sender thread and reconnect loop
//! - [`listener`] - the background T->O receive loop
//! - [`command`] - the high-level jog/stop/operation/pause command engine
//! - [`drive`] - [`Drive`], the connect/close lifecycle facade

pub mod command;
pub mod config;
pub mod cpf;
pub mod drive;
pub mod encap;
pub mod error;
pub mod listener;
pub mod payloads;
pub mod sender;
pub mod status;
pub mod wire;

pub use command::{Keep, ProgressFn, ProgressRecord};
pub use config::DriveConfig;
pub use drive::{Drive, DriveBuilder, ListenerStats};
pub use error::{Error, Result};
pub use status::FixedIoBits;
