//! # revcheck - Battle.net client integrity primitives
//!
//! The two algorithmic engines a classic Battle.net client needs to get
//! past logon and stay connected:
//!
//! - **CheckRevision**: runs the server's value string over three game
//!   files and returns the checksum proving they are unmodified
//!   ([`revision`]).
//! - **Warden**: the stream cipher and SHA-1 chained generator protecting
//!   the anti-cheat channel ([`warden`]).
//!
//! Sockets, packet framing and the logon state machine live elsewhere;
//! this crate only produces the numbers and bytes those layers embed in
//! their messages.
//!
//! ## Example
//!
//! ```no_run
//! use revcheck::{RevisionChecker, RevisionConfig, LoadStrategy};
//! use revcheck::warden::EncryptionContext;
//!
//! # fn main() -> Result<(), revcheck::Error> {
//! let checker = RevisionChecker::new(
//!     RevisionConfig::default().with_strategy(LoadStrategy::PreloadRetain),
//! )?;
//! let checksum = checker.check_revision(
//!     "A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B",
//!     &["StarCraft.exe", "Storm.dll", "Battle.snp"],
//!     "IX86ver1.mpq",
//! )?;
//! println!("checksum: {}", checksum);
//!
//! let mut warden = EncryptionContext::new(0x1234_5678);
//! let packet = warden.encrypt(&[0x00, 0x01, 0x02]);
//! # let _ = packet;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod config;
pub mod error;
pub mod revision;
pub mod warden;

// Re-export commonly used types
pub use config::{ExecutionMode, LoadStrategy, RevisionConfig};
pub use error::{Error, Result};
pub use revision::{compute_checksum, extract_mpq_index, RevisionChecker};
pub use warden::EncryptionContext;
