//! Amend Change Model
//!
//! Typed edit operations derived from natural-language instructions.
//!
//! # Core Concepts
//!
//! - [`Change`]: one anchor-addressed edit with a plan-unique [`ChangeId`]
//! - [`Edit`]: operation-specific target and payload
//! - [`ChangeOperation`]: the five-operation taxonomy
//! - [`DedupKey`]: fingerprint for collapsing equivalent candidates
//! - [`RawChange`]: the loosely-typed JSON form, validated at the boundary

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod error;
mod id;
mod normalize;
mod operation;
pub mod wire;

pub use change::{Anchor, Change, Edit, TextTarget};
pub use error::ChangeError;
pub use id::ChangeId;
pub use normalize::{normalize, DedupKey, DEFAULT_PAYLOAD_PREFIX};
pub use operation::ChangeOperation;
pub use wire::{RawChange, RawPayload, RawTarget};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
