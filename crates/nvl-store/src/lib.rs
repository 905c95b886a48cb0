//! Ordered, type-tagged name/value lists.
//!
//! A [`Store`] holds named entries in insertion order. Each entry carries one
//! of the [`NvType`] tags: null, bool, number, string, nested list,
//! descriptor, binary, or an array of bool/number/string/list/descriptor.
//!
//! # Sticky errors
//!
//! Insertions never return errors. A failed insertion latches an [`Errno`]
//! into the store; from then on lookups find nothing, insertions are
//! ignored, and packing fails. The first latched code is kept for good.
//!
//! # Packed form
//!
//! [`Store::pack`] and [`Store::unpack`] convert to and from a
//! self-describing byte format (see [`pack`]), and [`Store::send`] /
//! [`Store::recv`] frame that format over any byte channel. Untrusted input
//! is bounded by [`UnpackLimits`].
//!
//! # Modules
//!
//! - [`store`] -- the list itself, lookup, insertion, enumeration
//! - [`value`] -- type tags and entry payloads
//! - [`pack`] -- packed byte format
//! - [`channel`] -- send / recv / xfer
//! - [`dump`] -- human-readable listing

pub mod channel;
pub mod config;
pub mod dump;
pub mod error;
pub mod flags;
pub mod pack;
pub mod store;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use config::UnpackLimits;
pub use error::{Errno, StoreError, StoreResult};
pub use flags::NvFlags;
pub use store::{Cookie, Store, NAME_MAX};
pub use value::{NvType, Value};
