//! ISUPPORT (RPL_ISUPPORT / 005) capability table.
//!
//! Servers advertise their grammar variations as `NAME`, `NAME=value` and
//! `-NAME` tokens spread over one or more 005 lines. [`ISupportTable`] folds
//! them in incrementally and exposes typed accessors with the documented
//! fallback defaults.
//!
//! # Reference
//! - Modern IRC documentation: <https://modern.ircdocs.horse/isupport.html>

mod spec;
mod table;

pub use spec::{ChanModes, ModeClass, PrefixSpec};
pub use table::{decode_value, ISupportTable};
