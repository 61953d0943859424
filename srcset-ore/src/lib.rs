//! Small utilities shared by every `srcset` crate.

pub mod assert;
pub mod env;
pub mod hash;
