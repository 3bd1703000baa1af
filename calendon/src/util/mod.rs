//! Miscellaneous utilities.

pub mod tick_loop;
