//! Fixed vendor table layouts.

pub mod babolat;
pub mod watch;
pub mod zepp;
