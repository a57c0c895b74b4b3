//! Baton CLI library: the command implementations behind the `baton` binary.

pub mod commands;
