//! Presentation channels: where input comes from and where screens are drawn.

pub mod channel;
pub mod cli;
pub mod commands;

pub use channel::*;
pub use cli::CliChannel;
pub use commands::{Command, interpret, notice_for};
