//! Orpheus: guided wellness sessions: a scripted check-in interview that
//! turns into a personalised meditation or set of affirmations.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod generation;
pub mod logging;
