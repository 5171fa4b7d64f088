//! Data models for costwatch

mod billing;

pub use billing::*;
