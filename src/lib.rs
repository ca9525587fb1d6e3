//! The Z-Machine as a library
//!
//! The runtime is headless: output, sound, and save data pass through
//! the collaborator traits in [zmachine::io], and input is delivered by
//! the embedder when the machine suspends for READ or READ_CHAR.
#![crate_name = "zvm"]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod files;
pub mod instruction;
pub mod object;
pub mod quetzal;
pub mod text;
pub mod zmachine;

#[cfg(test)]
pub mod test_util;
