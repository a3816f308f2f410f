//! Command-line access to the blog's content source.

pub mod cli;
pub mod commands;
pub mod utils;
