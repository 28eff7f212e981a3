//! kardexctl - command-line front end for Kardex fault analytics

pub mod cli;
pub mod commands;
pub mod errors;
pub mod logging;
pub mod output;
