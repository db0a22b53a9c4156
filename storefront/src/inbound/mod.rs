//! Inbound adapters that translate external requests into session and
//! console calls while keeping framework details at the edge.
//!
//! The command-line driver lives under [`cli`].

pub mod cli;
