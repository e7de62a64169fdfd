//! mkvtidy - tidy media files into clean matroska
//!
//! This library crate exposes configuration and batch processing for the
//! binary and for integration testing.

pub mod config;
pub mod processor;
