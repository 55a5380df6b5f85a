//! Library crate for wpm, a package manager for wsx script projects.

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod manifest;
pub mod ops;
pub mod registry;
pub mod runner;
pub mod runtime;
pub mod store;
pub mod workspace;
