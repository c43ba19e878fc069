//! Upscaler client: CLI, configuration and the native controller shell.
pub mod cli;
pub mod commands;
pub mod config;
pub mod platform;
