//! Environment-aware Linux setup engine.
//!
//! Detects the host (distribution, architecture, Raspberry Pi hardware),
//! picks a preset of setup tasks for it, and runs those tasks against the
//! live system with dry-run simulation, per-task error recovery and a
//! backup of sensitive files taken beforehand.
//!
//! The public API is organised into layers:
//!
//! - **[`tasks`]**: the task model and the dispatcher that executes one task
//! - **[`runner`]**: spawn one command line with inherited stdio
//! - **[`backup`]**: timestamped copies of system files, and their discovery
//! - **[`coordinator`]**: run a preset in order and aggregate the outcomes
//! - **[`platform`]**, **[`catalogue`]**, **[`interaction`]**: environment
//!   probe, preset catalogue and user prompts feeding the engine
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod backup;
pub mod catalogue;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exec;
pub mod interaction;
pub mod logging;
pub mod platform;
pub mod runner;
pub mod tasks;
