//! Game clock, event scheduling and the run loop for the Somatic engine.
//!
//! The rules in `somatic-character` never read a clock. This crate owns
//! game time: it applies commands, schedules the arrivals and landings the
//! rules hand back, fires them when due, and runs heartbeat upkeep.
//!
//! # Modules
//!
//! - [`clock`] -- Step counter and derived game time.
//! - [`command`] -- [`CommandSource`] trait, [`Command`] and [`ScriptedCommands`].
//! - [`config`] -- Configuration loading from `somatic-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- [`Engine`]: commands, events, heartbeats, echoes.
//! - [`error`] -- [`CoreError`].
//! - [`heartbeat`] -- Short and long heartbeat subscriptions.
//! - [`operator`] -- Pause, resume, stop and step bounds.
//! - [`runner`] -- The async run loop.
//! - [`scheduler`] -- Due-time ordered event queue.
//!
//! [`CommandSource`]: command::CommandSource
//! [`Command`]: command::Command
//! [`ScriptedCommands`]: command::ScriptedCommands
//! [`Engine`]: engine::Engine
//! [`CoreError`]: error::CoreError

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod operator;
pub mod runner;
pub mod scheduler;
