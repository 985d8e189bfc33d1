//! A small interactive shell with job control.
//!
//! Lines are split on whitespace into arguments and the operators `<`, `>`, `|`
//! and `&`. External programs run as child processes; `&` leaves them running
//! in the background and records them in a [`jobs::JobRegistry`]. Ctrl-Z stops
//! the current foreground program and moves it into the registry, from where
//! `bg` and `fg` resume it. Finished jobs are reported once by the
//! [`reaper`] before the next prompt.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the
//! parser, the job registry and the signal coordinator for embedding and testing.

mod builtin;
pub mod command;
pub mod config;
mod dispatcher;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod jobs;
mod launcher;
pub mod parser;
pub mod reaper;
pub mod signals;

pub use config::Config;
pub use error::{ParseError, ShellError};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
