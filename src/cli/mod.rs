//! Command-line interface module
//!
//! Argument parsing plus one handler per subcommand. The interactive chat
//! command is the terminal stand-in for the original side panel; `trigger`
//! plays the out-of-process role the background script had.

pub mod args;
pub mod ask;
pub mod chat;
pub mod clear;
pub mod key;
pub mod render;
pub mod trigger;
