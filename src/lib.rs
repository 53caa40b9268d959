#![doc = include_str!("../README.md")]

pub mod api;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod messages;
pub mod runtime;
pub mod selectors;
pub mod services;
pub mod tools;
pub mod types;

pub use api::CommandHandler;
pub use config::Config;
pub use engine::*;
pub use error::{Result, RoomwatchError};
pub use services::*;
pub use types::*;
