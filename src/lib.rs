//! linkdrop relay library
//!
//! This library provides the core functionality for the linkdrop relay,
//! including the Telegram channel, file ingestion, the link registry,
//! and the HTTP download server.
//!
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod channels;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod links;
pub mod logging;
pub mod media;
pub mod server;
pub mod shorten;
