//! CSV configuration exchange for the Kwal lighting controller.
//!
//! An HTTP endpoint serves the controller's CSV files, accepts uploads of
//! allow-listed files (archiving the previous version when content changes),
//! and moves processed files into a `done` directory. The [`ledmap`] module
//! backs the offline tool that builds the firmware's LED position table.

pub mod config;
pub mod exchange;
pub mod handler;
pub mod http;
pub mod ledmap;
pub mod logger;
pub mod server;
