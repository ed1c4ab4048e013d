#![doc(html_root_url = "https://docs.rs/arbor-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A virtual tree renderer for retained, DOM-like hosts.
//!
//! Views build immutable [`Node`] trees. [`diff`] compares two of them and produces index-tagged [`Patch`]es,
//! [`DomDiffer::locate`] binds those to live nodes and [`DomDiffer::apply`] performs the mutations.
//! [`DomDiffer::update`] runs all three steps.
//!
//! Hosts implement [`Platform`]. [`memory::MemoryDom`] keeps everything in process, [`web::WebDom`] targets the browser.
//!
//! # Logging
//!
//! All logging goes through [`tracing`]. Text content and attribute values are left out unless the
//! `"dangerous-logging"` feature is enabled, since they may contain personally identifiable information.

mod apply;
mod closure_map;
mod config;
mod differ;
mod error;
mod locate;
mod render;

pub mod diff;
pub mod driver;
pub mod event;
pub mod facts;
pub mod load;
pub mod memory;
pub mod node;
pub mod patch;
pub mod platform;
pub mod web;

pub use config::Config;
pub use diff::{diff, diff_with};
pub use differ::DomDiffer;
pub use error::Error;
pub use node::Node;
pub use patch::{BoundPatch, Patch, PatchKind};
pub use platform::Platform;
