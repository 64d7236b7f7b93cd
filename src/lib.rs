//! Brainstorm Dice core.
//!
//! Two halves share one preferences backend:
//!
//! - [`gate`]: the one-time launch gate. The first launch with connectivity
//!   negotiates with a remote endpoint and permanently commits either the main
//!   application or a web target. Every failure commits the main application.
//! - [`library`]: the creative prompt library behind the main application
//!   (random story combos, favorites, daily combo and play modes).
//!
//! A host wires it up roughly like this:
//!
//! ```no_run
//! # async fn run(tokens: std::sync::Arc<dyn brainstorm_dice::gate::TokenSource>) -> brainstorm_dice::error::Result<()> {
//! use std::sync::Arc;
//! use brainstorm_dice::config::Config;
//! use brainstorm_dice::gate::{BootOrchestrator, GateServices};
//! use brainstorm_dice::prefs::JsonFilePreferences;
//!
//! let config = Config::load()?;
//! brainstorm_dice::logging::init(&config.logging)?;
//! let prefs = Arc::new(JsonFilePreferences::open(&config.preferences_path));
//! let services = GateServices::from_config(&config, prefs, tokens)?;
//! let gate = BootOrchestrator::from_config(&config, services);
//! let view = gate.boot().await;
//! # let _ = view;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod library;
pub mod logging;
pub mod prefs;
pub mod settings;

pub use config::Config;
pub use error::{Error, Result};
