//! scc - extension host for a desktop code editor.
//!
//! Extensions are units (`<id>.ext`) in an install directory. Each unit
//! names a compiled-in factory through its `entry`; the host instantiates
//! it, activates it against the editor and fans editor events out to it.
//! A second directory acts as a marketplace of units that can be installed.
//!
//! # Architecture
//!
//! - [`extensions`] - Loader, lifecycle manager, event dispatch, settings
//!   and marketplace
//! - [`config`] - Configuration loading and management
//! - [`cli`] - The `scc` command line
//!
//! # Example
//!
//! ```ignore
//! use scc::extensions::{builtin::builtin_registry, ExtensionManager};
//!
//! let config = scc::Config::load();
//! let mut manager = ExtensionManager::initialize(
//!     editor,
//!     config.extension_host_config(),
//!     builtin_registry(),
//! );
//!
//! manager.dispatch_file_open("/src/main.cpp");
//! manager.shutdown_all();
//! ```

// Public modules
pub mod cli;
pub mod config;
pub mod extensions;
pub mod logging;

// Internal modules
mod error;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{SccError, SccResult};
pub use extensions::{EditorHost, Extension, ExtensionContext, ExtensionManager};
