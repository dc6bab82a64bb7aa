//! Extension system for the editor.
//!
//! This module discovers extension units in the install directory, loads
//! them through registered factories, activates them against the editor and
//! fans editor events out to every active extension.
//!
//! # Architecture
//!
//! ```text
//! ExtensionManager<H: EditorHost>
//! ├── host: H                                   (the editor)
//! ├── loader: Loader
//! │   ├── registry: FactoryRegistry             entry name -> factory
//! │   └── units: HashMap<"ext_<id>", ExtensionSource>
//! ├── records: HashMap<ExtensionId, ExtensionRecord>
//! ├── order: Vec<ExtensionId>                   discovery order, used for dispatch
//! ├── state: EnableState                        extensions.json
//! ├── settings: SettingsStore                   settings/<id>.json
//! └── catalog: Catalog                          marketplace directory
//! ```
//!
//! Everything runs on the editor's thread. Extension code is isolated per
//! call: an error or panic in one hook is logged against that extension and
//! never reaches the editor or the other extensions.

mod api;
pub mod builtin;
mod dispatch;
mod error;
mod isolate;
mod loader;
mod manager;
mod manifest;
pub mod marketplace;
pub mod metadata;
mod record;
mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{
    BindingId, EditorHost, Extension, ExtensionContext, KeyBindings, KeyEvent, KeyOutcome,
    MenuBuilder, MenuRoot, Settings,
};
pub use error::{ExtensionError, ExtensionResult, Failure, FailureKind};
pub use loader::{unit_key, ExtensionFactory, FactoryRegistry, Loader};
pub use manager::{ExtensionHostConfig, ExtensionManager};
pub use manifest::{identifier_for, ExtensionSource, RESERVED_PREFIX, UNIT_EXTENSION};
pub use marketplace::{Catalog, MarketplaceEntry};
pub use metadata::{parse_static, ExtensionMeta, CATEGORIES};
pub use record::{ExtensionRecord, ExtensionState};
pub use state::EnableState;
pub use storage::SettingsStore;

/// Unique identifier for an extension (the unit's file stem).
pub type ExtensionId = String;
