//! Layered settings resolution for the snippet editor toolkit.
//!
//! [`SettingsManager`] merges four sources into one effective value per
//! setting: the host page's locked embed config, per-user server-synced
//! properties, site-wide server-synced defaults, and the local offline
//! cache. Writes land locally first and sync to the server as a best-effort
//! background task, so the editor stays fully usable offline.

pub mod embed;
mod layers;
pub mod manager;
pub mod sync;

pub use manager::{ConfigExport, SettingsManager};
pub use sync::sync_flush_loop;

use serde::Serialize;
use settings_schema::{SettingValue, ValidationError};

/// Which layer produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Embed,
    User,
    Site,
    Local,
    Default,
}

/// A resolved value with its provenance and lock status.
///
/// `locked` is `true` exactly when the value came from the embed layer;
/// locked settings can never be changed by `set()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveValue {
    pub value: SettingValue,
    pub source: Source,
    pub locked: bool,
}

/// Result of a `set()` or `reset()` call.
///
/// `Locked` is a flagged no-op, not an error: the UI renders "this setting
/// is managed by your deployment" rather than a validation message.
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    Applied(EffectiveValue),
    Locked(EffectiveValue),
}

impl SetOutcome {
    pub fn effective(&self) -> &EffectiveValue {
        match self {
            SetOutcome::Applied(e) | SetOutcome::Locked(e) => e,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SetOutcome::Locked(_))
    }
}

/// Errors surfaced by the settings engine.
///
/// Remote unavailability is deliberately absent: reads degrade to a lower
/// layer and writes queue for retry instead of failing the call.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("remote property store: {0}")]
    Remote(#[from] properties_client::PropertiesError),
}
