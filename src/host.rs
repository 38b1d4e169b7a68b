//! Services the host upload manager hands to an uploader.
//!
//! Everything the uploader needs from its host arrives through a
//! [`HostContext`]; nothing is read from ambient state.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Read access to the host's stored plugin configuration.
pub trait ConfigReader: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get_config(&self, key: &str) -> Option<serde_json::Value>;
}

/// A JSON object acts as a config store keyed by its top-level fields.
impl ConfigReader for serde_json::Value {
    fn get_config(&self, key: &str) -> Option<serde_json::Value> {
        self.get(key).cloned()
    }
}

/// Log sink with the severities the host understands.
pub trait PluginLogger: Send + Sync {
    fn log(&self, level: log::Level, message: &str);

    fn info(&self, message: &str) {
        self.log(log::Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(log::Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(log::Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.log(log::Level::Debug, message);
    }
}

/// Forwards plugin log lines to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl PluginLogger for LogFacade {
    fn log(&self, level: log::Level, message: &str) {
        log::log!(target: "imgbox_uploader", level, "{}", message);
    }
}

/// User-facing notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub text: String,
}

/// Emits events to the host UI.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: &str, notification: &Notification) -> anyhow::Result<()>;
}

/// Host services bundle passed to every uploader invocation.
#[derive(Clone)]
pub struct HostContext {
    pub config: Arc<dyn ConfigReader>,
    pub logger: Arc<dyn PluginLogger>,
    pub notifier: Arc<dyn Notifier>,
}

impl HostContext {
    pub fn new(
        config: Arc<dyn ConfigReader>,
        logger: Arc<dyn PluginLogger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            logger,
            notifier,
        }
    }
}

impl Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").finish_non_exhaustive()
    }
}

/// Emit a notification, logging instead of failing when the host rejects it.
pub fn safe_emit_notification(
    notifier: &dyn Notifier,
    logger: &dyn PluginLogger,
    event_name: &str,
    notification: &Notification,
) -> bool {
    match notifier.emit(event_name, notification) {
        Ok(()) => {
            logger.debug(&format!(
                "Emitted event '{}' with title: {}",
                event_name, notification.title
            ));
            true
        }
        Err(e) => {
            logger.warn(&format!(
                "Failed to emit event '{}' (non-critical): {:#}",
                event_name, e
            ));
            false
        }
    }
}
