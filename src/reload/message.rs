//! Live reload message protocol.
//!
//! JSON over WebSocket, server → browser:
//!
//! - `connected`: handshake done
//! - `reload`: full page reload
//! - `css`: refresh stylesheets in place
//! - `error` / `clear_error`: show or hide the failure overlay

use serde::{Deserialize, Serialize};

use crate::task::catalog::STYLES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    Connected {
        version: String,
    },
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Css,
    /// A task failed on a file; the page keeps its content.
    Error {
        task: String,
        message: String,
    },
    ClearError,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// What to push after `task` rebuilt: styles refresh in place, the rest reloads.
    pub fn for_task(task: &str) -> Self {
        if task == STYLES {
            Self::Css
        } else {
            Self::Reload {
                reason: Some(format!("{task} rebuilt")),
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
