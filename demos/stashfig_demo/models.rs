//! Configuration models for the stashfig demo application.
//!
//! Three models show the three storage styles:
//!
//! | Model            | Resource        | Codec       | Stored as                  |
//! |------------------|-----------------|-------------|----------------------------|
//! | [`AppSettings`]  | `app/settings`  | JSON        | pretty JSON, 4-space indent |
//! | [`Credentials`]  | `app/secrets`   | JSON        | transformed (unreadable)   |
//! | [`LaunchCounter`]| `launches`      | self codec  | `launches=<n>`             |

use serde::{Deserialize, Serialize};
use stashfig::{BoxError, ConfigModel, SelfCodec};

/// User-facing settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppSettings {
    /// Name shown in the banner.
    pub name: String,
    /// Playback volume, 0 to 10.
    pub volume: u8,
    pub theme: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "stashfig-demo".into(),
            volume: 5,
            theme: "dark".into(),
        }
    }
}

impl ConfigModel for AppSettings {
    fn init(&mut self) -> Result<(), BoxError> {
        if self.volume > 10 {
            return Err(format!("volume {} is out of range (0-10)", self.volume).into());
        }
        Ok(())
    }
}

/// Something a user should not edit by hand.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Credentials {
    pub token: String,
}

impl ConfigModel for Credentials {}

/// Counts process starts. The hook runs on load only, so reloads do not
/// inflate the count.
#[derive(Debug, Clone, Default)]
pub struct LaunchCounter {
    pub launches: u64,
}

impl ConfigModel for LaunchCounter {
    fn init(&mut self) -> Result<(), BoxError> {
        self.launches += 1;
        Ok(())
    }
}

impl SelfCodec for LaunchCounter {
    fn encode(&self) -> Result<String, BoxError> {
        Ok(format!("launches={}\n", self.launches))
    }

    fn decode(text: &str) -> Result<Self, BoxError> {
        let value = text
            .trim()
            .strip_prefix("launches=")
            .ok_or("expected 'launches=<n>'")?;
        Ok(Self {
            launches: value.parse()?,
        })
    }
}
