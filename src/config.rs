use std::path::Path;

use crate::{
    audio::chunk::AudioFormat,
    foundation::core::{Resolution, Rgba8Premul},
    foundation::error::{MontageError, MontageResult},
};

/// Output surface settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Straight RGBA the surface is cleared to before compositing.
    pub clear_rgba: [u8; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            clear_rgba: [0, 0, 0, 0],
        }
    }
}

impl RenderSettings {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn clear(&self) -> Rgba8Premul {
        let [r, g, b, a] = self.clear_rgba;
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per mix request when mixing long ranges.
    pub chunk_frames: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            chunk_frames: 4_800,
        }
    }
}

impl AudioSettings {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Engine-wide settings. Every field is optional in the JSON form.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub render: RenderSettings,
    pub audio: AudioSettings,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            audio: AudioSettings::default(),
            log_filter: "info".to_owned(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> MontageResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> MontageResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MontageError::validation(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> MontageResult<()> {
        self.render.resolution().validate()?;
        self.audio.format().validate()?;
        if self.audio.chunk_frames == 0 {
            return Err(MontageError::validation("audio chunk_frames must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
