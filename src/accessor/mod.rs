//! Media capabilities injected into rendering and audio retrieval.
//!
//! The engine never decodes media itself. Callers hand it a [`FileAccessors`] bundle whose
//! members may be absent; a missing capability degrades to silence or absence, exactly like
//! a failed fetch.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    audio::chunk::AudioChunk,
    foundation::core::{Fps, Resolution},
    foundation::error::{MontageError, MontageResult},
    render::image::{RasterImage, SharedImage},
};

mod wav;

pub use wav::WavAudioAccessor;

/// Decoder hint passed along with video frame requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekHint {
    /// Sequential playback; the decoder may return the nearest cached frame.
    #[default]
    Playback,
    /// Random access; the decoder must land on the exact frame.
    Exact,
}

#[async_trait]
pub trait ImageFileAccessor: Send + Sync {
    async fn get_bitmap(&self, path: &Path) -> MontageResult<SharedImage>;
}

#[async_trait]
pub trait VideoFileAccessor: Send + Sync {
    async fn get_bitmap(
        &self,
        path: &Path,
        time_seconds: f64,
        hint: SeekHint,
    ) -> MontageResult<SharedImage>;
}

#[async_trait]
pub trait AudioFileAccessor: Send + Sync {
    /// Fetch audio starting at `start_seconds` (file start when `None`) for
    /// `duration_seconds` (to the end when `None`), in the file's native format.
    async fn get_audio(
        &self,
        path: &Path,
        start_seconds: Option<f64>,
        duration_seconds: Option<f64>,
    ) -> MontageResult<AudioChunk>;

    async fn get_audio_by_sample(
        &self,
        path: &Path,
        start_sample: u64,
        sample_count: usize,
        sample_rate: u32,
    ) -> MontageResult<AudioChunk>;
}

/// The capability bundle handed to a render or mix request.
#[derive(Clone, Default)]
pub struct FileAccessors {
    pub image: Option<Arc<dyn ImageFileAccessor>>,
    pub video: Option<Arc<dyn VideoFileAccessor>>,
    pub audio: Option<Arc<dyn AudioFileAccessor>>,
}

impl FileAccessors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, accessor: Arc<dyn ImageFileAccessor>) -> Self {
        self.image = Some(accessor);
        self
    }

    pub fn with_video(mut self, accessor: Arc<dyn VideoFileAccessor>) -> Self {
        self.video = Some(accessor);
        self
    }

    pub fn with_audio(mut self, accessor: Arc<dyn AudioFileAccessor>) -> Self {
        self.audio = Some(accessor);
        self
    }
}

impl fmt::Debug for FileAccessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAccessors")
            .field("image", &self.image.is_some())
            .field("video", &self.video.is_some())
            .field("audio", &self.audio.is_some())
            .finish()
    }
}

/// Project-level facts shared by every request against one timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectInfo {
    /// Directory that relative media paths are resolved against.
    pub root: PathBuf,
    pub fps: Fps,
    pub resolution: Resolution,
}

impl ProjectInfo {
    pub fn new(root: impl Into<PathBuf>, fps: Fps, resolution: Resolution) -> Self {
        Self {
            root: root.into(),
            fps,
            resolution,
        }
    }

    pub fn resolve(&self, media_path: &str) -> PathBuf {
        let p = Path::new(media_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self::new(".", Fps::default(), Resolution::default())
    }
}

/// Decodes still images from disk with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskImageAccessor;

#[async_trait]
impl ImageFileAccessor for DiskImageAccessor {
    async fn get_bitmap(&self, path: &Path) -> MontageResult<SharedImage> {
        let owned = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decode_image_file(&owned))
            .await
            .map_err(|e| MontageError::media(format!("image decode task failed: {e}")))??;
        Ok(Arc::new(decoded))
    }
}

#[tracing::instrument(level = "debug")]
fn decode_image_file(path: &Path) -> MontageResult<RasterImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| MontageError::media(format!("read image '{}': {e}", path.display())))?;
    decode_image_bytes(&bytes)
        .map_err(|e| MontageError::media(format!("decode image '{}': {e}", path.display())))
}

/// Decode encoded image bytes into premultiplied RGBA8.
pub fn decode_image_bytes(bytes: &[u8]) -> MontageResult<RasterImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MontageError::media(format!("image decode failed: {e}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterImage::from_straight_rgba8(width, height, rgba.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/accessor/mod.rs"]
mod tests;
