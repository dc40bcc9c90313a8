use super::{pause_and_poll, FrameSink, KeyWatcher, View, ViewImage};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Writes selected views as numbered PNG files.
pub struct ImageDirOutput {
    dir: PathBuf,
    views: Vec<View>,
    frame_index: u64,
    watcher: Option<KeyWatcher>,
}

impl ImageDirOutput {
    pub fn new<P: AsRef<Path>>(dir: P, views: &[View]) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        tracing::info!("Writing {} view(s) to {}", views.len(), dir.display());

        Ok(Self {
            dir,
            views: views.to_vec(),
            frame_index: 0,
            watcher: None,
        })
    }

    pub fn with_key_watcher(mut self, watcher: KeyWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Destination of a view for the current frame
    pub fn path_for(&self, view: View) -> PathBuf {
        self.dir
            .join(format!("{}_{:06}.png", view.slug(), self.frame_index))
    }
}

impl FrameSink for ImageDirOutput {
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()> {
        if !self.views.contains(&view) {
            return Ok(());
        }

        let path = self.path_for(view);
        let saved = match image {
            ViewImage::Mask(mask) => mask.save(&path),
            ViewImage::Frame(frame) => frame.save(&path),
        };
        saved.with_context(|| format!("Failed to write {}", path.display()))
    }

    fn pause_and_check_cancel(&mut self, pause: Duration) -> Result<bool> {
        self.frame_index += 1;
        Ok(pause_and_poll(self.watcher.as_ref(), pause))
    }
}
