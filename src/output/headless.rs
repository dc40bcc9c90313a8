use super::{pause_and_poll, FrameSink, KeyWatcher, View, ViewImage};
use anyhow::Result;
use std::time::Duration;

/// Discards every view; used when no display is selected.
#[derive(Debug, Default)]
pub struct HeadlessOutput {
    watcher: Option<KeyWatcher>,
    views_shown: u64,
}

impl HeadlessOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_watcher(mut self, watcher: KeyWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn views_shown(&self) -> u64 {
        self.views_shown
    }
}

impl FrameSink for HeadlessOutput {
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()> {
        let (width, height) = image.dimensions();
        tracing::trace!("{}: {}x{}", view.label(), width, height);
        self.views_shown += 1;
        Ok(())
    }

    fn pause_and_check_cancel(&mut self, pause: Duration) -> Result<bool> {
        Ok(pause_and_poll(self.watcher.as_ref(), pause))
    }
}
