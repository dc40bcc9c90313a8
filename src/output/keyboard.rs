use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Watches standard input for a stop request.
///
/// A line containing a space, or a lone `q`, requests cancellation. The flag
/// is only read between frames.
#[derive(Debug, Clone, Default)]
pub struct KeyWatcher {
    cancelled: Arc<AtomicBool>,
}

impl KeyWatcher {
    /// Start reading standard input on a helper thread.
    pub fn spawn() -> Self {
        let watcher = Self::default();
        let flag = Arc::clone(&watcher.cancelled);

        let spawned = std::thread::Builder::new()
            .name("key-watcher".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if is_stop_request(&line) {
                        tracing::info!("Stop requested from keyboard");
                        flag.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            });
        if let Err(err) = spawned {
            tracing::warn!("Keyboard cancellation unavailable: {}", err);
        }

        watcher
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Raise the flag without a key press.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

fn is_stop_request(line: &str) -> bool {
    line.contains(' ') || line.trim().eq_ignore_ascii_case("q")
}
