use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::progress_info::ProgressInfo;

/// Writes `ProgressInfo::status()` to a file every 100ms on a background
/// thread, for callers (batch jobs, the GUI's external-process mode) that
/// want to poll progress from another process rather than hold a
/// reference to the `ProgressInfo` directly.
pub struct FileProgress {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FileProgress {
    pub fn spawn(progress: Arc<ProgressInfo>, path: PathBuf) -> std::io::Result<Self> {
        // Fail fast if the path isn't writable, rather than discovering
        // it on the background thread where the error would be silent.
        File::create(&path)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                if let Ok(mut f) = File::create(&path) {
                    let _ = writeln!(f, "{}", progress.status());
                }
                std::thread::sleep(Duration::from_millis(100));
                if progress.is_cancelled() {
                    break;
                }
            }
        });

        Ok(FileProgress {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for FileProgress {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn writes_status_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.txt");
        let progress = Arc::new(ProgressInfo::new());
        progress.push("rendering");
        let fp = FileProgress::spawn(progress.clone(), path.clone()).unwrap();
        sleep(Duration::from_millis(150));
        drop(fp);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("rendering"));
    }
}
