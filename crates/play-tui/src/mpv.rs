//! mpv-backed audio stream.
//!
//! One child process per stream: `start` spawns `mpv --no-video <url>`,
//! `stop` kills it.  There is no IPC socket; the stream URL never changes
//! while a process is alive, so a restart is just kill + spawn.
//!
//! mpv's stderr goes to a log file opened once, when the stream is built.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{info, warn};

use crate::playback::AudioStream;

pub struct MpvStream {
    configured_binary: Option<PathBuf>,
    volume: f32,
    stderr_log: Option<File>,
    process: Option<tokio::process::Child>,
}

impl MpvStream {
    pub fn new(configured_binary: Option<PathBuf>, volume: f32, stderr_path: &Path) -> Self {
        let stderr_log = match open_log(stderr_path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("mpv: could not open {}: {}", stderr_path.display(), e);
                None
            }
        };
        Self {
            configured_binary,
            volume,
            stderr_log,
            process: None,
        }
    }

    fn stderr(&self) -> Stdio {
        match self.stderr_log.as_ref().map(File::try_clone) {
            Some(Ok(file)) => file.into(),
            Some(Err(e)) => {
                warn!("mpv: could not reuse stderr log: {}", e);
                Stdio::null()
            }
            None => Stdio::null(),
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.start_kill() {
                warn!("mpv: kill failed: {}", e);
            }
        }
    }
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

pub fn mpv_args(url: &str, volume: f32) -> Vec<String> {
    vec![
        "--no-video".to_string(),
        "--no-terminal".to_string(),
        "--quiet".to_string(),
        format!("--volume={}", (volume * 100.0).clamp(0.0, 100.0).round() as i64),
        url.to_string(),
    ]
}

impl AudioStream for MpvStream {
    fn start(&mut self, url: &str) -> anyhow::Result<()> {
        // Restart rather than stack a second player
        self.kill();

        let mpv_binary = play_proto::platform::find_mpv_binary(self.configured_binary.as_deref())
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let child = tokio::process::Command::new(&mpv_binary)
            .args(mpv_args(url, self.volume))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(self.stderr())
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned pid {:?} for {}", child.id(), url);
        self.process = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if self.process.is_some() {
            info!("mpv: stopping");
        }
        self.kill();
    }

    fn is_running(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                match status.code() {
                    Some(code) => warn!("mpv process exited with code: {}", code),
                    None => warn!("mpv process terminated by signal"),
                }
                self.process = None;
                false
            }
            Err(e) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
        }
    }
}

impl Drop for MpvStream {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_clamp_volume_and_end_with_url() {
        let args = mpv_args("http://play.local:8000/listen", 1.7);
        assert!(args.contains(&"--volume=100".to_string()));
        assert_eq!(args.last().unwrap(), "http://play.local:8000/listen");

        let args = mpv_args("x", 0.42);
        assert!(args.contains(&"--volume=42".to_string()));
    }

    #[tokio::test]
    async fn missing_binary_fails_and_stays_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("mpv-stderr.log");
        let mut stream = MpvStream::new(Some(dir.path().join("no-such-mpv")), 0.5, &log);
        assert!(stream.start("http://play.local/listen").is_err());
        assert!(!stream.is_running());
        stream.stop();
    }

    #[test]
    fn stderr_log_is_opened_when_built() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("mpv-stderr.log");
        let stream = MpvStream::new(None, 0.5, &log);
        assert!(log.exists());
        assert!(stream.stderr_log.is_some());
    }

    #[test]
    fn unopenable_log_falls_back_to_null() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let stream = MpvStream::new(None, 0.5, dir.path());
        assert!(stream.stderr_log.is_none());
        let _ = stream.stderr();
    }
}
