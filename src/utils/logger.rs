use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::Local;
use log::LevelFilter;
use crate::error::{Error, Result};

/// Sends every log line to stderr and to the run's log file.
pub struct TeeWriter {
    file: File,
}

impl TeeWriter {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("cdr3_cluster_{}.log", timestamp))
}

/// Install the global logger. Returns the log file in use, or None when
/// logging is off, in which case no file is created.
pub fn init_logging(log_dir: &Path, level: LevelFilter) -> Result<Option<PathBuf>> {
    if level == LevelFilter::Off {
        return Ok(None);
    }
    fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir);
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .open(&path)?;

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .target(env_logger::Target::Pipe(Box::new(TeeWriter::new(log_file))))
        .try_init()
        .map_err(|e| Error::config(format!("Logger already initialised: {}", e)))?;

    Ok(Some(path))
}

/// `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn durations_render_as_clock_time() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_duration(Duration::from_millis(61_900)), "00:01:01");
        assert_eq!(format_duration(Duration::from_secs(3600 * 27 + 5)), "27:00:05");
    }

    #[test]
    fn log_file_is_timestamped() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("cdr3_cluster_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "cdr3_cluster_20240101_120000.log".len());
    }

    #[test]
    fn logging_off_leaves_no_file() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        assert_eq!(init_logging(&log_dir, LevelFilter::Off).unwrap(), None);
        assert!(!log_dir.exists());
    }
}
