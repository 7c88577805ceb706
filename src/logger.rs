use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Mutex, OnceLock},
    time::Instant,
};

use log::{LevelFilter, Log, Metadata, Record};

/// Appends log lines to a file; stdout belongs to the display.
struct FileLogger {
    file: Mutex<File>,
    started: Instant,
}

static INSTANCE: OnceLock<FileLogger> = OnceLock::new();

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{:>10.3} {:<5} {}: {}",
                self.started.elapsed().as_secs_f64(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

pub fn init(path: &Path, level: LevelFilter) -> anyhow::Result<()> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let logger = INSTANCE.get_or_init(|| FileLogger {
        file: Mutex::new(file),
        started: Instant::now(),
    });
    log::set_logger(logger).map_err(|error| anyhow::anyhow!("{error}"))?;
    log::set_max_level(level);
    Ok(())
}
