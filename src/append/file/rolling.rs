// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use jiff::SignedDuration;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::Error;
use crate::append::file::clock::Clock;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

// 2006-01-02T15-04-05.000
const BACKUP_DATETIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// A writer for a log file that is rotated by size and whose backups are pruned by count and age.
///
/// The active file is always at the configured path. Before a write would grow it past the
/// maximum size, it is renamed to `<stem>-<timestamp>.<ext>` next to it and a fresh file is
/// opened. After each rotation, backups beyond the maximum count and backups older than the
/// maximum age are removed, newest kept first.
///
/// If the log directory or the log file cannot be opened, the failure is reported to the trap
/// and the open is retried on every following write, which fails until it succeeds.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    writer: Option<File>,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                let err = Error::new("failed to flush file writer on drop").with_source(err);
                self.state.trap.trap(&err);
            }
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let max_size = self.state.max_size.get();
        if buf.len() > max_size {
            return Err(io::Error::other(format!(
                "write length {} exceeds maximum file size {max_size}",
                buf.len()
            )));
        }

        if self.writer.is_none() {
            let file = self.state.open_log_writer().map_err(io::Error::other)?;
            self.state.current_filesize = file_size(&file);
            self.writer = Some(file);
        }

        if self.state.current_filesize + buf.len() > max_size {
            let now = self.state.clock.now();
            self.state.refresh_writer(now, &mut self.writer);
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::other("log file is not open"));
        };
        writer
            .write(buf)
            .inspect(|&n| self.state.current_filesize += n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    // required
    filepath: PathBuf,

    // has default
    max_size: NonZeroUsize,
    max_backups: Option<NonZeroUsize>,
    max_age: Option<Duration>,
    local_time: bool,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`] writing to `filepath`.
    ///
    /// By default, files are never rotated and backups are kept forever.
    #[must_use]
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            max_size: NonZeroUsize::MAX,
            max_backups: None,
            max_age: None,
            local_time: false,
            clock: Clock::System,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for errors during rotation.
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the maximum size of a log file in bytes.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.max_size = n;
        self
    }

    /// Set the maximum number of backups to keep. `None` keeps all of them.
    #[must_use]
    pub fn max_backups(mut self, n: Option<NonZeroUsize>) -> Self {
        self.max_backups = n;
        self
    }

    /// Set the maximum age of backups, judged by the timestamp in their names. `None` keeps
    /// them regardless of age.
    #[must_use]
    pub fn max_age(mut self, age: Option<Duration>) -> Self {
        self.max_age = age;
        self
    }

    /// Whether backup names use the local time instead of UTC.
    #[must_use]
    pub fn local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RollingFileWriter`], creating the log directory and opening the log file.
    ///
    /// # Errors
    ///
    /// Return an error if the path has no file name. Failing to create the directory or to open
    /// the file is reported to the trap instead, and retried on write.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            filepath,
            max_size,
            max_backups,
            max_age,
            local_time,
            clock,
            trap,
        } = self;

        let filename = match filepath.file_name().and_then(|name| name.to_str()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(Error::new("log filename must be a non-empty UTF-8 name")
                    .with_context("path", filepath.display()));
            }
        };
        let log_dir = match filepath.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let (stem, ext) = match filename.rfind('.') {
            Some(pos) if pos > 0 => (filename[..pos].to_string(), filename[pos..].to_string()),
            _ => (filename.clone(), String::new()),
        };

        let timezone = if local_time {
            TimeZone::system()
        } else {
            TimeZone::UTC
        };

        let mut state = State {
            log_dir,
            log_filename: filename,
            backup_prefix: format!("{stem}-"),
            backup_suffix: ext,
            current_filesize: 0,
            max_size,
            max_backups,
            max_age,
            timezone,
            clock,
            trap,
        };

        // continue to use the existing log file, if any
        let writer = match state.open_log_writer() {
            Ok(file) => {
                state.current_filesize = file_size(&file);
                Some(file)
            }
            Err(err) => {
                state.trap.trap(&err);
                None
            }
        };

        Ok(RollingFileWriter { state, writer })
    }
}

#[derive(Debug)]
struct Backup {
    filepath: PathBuf,
    timestamp: Timestamp,
}

#[derive(Debug)]
struct State {
    log_dir: PathBuf,
    log_filename: String,
    backup_prefix: String,
    backup_suffix: String,
    current_filesize: usize,
    max_size: NonZeroUsize,
    max_backups: Option<NonZeroUsize>,
    max_age: Option<Duration>,
    timezone: TimeZone,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl State {
    fn current_filepath(&self) -> PathBuf {
        self.log_dir.join(&self.log_filename)
    }

    fn open_log_writer(&self) -> Result<File, Error> {
        fs::create_dir_all(&self.log_dir).map_err(|err| {
            Error::new("failed to create log directory")
                .with_context("dir", self.log_dir.display())
                .with_source(err)
        })?;

        let filepath = self.current_filepath();
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&filepath)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", filepath.display())
                    .with_source(err)
            })
    }

    fn backup_filepath(&self, now: Timestamp) -> PathBuf {
        let datetime = now.to_zoned(self.timezone.clone());
        let filename = format!(
            "{}{}.{:03}{}",
            self.backup_prefix,
            datetime.strftime(BACKUP_DATETIME_FORMAT),
            datetime.millisecond(),
            self.backup_suffix,
        );
        self.log_dir.join(filename)
    }

    fn parse_backup_timestamp(&self, filename: &str) -> Option<Timestamp> {
        let datetime = filename
            .strip_prefix(&self.backup_prefix)?
            .strip_suffix(&self.backup_suffix)?;
        let (datetime, millis) = datetime.rsplit_once('.')?;
        if millis.len() != 3 {
            return None;
        }
        let millis = millis.parse::<i64>().ok()?;
        let datetime = DateTime::strptime(BACKUP_DATETIME_FORMAT, datetime).ok()?;
        let timestamp = datetime.to_zoned(self.timezone.clone()).ok()?.timestamp();
        Timestamp::from_millisecond(timestamp.as_millisecond() + millis).ok()
    }

    // newest first
    fn list_backups(&self) -> Result<Vec<Backup>, Error> {
        let read_dir = fs::read_dir(&self.log_dir).map_err(|err| {
            Error::new("failed to read log dir")
                .with_context("dir", self.log_dir.display())
                .with_source(err)
        })?;

        let mut backups = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let metadata = entry.metadata().ok()?;
                // the writer only creates files, never touch directories or symlinks
                if !metadata.is_file() {
                    return None;
                }

                let filename = entry.file_name();
                let timestamp = self.parse_backup_timestamp(filename.to_str()?)?;
                Some(Backup {
                    filepath: entry.path(),
                    timestamp,
                })
            })
            .collect::<Vec<_>>();

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    fn delete_stale_backups(&self, now: Timestamp) -> Result<(), Error> {
        if self.max_backups.is_none() && self.max_age.is_none() {
            return Ok(());
        }

        let backups = self.list_backups()?;
        let keep = self.max_backups.map_or(usize::MAX, NonZeroUsize::get);
        let cutoff = self.max_age.map(|age| {
            let age = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
            now.as_millisecond().saturating_sub(age)
        });

        for (i, backup) in backups.iter().enumerate() {
            let expired = cutoff.is_some_and(|cutoff| backup.timestamp.as_millisecond() < cutoff);
            if i < keep && !expired {
                continue;
            }

            fs::remove_file(&backup.filepath).map_err(|err| {
                Error::new("failed to remove old log")
                    .with_context("path", backup.filepath.display())
                    .with_source(err)
            })?;
        }

        Ok(())
    }

    // the first free backup name at or after `now`, a millisecond apart
    fn next_backup_filepath(&self, now: Timestamp) -> PathBuf {
        let mut timestamp = now;
        let mut backup_filepath = self.backup_filepath(timestamp);
        while backup_filepath.exists() {
            match timestamp.checked_add(SignedDuration::from_millis(1)) {
                Ok(next) => timestamp = next,
                Err(_) => break,
            }
            backup_filepath = self.backup_filepath(timestamp);
        }
        backup_filepath
    }

    fn archive_log(&self, now: Timestamp) -> Result<(), Error> {
        let current_filepath = self.current_filepath();
        let backup_filepath = self.next_backup_filepath(now);
        fs::rename(&current_filepath, &backup_filepath).map_err(|err| {
            Error::new("failed to archive log")
                .with_context("path", current_filepath.display())
                .with_source(err)
        })?;

        if let Err(err) = self.delete_stale_backups(now) {
            let err = Error::new("failed to delete stale logs").with_source(err);
            self.trap.trap(&err);
        }
        Ok(())
    }

    fn refresh_writer(&mut self, now: Timestamp, writer: &mut Option<File>) {
        if let Some(file) = writer.as_mut() {
            if let Err(err) = file.flush() {
                let err = Error::new("failed to flush previous writer").with_source(err);
                self.trap.trap(&err);
            }
        }

        if let Err(err) = self.archive_log(now) {
            let err = Error::new("failed to rotate log writer").with_source(err);
            self.trap.trap(&err);
            return;
        }

        // the old handle now points at the backup
        *writer = None;
        self.current_filesize = 0;
        match self.open_log_writer() {
            Ok(file) => *writer = Some(file),
            Err(err) => self.trap.trap(&err),
        }
    }
}

fn file_size(file: &File) -> usize {
    file.metadata()
        .map(|metadata| metadata.len() as usize)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::num::NonZeroUsize;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use jiff::Timestamp;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;

    fn start_time() -> Timestamp {
        "2024-08-10T00:00:00Z".parse().unwrap()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    fn generate_random_line() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        let mut line: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect();
        line.push('\n');
        line
    }

    #[test]
    fn test_rotate_by_size_keeps_max_backups() {
        let temp_dir = TempDir::new().unwrap();
        let max_size = 1000;
        let max_backups = 3;

        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("app.log"))
            .max_file_size(NonZeroUsize::new(max_size).unwrap())
            .max_backups(NonZeroUsize::new(max_backups))
            .clock(Clock::Manual(start_time()))
            .build()
            .unwrap();

        for i in 1..=(max_backups * 3) {
            // the line that rotated the previous file is already in this one
            let mut written = writer.state.current_filesize;
            let line = loop {
                let line = generate_random_line();
                if written + line.len() > max_size {
                    break line;
                }
                writer.write_all(line.as_bytes()).unwrap();
                written += line.len();
                assert_eq!(writer.state.current_filesize, written);
            };
            writer.state.clock.advance(Duration::from_secs(1));

            // the line that does not fit rotates
            writer.write_all(line.as_bytes()).unwrap();
            assert_eq!(writer.state.current_filesize, line.len());
            writer.flush().unwrap();

            // active file + backups
            assert_eq!(entries(temp_dir.path()).len(), 1 + i.min(max_backups));
        }

        let names = entries(temp_dir.path());
        assert!(names.contains(&"app.log".to_string()));
        // the newest backups survive
        assert_eq!(
            &names[..3],
            &[
                "app-2024-08-10T00-00-07.000.log".to_string(),
                "app-2024-08-10T00-00-08.000.log".to_string(),
                "app-2024-08-10T00-00-09.000.log".to_string(),
            ]
        );
    }

    #[test]
    fn test_remove_backups_older_than_max_age() {
        let temp_dir = TempDir::new().unwrap();
        let day = Duration::from_secs(24 * 60 * 60);

        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("app.log"))
            .max_file_size(NonZeroUsize::new(10).unwrap())
            .max_age(Some(day * 28))
            .clock(Clock::Manual(start_time()))
            .build()
            .unwrap();

        // one backup per day
        for _ in 0..5 {
            writer.write_all(b"0123456789").unwrap();
            writer.state.clock.advance(day);
        }
        assert_eq!(entries(temp_dir.path()).len(), 5);

        // 30 days later, every existing backup has expired
        writer.state.clock.advance(day * 30);
        writer.write_all(b"0123456789").unwrap();
        assert_eq!(
            entries(temp_dir.path()),
            vec![
                "app-2024-09-14T00-00-00.000.log".to_string(),
                "app.log".to_string(),
            ]
        );
    }

    #[test]
    fn test_continue_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let filepath = temp_dir.path().join("nested").join("service.log");

        {
            let mut writer = RollingFileWriterBuilder::new(&filepath).build().unwrap();
            writer.write_all(b"first\n").unwrap();
        }

        let mut writer = RollingFileWriterBuilder::new(&filepath)
            .max_file_size(NonZeroUsize::new(12).unwrap())
            .clock(Clock::Manual(start_time()))
            .build()
            .unwrap();
        assert_eq!(writer.state.current_filesize, 6);
        writer.write_all(b"second\n").unwrap();

        assert_eq!(
            entries(filepath.parent().unwrap()),
            vec![
                "service-2024-08-10T00-00-00.000.log".to_string(),
                "service.log".to_string(),
            ]
        );
        assert_eq!(fs::read_to_string(&filepath).unwrap(), "second\n");
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("app.log"))
            .max_file_size(NonZeroUsize::new(4).unwrap())
            .build()
            .unwrap();

        let err = writer.write(b"too long").unwrap_err();
        assert!(err.to_string().contains("exceeds maximum file size 4"));
        assert_eq!(entries(temp_dir.path()), vec!["app.log".to_string()]);
    }

    #[test]
    fn test_backup_name_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RollingFileWriterBuilder::new(temp_dir.path().join("app.log"))
            .build()
            .unwrap();

        let now: Timestamp = "2024-08-10T12:34:56.789Z".parse().unwrap();
        let backup = writer.state.backup_filepath(now);
        let filename = backup.file_name().unwrap().to_str().unwrap();
        assert_eq!(filename, "app-2024-08-10T12-34-56.789.log");
        assert_eq!(writer.state.parse_backup_timestamp(filename), Some(now));

        assert_eq!(writer.state.parse_backup_timestamp("app.log"), None);
        assert_eq!(writer.state.parse_backup_timestamp("app-notes.log"), None);
        assert_eq!(writer.state.parse_backup_timestamp("other-2024-08-10T12-34-56.789.log"), None);
    }

    #[derive(Debug, Default, Clone)]
    struct Trapped(Arc<Mutex<Vec<String>>>);

    impl Trap for Trapped {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_unopenable_file_is_retried_on_write() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let trapped = Trapped::default();
        let mut writer = RollingFileWriterBuilder::new(blocker.join("app.log"))
            .trap(trapped.clone())
            .build()
            .unwrap();
        {
            let trapped = trapped.0.lock().unwrap();
            assert_eq!(trapped.len(), 1);
            assert!(trapped[0].contains("failed to create log directory"), "{}", trapped[0]);
        }

        let err = writer.write(b"lost\n").unwrap_err();
        assert!(err.to_string().contains("failed to create log directory"), "{err}");

        fs::remove_file(&blocker).unwrap();
        writer.write_all(b"kept\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(blocker.join("app.log")).unwrap(), "kept\n");
    }

    #[test]
    fn test_rotations_within_one_millisecond_keep_every_backup() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("app.log"))
            .max_file_size(NonZeroUsize::new(10).unwrap())
            .clock(Clock::Manual(start_time()))
            .build()
            .unwrap();

        for i in 0..50 {
            writer.write_all(format!("line {i:03}\n").as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        let names = entries(temp_dir.path());
        assert_eq!(names.len(), 50);
        assert_eq!(names[0], "app-2024-08-10T00-00-00.000.log");
        assert_eq!(names[48], "app-2024-08-10T00-00-00.048.log");

        let mut lines = names
            .iter()
            .map(|name| fs::read_to_string(temp_dir.path().join(name)).unwrap())
            .collect::<Vec<_>>();
        lines.sort();
        assert_eq!(lines.first().unwrap(), "line 000\n");
        assert_eq!(lines.last().unwrap(), "line 049\n");
    }

    #[test]
    fn test_rejects_empty_filename() {
        let err = RollingFileWriterBuilder::new("").build().unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }
}
