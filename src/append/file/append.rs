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

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use crate::Error;
use crate::Layout;
use crate::Trap;
use crate::append::Append;
use crate::append::file::rolling::RollingFileWriter;
use crate::append::file::rolling::RollingFileWriterBuilder;
use crate::layout::TextLayout;
use crate::record::Record;

const DEFAULT_MAX_FILE_SIZE: NonZeroUsize = NonZeroUsize::new(100 * 1024 * 1024).unwrap();
const DEFAULT_MAX_BACKUPS: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// A builder to configure and create a [`File`] appender.
///
/// The defaults rotate at 100 MiB, keep at most 10 backups for at most 28 days, and name
/// backups in local time.
#[derive(Debug)]
pub struct FileBuilder {
    builder: RollingFileWriterBuilder,
    layout: Box<dyn Layout>,
}

impl FileBuilder {
    /// Create a new file appender builder writing to `filepath`.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        let builder = RollingFileWriterBuilder::new(filepath)
            .max_file_size(DEFAULT_MAX_FILE_SIZE)
            .max_backups(Some(DEFAULT_MAX_BACKUPS))
            .max_age(Some(DEFAULT_MAX_AGE))
            .local_time(true);

        Self {
            builder,
            layout: Box::new(TextLayout::default().no_color()),
        }
    }

    /// Build the [`File`] appender.
    ///
    /// # Errors
    ///
    /// Return an error if the path has no file name.
    ///
    /// If the log directory cannot be created or the log file cannot be opened, the failure
    /// goes to the trap and the open is retried on each append.
    pub fn build(self) -> Result<File, Error> {
        let FileBuilder { builder, layout } = self;
        let writer = builder.build()?;
        Ok(File::new(writer, layout))
    }

    /// Set the layout for the logs.
    ///
    /// Default to [`TextLayout`] without colors.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelog::append::FileBuilder;
    /// use levelog::layout::JsonLayout;
    ///
    /// let builder = FileBuilder::new("logs/app.log");
    /// builder.layout(JsonLayout::default());
    /// ```
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the trap for errors raised while rotating.
    ///
    /// Default to [`DefaultTrap`](crate::trap::DefaultTrap).
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.builder = self.builder.trap(trap);
        self
    }

    /// Set the size in bytes at which the current file is rotated.
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.builder = self.builder.max_file_size(n);
        self
    }

    /// Set the maximum number of backups to keep. `None` keeps all of them.
    pub fn max_backups(mut self, n: Option<NonZeroUsize>) -> Self {
        self.builder = self.builder.max_backups(n);
        self
    }

    /// Set the maximum age of backups. `None` keeps them regardless of age.
    pub fn max_age(mut self, age: Option<Duration>) -> Self {
        self.builder = self.builder.max_age(age);
        self
    }

    /// Whether backup names are in local time. If false, UTC is used.
    pub fn local_time(mut self, local_time: bool) -> Self {
        self.builder = self.builder.local_time(local_time);
        self
    }
}

/// An appender that writes log records to a size-rotated file.
#[derive(Debug)]
pub struct File {
    writer: Mutex<RollingFileWriter>,
    layout: Box<dyn Layout>,
}

impl File {
    fn new(writer: RollingFileWriter, layout: Box<dyn Layout>) -> Self {
        let writer = Mutex::new(writer);
        Self { writer, layout }
    }

    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Append for File {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        let mut writer = self.writer();
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(Error::from_io_error)?;
        Ok(())
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(|e| e.into_inner());
        let _ = writer.flush();
    }
}
