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

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::Append;
use crate::Error;
use crate::Filter;
use crate::Trap;
use crate::append::Stderr;
use crate::filter::FilterResult;
use crate::filter::MinLevel;
use crate::filter::Sampler;
use crate::kv::Key;
use crate::kv::Value;
use crate::layout::JsonLayout;
use crate::record::Level;
use crate::record::Metadata;
use crate::record::Record;

/// A handle that formats messages and dispatches them as records.
///
/// Cloning a logger is cheap: clones share the same dispatches. [`Logger::with`] and
/// [`Logger::named`] derive loggers that carry extra context on top of them.
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    fields: Vec<(Key, Value)>,
    core: Arc<Core>,
}

#[derive(Debug)]
struct Core {
    development: bool,
    trap: Box<dyn Trap>,
    dispatches: Vec<Dispatch>,
}

impl Logger {
    pub(super) fn new(
        name: String,
        development: bool,
        trap: Box<dyn Trap>,
        dispatches: Vec<Dispatch>,
    ) -> Self {
        let core = Arc::new(Core {
            development,
            trap,
            dispatches,
        });
        Self {
            name,
            fields: vec![],
            core,
        }
    }

    /// The logger used before any configuration is applied.
    ///
    /// It writes JSON lines to stderr at [`Level::Info`] and above, with the default
    /// [`Sampler`].
    pub fn production() -> Self {
        crate::builder()
            .dispatch(|d| {
                d.filter(MinLevel(Level::Info))
                    .filter(Sampler::default())
                    .append(Stderr::default().with_layout(JsonLayout::default()))
            })
            .build()
    }

    /// The name of this logger, empty if unnamed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether development mode is on.
    pub fn is_development(&self) -> bool {
        self.core.development
    }

    /// Whether a record at `level` would pass the metadata checks of any dispatch.
    pub fn enabled(&self, level: Level) -> bool {
        let metadata = Metadata::builder().level(level).target(&self.name).build();
        self.core
            .dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(&metadata))
    }

    /// Derive a logger that attaches `key = value` to every record.
    ///
    /// # Examples
    ///
    /// ```
    /// let logger = levelog::logger().with("request_id", 42).with("tenant", "acme");
    /// logger.info(format_args!("accepted"));
    /// ```
    #[must_use]
    pub fn with(&self, key: impl Into<Key>, value: impl Into<Value>) -> Logger {
        let mut logger = self.clone();
        logger.fields.push((key.into(), value.into()));
        logger
    }

    /// Derive a logger named `<name>.<child>`, or `<child>` if this one is unnamed.
    #[must_use]
    pub fn named(&self, child: &str) -> Logger {
        let mut logger = self.clone();
        if logger.name.is_empty() {
            logger.name = child.to_string();
        } else {
            logger.name = format!("{}.{child}", self.name);
        }
        logger
    }

    /// Log a message at `level`, reporting the caller's location.
    ///
    /// This never terminates, even for terminal levels; use [`Logger::panic`] or
    /// [`Logger::fatal`] for that.
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let location = Location::caller();
        let payload = match args.as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(args.to_string()),
        };
        self.write(level, payload, Some(location.file()), Some(location.line()));
    }

    /// Log a message at [`Level::Debug`].
    #[track_caller]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    /// Log a message at [`Level::Info`].
    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    /// Log a message at [`Level::Warn`].
    #[track_caller]
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    /// Log a message at [`Level::Error`].
    #[track_caller]
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    /// Log a message at [`Level::DPanic`]. In development mode, unwind afterwards.
    #[track_caller]
    pub fn dpanic(&self, args: fmt::Arguments<'_>) {
        if !self.core.development {
            self.log(Level::DPanic, args);
            return;
        }

        let location = Location::caller();
        let message = args.to_string();
        self.write(
            Level::DPanic,
            Cow::Borrowed(&message),
            Some(location.file()),
            Some(location.line()),
        );
        self.flush();
        Termination::Panic(message).raise()
    }

    /// Log a message at [`Level::Panic`] regardless of the configured minimum level, flush, and
    /// return the request to unwind.
    ///
    /// # Examples
    ///
    /// ```should_panic
    /// let logger = levelog::logger();
    /// logger.panic(format_args!("invariant broken: x={}", 5)).raise();
    /// ```
    #[track_caller]
    pub fn panic(&self, args: fmt::Arguments<'_>) -> Termination {
        let message = self.terminate(Level::Panic, args, Location::caller());
        Termination::Panic(message)
    }

    /// Log a message at [`Level::Fatal`] regardless of the configured minimum level, flush, and
    /// return the request to exit with status 1.
    #[track_caller]
    pub fn fatal(&self, args: fmt::Arguments<'_>) -> Termination {
        self.terminate(Level::Fatal, args, Location::caller());
        Termination::Exit(1)
    }

    /// Flush every appender, reporting failures to the trap.
    pub fn flush(&self) {
        for dispatch in &self.core.dispatches {
            if let Err(err) = dispatch.flush() {
                let err = Error::new("failed to flush logger").with_source(err);
                self.core.trap.trap(&err);
            }
        }
    }

    /// Log a record with an explicit call site.
    pub(crate) fn log_at(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
        file: Option<&str>,
        line: Option<u32>,
    ) {
        if self.enabled(level) {
            self.write(level, Cow::Owned(args.to_string()), file, line);
        }
    }

    fn terminate(&self, level: Level, args: fmt::Arguments<'_>, location: &Location) -> String {
        let message = args.to_string();
        self.write(
            level,
            Cow::Borrowed(&message),
            Some(location.file()),
            Some(location.line()),
        );
        self.flush();
        message
    }

    fn write(&self, level: Level, payload: Cow<str>, file: Option<&str>, line: Option<u32>) {
        let stacktrace = level
            .is_terminal()
            .then(|| Cow::Owned(Backtrace::force_capture().to_string()));

        let record = Record::builder()
            .level(level)
            .target(&self.name)
            .file(file)
            .line(line)
            .payload(payload)
            .stacktrace(stacktrace)
            .key_values(self.fields.as_slice())
            .build();

        for dispatch in &self.core.dispatches {
            if let Err(err) = dispatch.log(&record) {
                let err = err.with_context("payload", record.payload());
                self.core.trap.trap(&err);
            }
        }
    }
}

/// A request to end the current thread or process, returned after a terminal record is written.
#[must_use = "call `raise` to perform the termination"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Unwind the current thread with the message as the panic payload.
    Panic(String),
    /// Exit the process with the given status.
    Exit(i32),
}

impl Termination {
    /// Perform the termination.
    pub fn raise(self) -> ! {
        match self {
            Termination::Panic(message) => std::panic::panic_any(message),
            Termination::Exit(code) => std::process::exit(code),
        }
    }
}

/// A grouped set of appenders and filters.
///
/// The [`Logger`] dispatches log records to one or more [`Dispatch`] instances.
/// Each [`Dispatch`] instance contains a set of filters and appenders.
///
/// `filters` are used to determine whether a log record should be passed to the appenders.
/// `appends` are used to write log records to a destination.
#[derive(Debug)]
pub(super) struct Dispatch {
    filters: Vec<Box<dyn Filter>>,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(filters: Vec<Box<dyn Filter>>, appends: Vec<Box<dyn Append>>) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one appender"
        );

        Self { filters, appends }
    }

    fn enabled(&self, metadata: &Metadata) -> bool {
        for filter in &self.filters {
            match filter.enabled(metadata) {
                FilterResult::Reject => return false,
                FilterResult::Accept => return true,
                FilterResult::Neutral => {}
            }
        }

        true
    }

    fn log(&self, record: &Record) -> Result<(), Error> {
        for filter in &self.filters {
            match filter.matches(record) {
                FilterResult::Reject => return Ok(()),
                FilterResult::Accept => break,
                FilterResult::Neutral => {}
            }
        }

        for append in &self.appends {
            append.append(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        for append in &self.appends {
            append.flush()?;
        }
        Ok(())
    }
}
