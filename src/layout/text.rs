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

use std::fmt::Write;

use colored::Color;
use colored::ColoredString;
use colored::Colorize;
use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde_json::Map;

use crate::Error;
use crate::layout::Layout;
use crate::layout::caller;
use crate::record::Level;
use crate::record::Record;

/// A layout that formats log record as optionally colored, tab-separated text.
///
/// Output format:
///
/// ```text
/// 2024/08/11 22:44:57+08	ERROR	billing	server/conn.rs:51	Hello error!
/// 2024/08/11 22:44:57+08	WARN	billing	server/conn.rs:52	Hello warn!	{"shard":3}
/// 2024/08/11 22:44:57+08	INFO	server/conn.rs:53	Hello from an unnamed logger!
/// ```
///
/// The logger name column is left out for unnamed loggers. Persistent fields follow the message
/// as a JSON object. Records at terminal levels carry their stack trace on the following lines.
///
/// By default, log levels are colored. Call [`no_color`](TextLayout::no_color) to disable it, for
/// example when writing to files.
///
/// Timestamps are rendered in the system timezone unless [`timezone`](TextLayout::timezone) is
/// set.
///
/// # Examples
///
/// ```
/// use levelog::layout::TextLayout;
///
/// let layout = TextLayout::default().no_color();
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    colors: LevelColor,
    no_color: bool,
    timezone: TimeZone,
    timestamp_format: Option<fn(Timestamp, &TimeZone) -> String>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            colors: LevelColor::default(),
            no_color: false,
            timezone: TimeZone::system(),
            timestamp_format: None,
        }
    }
}

impl TextLayout {
    /// Customize the colors of log levels.
    ///
    /// No effect if `no_color` is set.
    pub fn colors(mut self, colors: LevelColor) -> Self {
        self.colors = colors;
        self
    }

    /// Disable colored output.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Set the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use levelog::layout::TextLayout;
    ///
    /// let layout = TextLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// Set a user-defined timestamp format function.
    ///
    /// For formatting options, refer to the [jiff::fmt::strtime] documentation.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelog::layout::TextLayout;
    ///
    /// let layout = TextLayout::default()
    ///     .timestamp_format(|ts, tz| format!("{:.3}", ts.display_with_offset(tz.to_offset(ts))));
    /// ```
    pub fn timestamp_format(mut self, format: fn(Timestamp, &TimeZone) -> String) -> Self {
        self.timestamp_format = Some(format);
        self
    }

    fn format_record_level(&self, level: Level) -> ColoredString {
        self.colors.colorize_record_level(self.no_color, level)
    }
}

// 2006/01/02 15:04:05-07
fn default_timestamp_format(ts: Timestamp, tz: &TimeZone) -> String {
    let zoned = ts.to_zoned(tz.clone());
    let offset_hours = zoned.offset().seconds() / 3600;
    format!("{}{offset_hours:+03}", zoned.strftime("%Y/%m/%d %H:%M:%S"))
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let ts = Timestamp::try_from(record.time())
            .map_err(|err| Error::new("record time out of range").with_source(err))?;
        let mut text = match self.timestamp_format {
            Some(format) => format(ts, &self.timezone),
            None => default_timestamp_format(ts, &self.timezone),
        };

        let level = self.format_record_level(record.level());
        write!(&mut text, "\t{level}").map_err(Error::from_fmt_error)?;

        let name = record.target();
        if !name.is_empty() {
            write!(&mut text, "\t{name}").map_err(Error::from_fmt_error)?;
        }

        let caller = caller(record);
        let message = record.payload();
        write!(&mut text, "\t{caller}\t{message}").map_err(Error::from_fmt_error)?;

        let kvs = record.key_values();
        if !kvs.is_empty() {
            let fields = kvs
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::to_value(v)))
                .map(|(k, v)| v.map(|v| (k, v)))
                .collect::<Result<Map<_, _>, _>>()
                .map_err(|err| Error::new("failed to encode fields").with_source(err))?;
            write!(&mut text, "\t{}", serde_json::Value::Object(fields))
                .map_err(Error::from_fmt_error)?;
        }

        if let Some(stacktrace) = record.stacktrace() {
            write!(&mut text, "\n{stacktrace}").map_err(Error::from_fmt_error)?;
        }

        Ok(text.into_bytes())
    }
}

/// Colors for different log levels.
#[derive(Debug, Clone)]
pub struct LevelColor {
    /// Color for debug level logs.
    pub debug: Color,
    /// Color for info level logs.
    pub info: Color,
    /// Color for warning level logs.
    pub warn: Color,
    /// Color for error level logs.
    pub error: Color,
    /// Color for dpanic, panic and fatal level logs.
    pub panic: Color,
}

impl Default for LevelColor {
    fn default() -> Self {
        Self {
            debug: Color::Magenta,
            info: Color::Blue,
            warn: Color::Yellow,
            error: Color::Red,
            panic: Color::Red,
        }
    }
}

impl LevelColor {
    /// Colorize the log level.
    pub fn colorize_record_level(&self, no_color: bool, level: Level) -> ColoredString {
        if no_color {
            ColoredString::from(level.to_string())
        } else {
            let color = match level {
                Level::Debug => self.debug,
                Level::Info => self.info,
                Level::Warn => self.warn,
                Level::Error => self.error,
                Level::DPanic | Level::Panic | Level::Fatal => self.panic,
            };
            ColoredString::from(level.to_string()).color(color)
        }
    }
}
