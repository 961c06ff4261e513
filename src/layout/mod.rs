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

//! Layouts for formatting log records.

use std::fmt;

pub use self::json::JsonLayout;
pub use self::text::LevelColor;
pub use self::text::TextLayout;

use crate::Error;
use crate::record::Record;

mod json;
mod text;

/// A layout for formatting log records.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a log record into a single line, without the line ending.
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error>;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

// `dir/file.rs:line`, keeping only the last directory of the call site
fn caller(record: &Record) -> String {
    let file = record.file().unwrap_or_default();
    let line = record.line().unwrap_or_default();

    let short = match file.rfind(is_separator) {
        None => file,
        Some(last) => match file[..last].rfind(is_separator) {
            None => file,
            Some(prev) => &file[prev + 1..],
        },
    };
    format!("{short}:{line}")
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}
