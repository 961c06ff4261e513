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

//! Declarative logger configuration supplied once at process startup.

use std::path::Path;

use serde::Deserialize;

use crate::Error;
use crate::record::Level;

/// The logger configuration.
///
/// Host applications usually deserialize it from their own configuration file:
///
/// ```
/// let config: levelog::Config =
///     serde_json::from_str(r#"{"level": "warn", "filename": "logs/app.log"}"#).unwrap();
///
/// assert_eq!(config.level(), "warn");
/// assert_eq!(config.filename(), "logs/app.log");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    level: String,
    filename: String,
}

impl Config {
    /// Create a config writing to the console at the given minimum level.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            filename: String::new(),
        }
    }

    /// Write to a rotating file at `path` instead of the console.
    ///
    /// An empty path means the console.
    pub fn with_filename(mut self, path: impl AsRef<Path>) -> Self {
        self.filename = path.as_ref().to_string_lossy().into_owned();
        self
    }

    /// The configured minimum level, as written.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// The configured file path; empty for the console.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Parse the configured minimum level, case-insensitively.
    pub fn parse_level(&self) -> Result<Level, Error> {
        self.level
            .parse()
            .map_err(|err| Error::new("invalid logger configuration").with_source(err))
    }
}
