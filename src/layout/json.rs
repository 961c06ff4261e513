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

use jiff::Timestamp;
use jiff::TimestampDisplayWithOffset;
use jiff::tz::TimeZone;
use serde::Serialize;
use serde_json::Map;

use crate::Error;
use crate::layout::Layout;
use crate::layout::caller;
use crate::record::Record;

/// A JSON layout for formatting log records.
///
/// Output format:
///
/// ```json
/// {"level":"error","ts":"2024-08-11T22:44:57.172051+08:00","logger":"billing","caller":"server/conn.rs:51","msg":"Hello error!"}
/// {"level":"info","ts":"2024-08-11T22:44:57.172246+08:00","caller":"server/conn.rs:53","msg":"Hello info!","shard":3}
/// ```
///
/// Persistent fields are inlined into the object. Records at terminal levels carry a
/// `stacktrace` key.
///
/// # Examples
///
/// ```
/// use levelog::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    tz: Option<TimeZone>,
}

impl JsonLayout {
    /// Set the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use levelog::layout::JsonLayout;
    ///
    /// let layout = JsonLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct RecordLine<'a> {
    level: &'a str,
    #[serde(serialize_with = "serialize_timestamp")]
    ts: TimestampDisplayWithOffset,
    #[serde(skip_serializing_if = "str::is_empty")]
    logger: &'a str,
    caller: String,
    msg: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stacktrace: Option<&'a str>,
    #[serde(flatten)]
    kvs: Map<String, serde_json::Value>,
}

fn serialize_timestamp<S>(
    timestamp: &TimestampDisplayWithOffset,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&format_args!("{timestamp:.6}"))
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let ts = Timestamp::try_from(record.time())
            .map_err(|err| Error::new("record time out of range").with_source(err))?;
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        let offset = tz.to_offset(ts);

        let mut kvs = Map::new();
        for (k, v) in record.key_values() {
            let value = serde_json::to_value(v)
                .map_err(|err| Error::new("failed to encode fields").with_source(err))?;
            kvs.insert(k.to_string(), value);
        }

        let record_line = RecordLine {
            level: record.level().name(),
            ts: ts.display_with_offset(offset),
            logger: record.target(),
            caller: caller(record),
            msg: record.payload(),
            stacktrace: record.stacktrace(),
            kvs,
        };

        serde_json::to_vec(&record_line)
            .map_err(|err| Error::new("failed to encode record").with_source(err))
    }
}
