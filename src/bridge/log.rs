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

use std::borrow::Cow;

use crate::Error;
use crate::kv::Key;
use crate::kv::Value;
use crate::logger;
use crate::record::Level;

struct LogCrateLogger(());

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        logger().enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        let mut logger = logger();
        if !logger.enabled(level) {
            return;
        }

        // key-values
        let mut kvs = Vec::new();

        struct KeyValueVisitor<'b> {
            kvs: &'b mut Vec<(Key, Value)>,
        }

        impl<'a> log::kv::VisitSource<'a> for KeyValueVisitor<'_> {
            fn visit_pair(
                &mut self,
                key: log::kv::Key<'a>,
                value: log::kv::Value<'a>,
            ) -> Result<(), log::kv::Error> {
                self.kvs
                    .push((Key::from(key.as_str().to_string()), convert_value(&value)));
                Ok(())
            }
        }

        let mut visitor = KeyValueVisitor { kvs: &mut kvs };
        // the visitor itself never fails
        let _ = record.key_values().visit(&mut visitor);
        if !kvs.is_empty() {
            let mut derived = (*logger).clone();
            for (k, v) in kvs {
                derived = derived.with(k, v);
            }
            logger = derived.into();
        }

        logger.log_at(level, *record.args(), record.file(), record.line());
    }

    fn flush(&self) {
        logger().flush();
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

fn convert_value(value: &log::kv::Value) -> Value {
    if let Some(v) = value.to_bool() {
        Value::Bool(v)
    } else if let Some(v) = value.to_u64() {
        Value::U64(v)
    } else if let Some(v) = value.to_i64() {
        Value::I64(v)
    } else if let Some(v) = value.to_f64() {
        Value::F64(v)
    } else {
        Value::Str(Cow::Owned(value.to_string()))
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to set up a proxy, and all records from the log crate
/// are forwarded to the current shared logger, at the time of each call. `trace` records are
/// logged at [`Level::Debug`].
///
/// This function will set the global maximum log level to `Trace`, leaving level decisions to
/// the shared logger. To override this, call [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// levelog::bridge::try_setup_log_crate().unwrap();
/// log::info!("forwarded");
/// ```
pub fn try_setup_log_crate() -> Result<(), Error> {
    static LOGGER: LogCrateLogger = LogCrateLogger(());
    log::set_logger(&LOGGER)
        .map_err(|err| Error::new("failed to set up the log crate logger").with_source(err))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger.
///
/// See [`try_setup_log_crate`].
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate() {
    if let Err(err) = try_setup_log_crate() {
        panic!("levelog::bridge::setup_log_crate must be called once: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(Level::from(log::Level::Trace), Level::Debug);
        assert_eq!(Level::from(log::Level::Debug), Level::Debug);
        assert_eq!(Level::from(log::Level::Info), Level::Info);
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(log::Level::Error), Level::Error);
    }

    #[test]
    fn test_convert_value() {
        assert_eq!(convert_value(&log::kv::Value::from(true)), Value::Bool(true));
        assert_eq!(convert_value(&log::kv::Value::from(7u8)), Value::U64(7));
        assert_eq!(convert_value(&log::kv::Value::from(-7i32)), Value::I64(-7));
        assert_eq!(
            convert_value(&log::kv::Value::from("eu-west")),
            Value::Str(Cow::Borrowed("eu-west"))
        );
    }
}
