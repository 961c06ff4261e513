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

use std::sync::Arc;
use std::sync::LazyLock;

use arc_swap::ArcSwap;

use crate::Config;
use crate::Error;
use crate::Logger;
use crate::append::FileBuilder;
use crate::append::Stdout;
use crate::filter::MinLevel;
use crate::filter::Sampler;

static LOGGER: LazyLock<ArcSwap<Logger>> =
    LazyLock::new(|| ArcSwap::from_pointee(Logger::production()));

/// Returns the shared logger.
///
/// Until [`init`] or [`set_logger`] is called, this is [`Logger::production`].
pub fn logger() -> Arc<Logger> {
    LOGGER.load_full()
}

/// Replace the shared logger wholesale, then flush the previous one.
///
/// Concurrent callers observe either the previous logger or the new one, never a mix. Callers
/// still holding the previous logger can keep using it; its appenders flush again when the last
/// of them drops it.
pub fn set_logger(logger: Logger) {
    let previous = LOGGER.swap(Arc::new(logger));
    previous.flush();
}

/// Build the logger described by `config` without installing it.
///
/// An empty `filename` writes colored text lines to stdout; otherwise plain text lines go to a
/// file at that path, rotated at 100 MiB and pruned to 10 backups no older than 28 days. Both
/// drop records below the configured level and sample repeated messages: per second, the first
/// 100 records with the same level and message pass, then every 100th.
///
/// # Errors
///
/// Return an error if the level is not a known severity name, or if `filename` has no file name
/// component. A log file that cannot be opened is not an error: each failed write is reported
/// to stderr and the open is retried on the next one.
pub fn build_logger(config: &Config) -> Result<Logger, Error> {
    let level = config.parse_level()?;

    let builder = crate::builder();
    let builder = if config.filename().is_empty() {
        builder.dispatch(|d| {
            d.filter(MinLevel(level))
                .filter(Sampler::default())
                .append(Stdout::default())
        })
    } else {
        let file = FileBuilder::new(config.filename()).build()?;
        builder.dispatch(move |d| {
            d.filter(MinLevel(level))
                .filter(Sampler::default())
                .append(file)
        })
    };

    Ok(builder.build())
}

/// Configure the shared logger from `config`.
///
/// # Errors
///
/// Return an error if the configuration is invalid. The shared logger is left unchanged.
///
/// # Examples
///
/// ```
/// use levelog::Config;
///
/// levelog::try_init(&Config::new("warn")).unwrap();
/// assert!(levelog::try_init(&Config::new("verbose")).is_err());
/// ```
pub fn try_init(config: &Config) -> Result<(), Error> {
    let logger = build_logger(config)?;
    set_logger(logger);
    Ok(())
}

/// Configure the shared logger from `config`.
///
/// # Panics
///
/// Panic if the configuration is invalid, with the reason as the message.
pub fn init(config: &Config) {
    if let Err(err) = try_init(config) {
        panic!("failed to initialize logger: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tempfile::TempDir;

    use super::*;
    use crate::Append;
    use crate::Trap;
    use crate::record::Level;
    use crate::record::Record;

    // tests replacing the shared logger
    static LOCK: Mutex<()> = Mutex::new(());

    #[derive(Debug, Default, Clone)]
    struct Flushes(Arc<AtomicUsize>);

    impl Append for Flushes {
        fn append(&self, _: &Record) -> Result<(), Error> {
            Ok(())
        }

        fn flush(&self) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Trapped(Arc<Mutex<Vec<String>>>);

    impl Trap for Trapped {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_console_config_writes_colored_text_to_stdout() {
        let logger = build_logger(&Config::new("warn")).unwrap();
        let debug = format!("{logger:?}");
        assert!(debug.contains("Stdout"), "{debug}");
        assert!(debug.contains("TextLayout"), "{debug}");
        assert!(debug.contains("no_color: false"), "{debug}");
        assert!(debug.contains("MinLevel(WARN)"), "{debug}");
        assert!(!logger.enabled(Level::Info));
    }

    #[test]
    fn test_file_config_writes_plain_text() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new("debug").with_filename(temp_dir.path().join("app.log"));
        let logger = build_logger(&config).unwrap();
        let debug = format!("{logger:?}");
        assert!(debug.contains("RollingFileWriter"), "{debug}");
        assert!(debug.contains("no_color: true"), "{debug}");
        assert!(logger.enabled(Level::Debug));
    }

    #[test]
    fn test_unwritable_file_is_not_a_config_error() {
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let config = Config::new("info").with_filename(blocker.join("app.log"));
        init(&config);
        crate::logger().info(format_args!("reported, not raised"));

        let trapped = Trapped::default();
        let file = FileBuilder::new(blocker.join("app.log"))
            .trap(trapped.clone())
            .build()
            .unwrap();
        let logger = crate::builder()
            .trap(trapped.clone())
            .dispatch(|d| d.append(file))
            .build();
        logger.error(format_args!("disk gone"));

        let trapped = trapped.0.lock().unwrap();
        assert_eq!(trapped.len(), 2, "{trapped:?}");
        assert!(trapped[0].contains("failed to create log directory"), "{}", trapped[0]);
        assert!(trapped[1].contains("failed to create log directory"), "{}", trapped[1]);
        assert!(trapped[1].contains("disk gone"), "{}", trapped[1]);
    }

    #[test]
    fn test_set_logger_flushes_previous_logger() {
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let flushes = Flushes::default();
        let append = flushes.clone();
        set_logger(crate::builder().dispatch(|d| d.append(append)).build());

        let held = crate::logger();
        set_logger(Logger::production());
        assert_eq!(flushes.0.load(Ordering::SeqCst), 1);

        held.flush();
        assert_eq!(flushes.0.load(Ordering::SeqCst), 2);
    }
}
