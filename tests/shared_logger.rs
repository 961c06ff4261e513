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

//! Tests that drive the shared logger through `try_init` and the macros.
//!
//! They all replace the one shared logger, so each holds `LOCK` while it runs.

use std::fs;
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;

use levelog::Config;
use levelog::Level;
use tempfile::TempDir;

static LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn init_file(dir: &TempDir, level: &str) -> std::path::PathBuf {
    let path = dir.path().join(format!("{level}.log"));
    levelog::try_init(&Config::new(level).with_filename(&path)).unwrap();
    path
}

// the level column of every record line, skipping stack trace lines
fn levels(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter_map(|line| {
            let mut columns = line.split('\t');
            let _time = columns.next()?;
            let level = columns.next()?;
            level.parse::<Level>().is_ok().then(|| level.to_string())
        })
        .collect()
}

#[test]
fn test_records_below_min_level_are_dropped() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();

    for (min, expected) in [
        ("debug", vec!["DEBUG", "INFO", "WARN", "ERROR", "DPANIC"]),
        ("info", vec!["INFO", "WARN", "ERROR", "DPANIC"]),
        ("WARN", vec!["WARN", "ERROR", "DPANIC"]),
        ("Error", vec!["ERROR", "DPANIC"]),
        ("dpanic", vec!["DPANIC"]),
        ("panic", vec![]),
        ("fatal", vec![]),
    ] {
        let path = init_file(&dir, min);
        levelog::debug!("d");
        levelog::info!("i");
        levelog::warn!("w");
        levelog::error!("e");
        levelog::dpanic!("dp");
        assert_eq!(levels(&path), expected, "min level {min}");
    }
}

#[test]
fn test_invalid_level_keeps_previous_logger() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "info");

    let err = levelog::try_init(&Config::new("verbose")).unwrap_err();
    assert!(err.to_string().contains("invalid logger configuration"), "{err}");
    assert!(format!("{err:?}").contains(r#"malformed level: "verbose""#), "{err:?}");

    levelog::info!("still here");
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\tstill here\n"), "{content}");
}

#[test]
fn test_init_panics_on_invalid_level() {
    let _guard = lock();
    let result = panic::catch_unwind(|| levelog::init(&Config::new("loud")));
    let payload = result.unwrap_err();
    let message = payload.downcast_ref::<String>().unwrap();
    assert!(message.contains("failed to initialize logger"), "{message}");
}

#[test]
fn test_reinit_to_console_stops_file_output() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "info");

    levelog::info!("to file");
    levelog::try_init(&Config::new("info")).unwrap();
    levelog::info!("to console");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\tto file\n"));
    assert!(!content.contains("to console"));
}

#[test]
fn test_panic_is_written_even_at_fatal_level() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "fatal");

    let result = panic::catch_unwind(|| {
        levelog::panic!("x={}", 5);
    });
    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<String>().unwrap(), "x=5");

    assert_eq!(levels(&path), vec!["PANIC"]);
    let content = fs::read_to_string(&path).unwrap();
    let first = content.lines().next().unwrap();
    assert!(first.ends_with("\tx=5"), "{first}");
    // the stack trace follows the record line
    assert!(content.lines().count() > 1);
}

#[test]
fn test_repeated_messages_are_sampled() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "info");

    for _ in 0..250 {
        levelog::info!("cache miss");
    }
    for i in 0..50 {
        levelog::info!("request {i}");
    }

    let content = fs::read_to_string(&path).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.iter().filter(|l| l.ends_with("\tcache miss")).count(), 101);
    assert_eq!(lines.iter().filter(|l| l.contains("\trequest ")).count(), 50);
}

#[test]
fn test_concurrent_records_never_splice() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "debug");

    let handles = (0..8)
        .map(|t| {
            thread::spawn(move || {
                for i in 0..100 {
                    levelog::info!("worker {t} step {i} {}", "-".repeat(100));
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs::read_to_string(&path).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 800);
    for line in lines {
        let columns = line.split('\t').collect::<Vec<_>>();
        assert_eq!(columns.len(), 4, "{line}");
        assert_eq!(columns[1], "INFO");
        assert!(columns[3].starts_with("worker "), "{line}");
        assert!(columns[3].ends_with(&"-".repeat(100)), "{line}");
    }
}

#[test]
fn test_record_carries_call_site_name_and_fields() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let path = init_file(&dir, "info");

    let logger = levelog::logger().named("api").with("user", "ann").with("retries", 2);
    let line = line!() + 1;
    logger.warn(format_args!("slow response"));

    let content = fs::read_to_string(&path).unwrap();
    let columns = content.trim_end().split('\t').collect::<Vec<_>>();
    assert_eq!(columns[1], "WARN");
    assert_eq!(columns[2], "api");
    assert_eq!(columns[3], format!("tests/shared_logger.rs:{line}"));
    assert_eq!(columns[4], "slow response");
    let fields: serde_json::Value = serde_json::from_str(columns[5]).unwrap();
    assert_eq!(fields, serde_json::json!({"user": "ann", "retries": 2}));
}

#[test]
fn test_unwritable_file_recovers_once_writable() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let path = blocker.join("app.log");

    levelog::init(&Config::new("info").with_filename(&path));
    levelog::info!("while blocked");

    fs::remove_file(&blocker).unwrap();
    levelog::info!("after recovery");

    let content = fs::read_to_string(&path).unwrap();
    assert!(!content.contains("while blocked"));
    assert!(content.ends_with("\tafter recovery\n"), "{content}");
}
