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

/// Log a message at [`Level::Debug`](crate::record::Level::Debug) with the shared logger.
///
/// # Examples
///
/// ```
/// let peer = "10.0.0.7";
/// levelog::debug!("handshake with {peer} done");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::logger().debug(::core::format_args!($($arg)+))
    };
}

/// Log a message at [`Level::Info`](crate::record::Level::Info) with the shared logger.
///
/// # Examples
///
/// ```
/// levelog::info!("listening on port {}", 8080);
/// ```
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::logger().info(::core::format_args!($($arg)+))
    };
}

/// Log a message at [`Level::Warn`](crate::record::Level::Warn) with the shared logger.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::logger().warn(::core::format_args!($($arg)+))
    };
}

/// Log a message at [`Level::Error`](crate::record::Level::Error) with the shared logger.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::logger().error(::core::format_args!($($arg)+))
    };
}

/// Log a message at [`Level::DPanic`](crate::record::Level::DPanic) with the shared logger,
/// unwinding afterwards if it is in development mode.
#[macro_export]
macro_rules! dpanic {
    ($($arg:tt)+) => {
        $crate::logger().dpanic(::core::format_args!($($arg)+))
    };
}

/// Log a message at [`Level::Panic`](crate::record::Level::Panic) with the shared logger, then
/// unwind with the message as the panic payload.
///
/// The record is written whatever the configured minimum level is.
///
/// # Examples
///
/// ```should_panic
/// let attempts = 0;
/// levelog::panic!("no attempts left: {attempts}");
/// ```
#[macro_export]
macro_rules! panic {
    ($($arg:tt)+) => {
        $crate::logger().panic(::core::format_args!($($arg)+)).raise()
    };
}

/// Log a message at [`Level::Fatal`](crate::record::Level::Fatal) with the shared logger, flush,
/// and exit the process with status 1.
///
/// The record is written whatever the configured minimum level is.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::logger().fatal(::core::format_args!($($arg)+)).raise()
    };
}
