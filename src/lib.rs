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

//! Levelog is a process-wide leveled logging facade.
//!
//! # Overview
//!
//! A single shared [`Logger`] is configured once from a [`Config`] and then used from anywhere
//! through the leveled macros. Records below the configured level are dropped, repeated messages
//! are sampled, and lines go either to the console with colored levels or to a file rotated by
//! size. Before configuration, a production logger writing JSON lines to stderr is in place, so
//! logging early in startup is never lost.
//!
//! Severities, from least to most severe, are `debug`, `info`, `warn`, `error`, `dpanic`,
//! `panic` and `fatal`. [`panic!`] unwinds after logging and [`fatal!`] exits the process with
//! status 1; both write their record whatever the configured level is.
//!
//! # Examples
//!
//! Log to the console at info level and above:
//!
//! ```
//! use levelog::Config;
//!
//! levelog::init(&Config::new("info"));
//!
//! levelog::info!("server started on port {}", 8080);
//! levelog::debug!("not written");
//! ```
//!
//! Log to a rotating file, with persistent fields on a derived logger:
//!
//! ```
//! use levelog::Config;
//!
//! let dir = std::env::temp_dir().join("levelog-doc");
//! levelog::try_init(&Config::new("debug").with_filename(dir.join("app.log"))).unwrap();
//!
//! let logger = levelog::logger().named("billing").with("invoice", 1042);
//! logger.warn(format_args!("payment retried"));
//! ```
//!
//! Dispatches can also be assembled by hand:
//!
//! ```
//! use levelog::append;
//! use levelog::filter::MinLevel;
//! use levelog::record::Level;
//!
//! levelog::builder()
//!     .name("worker")
//!     .dispatch(|d| {
//!         d.filter(MinLevel(Level::Error))
//!             .append(append::Stderr::default())
//!     })
//!     .dispatch(|d| {
//!         d.filter(MinLevel(Level::Info))
//!             .append(append::Stdout::default())
//!     })
//!     .apply();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod bridge;
pub mod filter;
pub mod kv;
pub mod layout;
pub mod record;
pub mod trap;

mod config;
mod error;
mod logger;
mod macros;

pub use self::append::Append;
pub use self::config::Config;
pub use self::error::Error;
pub use self::filter::Filter;
pub use self::layout::Layout;
pub use self::logger::*;
pub use self::record::Level;
pub use self::trap::Trap;
