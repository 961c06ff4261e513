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

use crate::Append;
use crate::Filter;
use crate::Logger;
use crate::Trap;
use crate::logger::global::set_logger;
use crate::logger::log_impl::Dispatch;
use crate::trap::DefaultTrap;

/// Create a new empty [`LoggerBuilder`] instance for configuring log dispatching.
///
/// # Examples
///
/// ```
/// use levelog::append;
///
/// let logger = levelog::builder()
///     .dispatch(|d| d.append(append::Stderr::default()))
///     .build();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder {
        name: String::new(),
        development: false,
        trap: Box::new(DefaultTrap::default()),
        dispatches: vec![],
    }
}

/// A builder for configuring log dispatching and replacing the shared logger.
///
/// # Examples
///
/// ```
/// use levelog::append;
/// use levelog::filter::MinLevel;
/// use levelog::record::Level;
///
/// levelog::builder()
///     .name("billing")
///     .dispatch(|d| d.filter(MinLevel(Level::Warn)).append(append::Stdout::default()))
///     .apply();
/// ```
#[must_use = "call `apply` to set the shared logger or `build` to construct a logger instance"]
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    development: bool,
    trap: Box<dyn Trap>,
    // stashed dispatches
    dispatches: Vec<Dispatch>,
}

impl LoggerBuilder {
    /// Set the logger name, shown in the name column of every record.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable development mode, in which [`Logger::dpanic`] unwinds after logging.
    ///
    /// Default to `false`.
    pub fn development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Set the trap for errors raised by appenders.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Register a new dispatch with the [`LoggerBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use levelog::append;
    ///
    /// levelog::builder()
    ///     .dispatch(|d| d.append(append::Stderr::default()))
    ///     .apply();
    /// ```
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Build the [`Logger`].
    ///
    /// # Examples
    ///
    /// ```
    /// let logger = levelog::builder().build();
    /// logger.info(format_args!("dropped: no dispatch"));
    /// ```
    pub fn build(self) -> Logger {
        Logger::new(self.name, self.development, self.trap, self.dispatches)
    }

    /// Replace the shared logger with the built one.
    ///
    /// Calls running concurrently observe either the previous logger or the new one.
    pub fn apply(self) {
        set_logger(self.build());
    }
}

/// A builder for configuring a log dispatch, including filters and appenders.
///
/// # Examples
///
/// ```
/// use levelog::append;
/// use levelog::filter::MinLevel;
/// use levelog::filter::Sampler;
/// use levelog::record::Level;
///
/// levelog::builder()
///     .dispatch(|d| {
///         d.filter(MinLevel(Level::Info))
///             .filter(Sampler::default())
///             .append(append::Stdout::default())
///     })
///     .apply();
/// ```
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    filters: Vec<Box<dyn Filter>>,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            filters: vec![],
            appends: vec![],
        }
    }

    /// Add a filter to this dispatch. Filters run in the order they are added.
    pub fn filter(mut self, filter: impl Into<Box<dyn Filter>>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.filters, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            filters: self.filters,
            appends: self.appends,
        }
    }
}
