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

//! Logfacade is a structured logging facade with interchangeable backends.
//!
//! # Overview
//!
//! A [`Logger`] writes records through exactly one backend at a time: human readable text, JSON
//! or logfmt on the standard streams, or GELF and syslog over the network. Level, labels,
//! environment, tag and time settings live in a shared [`Formatter`] that survives switching the
//! backend at runtime. The logger also implements [`log::Log`], so `log::info!` and friends can
//! be routed through it with [`Logger::apply`].
//!
//! # Examples
//!
//! Logging to stdout in logfmt:
//!
//! ```
//! use logfacade::Backend;
//! use logfacade::Fields;
//! use logfacade::Formatter;
//! use logfacade::Logger;
//!
//! let logger = Logger::new(Backend::Logfmt, Formatter::default()).unwrap();
//! logger.set_tag("billing");
//! logger.info("invoice sent").unwrap();
//!
//! let mut fields = Fields::new();
//! fields.insert("invoice".to_string(), 42.into());
//! logger.warnv("invoice overdue", &fields).unwrap();
//! ```
//!
//! Switching to JSON while keeping the configuration:
//!
//! ```
//! use logfacade::Format;
//! use logfacade::Formatter;
//! use logfacade::Level;
//! use logfacade::Logger;
//!
//! let logger = Logger::new(Default::default(), Formatter::default()).unwrap();
//! logger.set_level(Level::Debug).unwrap();
//! logger.set_format(Format::Json).unwrap();
//! assert_eq!(logger.level(), Level::Debug);
//! logger.debug("now in json").unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod connection;
pub mod formatter;
pub mod layout;
pub mod time;
pub mod tls;
pub mod trap;

mod error;
mod format;
mod level;
mod logger;
mod net;
mod record;

pub use append::Append;
pub use error::Error;
pub use error::ErrorKind;
pub use format::Format;
pub use formatter::Formatter;
pub use layout::Layout;
pub use level::Level;
pub use logger::Backend;
pub use logger::Logger;
pub use net::Reconnection;
pub use record::Fields;
pub use record::Record;
