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

use std::sync::atomic::Ordering;

use serde_json::Value;

use crate::Fields;
use crate::Level;
use crate::Logger;

impl Logger {
    /// Install a clone of this logger as the [`log`] crate global logger.
    ///
    /// The `log` max level follows [`Logger::level`] from then on, including later calls to
    /// [`Logger::set_level`].
    ///
    /// # Errors
    ///
    /// Return an error if the log crate global logger has already been set.
    pub fn apply(&self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(self.level().to_level_filter());
        self.applied.store(true, Ordering::Release);
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.level() >= Level::from(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        if !log::Log::enabled(self, record.metadata()) {
            return;
        }

        let mut fields = Fields::new();

        struct KeyValueVisitor<'a> {
            fields: &'a mut Fields,
        }

        impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueVisitor<'_> {
            fn visit_pair(
                &mut self,
                key: log::kv::Key<'kvs>,
                value: log::kv::Value<'kvs>,
            ) -> Result<(), log::kv::Error> {
                self.fields.insert(key.as_str().to_string(), to_json(&value));
                Ok(())
            }
        }

        let mut visitor = KeyValueVisitor {
            fields: &mut fields,
        };
        // the visitor never fails
        let _ = record.key_values().visit(&mut visitor);

        let message = record.args().to_string();
        let fields = (!fields.is_empty()).then_some(&fields);
        if let Err(err) = self.emit(level, &message, fields) {
            // network backends mirror their own write failures
            if !self.format().is_remote() {
                self.side_channel(&err);
            }
        }
    }

    fn flush(&self) {
        if let Err(err) = Logger::flush(self) {
            self.side_channel(&err);
        }
    }
}

fn to_json(value: &log::kv::Value) -> Value {
    if let Some(v) = value.to_i64() {
        Value::from(v)
    } else if let Some(v) = value.to_u64() {
        Value::from(v)
    } else if let Some(v) = value.to_f64() {
        Value::from(v)
    } else if let Some(v) = value.to_bool() {
        Value::from(v)
    } else if let Some(v) = value.to_borrowed_str() {
        Value::from(v)
    } else {
        Value::from(value.to_string())
    }
}
