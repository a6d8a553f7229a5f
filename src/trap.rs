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

//! The side error channel.
//!
//! Appenders that talk to the network cannot log their own failures through themselves. They
//! mirror them here instead, and escalate when the failed record was a panic or fatal one.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::Error;
use crate::Level;

static OUTPUT: Mutex<()> = Mutex::new(());

/// Serializes writes to stdout and stderr across the whole process.
pub(crate) fn output_lock() -> MutexGuard<'static, ()> {
    OUTPUT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sink for errors that cannot be returned to anyone useful.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    fn trap(&self, err: &Error);
}

/// A default trap that sends errors to standard error if possible.
///
/// If standard error is not available, it does nothing.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _guard = output_lock();
        let _ = writeln!(io::stderr(), "{err}");
    }
}

/// Mirror a failed write of a `level` record to `trap`, escalating for panic and fatal.
pub(crate) fn mirror(trap: &dyn Trap, level: Level, err: &Error) {
    trap.trap(err);
    escalate(level, err);
}

/// Terminate the way `level` demands: panic for [`Level::Panic`], exit for [`Level::Fatal`].
pub(crate) fn escalate(level: Level, message: &dyn fmt::Display) {
    match level {
        Level::Panic => panic!("{message}"),
        Level::Fatal => {
            let _ = io::stderr().flush();
            std::process::exit(1)
        }
        _ => {}
    }
}
