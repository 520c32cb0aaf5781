//! Invoker
//!
//! Guarded calls into executable foreign values. The tag, the arity hint
//! and the callable's own argument check all run before control is
//! transferred, so a rejected call never reaches foreign code.

use std::panic::{self, AssertUnwindSafe};

use super::error::{ForeignError, InteropError, InteropResult};
use super::handle::ForeignHandle;
use super::types::ForeignValue;

/// Performs invocations on behalf of the bridge
#[derive(Debug, Clone, Copy)]
pub struct Invoker {
    /// Convert panics in host callables into `ForeignRaised`
    catch_panics: bool,
}

impl Invoker {
    pub fn new() -> Self {
        Self { catch_panics: true }
    }

    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    pub fn catch_panics(&self) -> bool {
        self.catch_panics
    }

    /// Invoke `value` with `args`.
    ///
    /// Blocks until the foreign callable returns. There is no timeout.
    pub fn invoke(
        &self,
        value: &ForeignValue,
        args: &[ForeignValue],
    ) -> InteropResult<ForeignHandle> {
        // Callers are expected to probe first; the tag is checked again here.
        let exec = match value {
            ForeignValue::Executable(exec) => exec,
            other => return Err(InteropError::NotExecutable { tag: other.tag() }),
        };

        let arity = exec.arity();
        if !arity.accepts(args.len()) {
            return Err(InteropError::ArityMismatch {
                expected: arity.expected().unwrap_or(0),
                got: args.len(),
            });
        }

        let callable = exec.callable();
        callable
            .check_args(args)
            .map_err(InteropError::InvalidArgument)?;

        log::debug!(
            "invoking {} with {} argument(s)",
            callable.describe(),
            args.len()
        );

        let outcome = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| callable.call(args)))
                .unwrap_or_else(|payload| Err(ForeignError::new(panic_message(payload.as_ref()))))
        } else {
            callable.call(args)
        };

        match outcome {
            Ok(result) => {
                log::trace!("invocation returned {}", result.tag());
                Ok(ForeignHandle::new(result))
            }
            Err(err) => {
                log::debug!("invocation raised: {}", err);
                Err(InteropError::ForeignRaised(err))
            }
        }
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("foreign callable panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("foreign callable panicked: {}", msg)
    } else {
        "foreign callable panicked".to_string()
    }
}
