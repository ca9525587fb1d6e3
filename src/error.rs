//! Runtime error type shared across the interpreter.
//!
//! Errors are either fatal (a corrupt story file or an interpreter gap) or
//! recoverable, in which case the configured
//! [ErrorHandling](crate::zmachine::ErrorHandling) mode decides whether play
//! continues.
use std::fmt;

/// Classifies an error for logging and for the once-per-code warning mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigError,
    DivideByZero,
    FrameUnderflow,
    IllegalMemoryAccess,
    InvalidAbbreviation,
    InvalidInput,
    InvalidInstruction,
    InvalidLocalVariable,
    InvalidObjectAttribute,
    InvalidObjectTree,
    InvalidObjectProperty,
    InvalidObjectPropertySize,
    InvalidOutputStream,
    InvalidRoutine,
    InvalidRunState,
    InvalidShift,
    Quetzal,
    Restore,
    ReturnNoCaller,
    Save,
    StackUnderflow,
    Stream3Table,
    System,
    UndoNoState,
    UnimplementedInstruction,
    UnsupportedVersion,
}

pub struct RuntimeError {
    recoverable: bool,
    code: ErrorCode,
    message: String,
}

impl RuntimeError {
    pub fn recoverable(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: true,
            code,
            message,
        }
    }

    pub fn fatal(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: false,
            code,
            message,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` when execution may continue past this error
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

/// Shorthand for `Err(RuntimeError::fatal(...))` with a format string.
///
/// `RuntimeError` must be in scope at the call site.
#[macro_export]
macro_rules! fatal_error {
    ($code:expr, $($arg:tt)*) => {
        Err(RuntimeError::fatal($code, format!($($arg)*)))
    };
}

/// Shorthand for `Err(RuntimeError::recoverable(...))` with a format string.
///
/// `RuntimeError` must be in scope at the call site.
#[macro_export]
macro_rules! recoverable_error {
    ($code:expr, $($arg:tt)*) => {
        Err(RuntimeError::recoverable($code, format!($($arg)*)))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let severity = if self.recoverable {
            "Recoverable"
        } else {
            "Fatal"
        };
        write!(f, "{} [{:?}]: {}", severity, self.code, self.message)
    }
}

impl fmt::Debug for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
