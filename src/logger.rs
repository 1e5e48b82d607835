//! Verbosity levels for the trace output the lexer and parser driver emit
//! under `cfg(debug_assertions)`.

use std::fmt::{Display, Formatter};

/// Logging verbosity, ordered from silent to chatty.
///
/// Mirrors the level a caller wants reported back through `logs` buffers;
/// the order is used to decide whether a given trace line clears the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Log<T> {
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}
