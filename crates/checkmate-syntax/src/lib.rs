//! Built-in Python syntax check for the `pycheckmate` formatter.
//!
//! When no external checker program is usable, the formatter falls back to
//! checking the target file itself. The report names the first error the
//! way Python's compiler does, with the same message, line and column.
//!
//! ```
//! use checkmate_syntax::{SyntaxReport, check_source};
//!
//! let report = check_source("def ok():\n    return 1\n")?;
//! assert_eq!(report, SyntaxReport::Clean);
//!
//! let report = check_source("print \"hello\"\n")?;
//! let error = report.error().expect("print statement is rejected");
//! assert_eq!((error.line, error.column), (1, 1));
//! # Ok::<(), checkmate_syntax::SyntaxError>(())
//! ```

mod check;
mod diagnostic;
mod error;
mod layout;
mod lexer;
mod locate;
mod parser;
mod scope;
mod statements;

pub use check::{SyntaxReport, check_file, check_source};
pub use error::SyntaxError;
pub use parser::{ParseResult, PythonParser, SyntaxErrorInfo};

#[cfg(test)]
mod tests;
