//! Interpretation of the checker override value.

/// Override value that forces the built-in syntax check.
pub const BUILTIN_CHECKER: &str = "builtin";

/// What the user asked for through `TM_PYCHECKER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerOverride {
    /// Skip the checker search and run the built-in syntax check.
    Builtin,
    /// A checker name (looked up on `PATH`) or a path to an executable.
    Program(String),
}

impl CheckerOverride {
    /// Interprets a raw override value. Blank values mean "no override".
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        if value == BUILTIN_CHECKER {
            return Some(Self::Builtin);
        }
        Some(Self::Program(value.to_owned()))
    }
}
