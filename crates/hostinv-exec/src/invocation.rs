//! Fixed argument vectors for probe commands

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// A program and its static arguments
///
/// Arguments are passed to the child verbatim; there is no shell in between,
/// so nothing in here is ever re-interpreted. Values that vary at runtime are
/// limited to numbers (see [`Invocation::with_numeric_arg`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Executable name, resolved through `PATH`
    program: String,
    /// Arguments in order
    args: Vec<String>,
    /// Exit codes that still count as a successful run
    accepted_exit_codes: Vec<i32>,
}

impl Invocation {
    /// Create an invocation from a program and static arguments
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            accepted_exit_codes: vec![0],
        }
    }

    /// Append a numeric argument (a PID, for instance)
    #[must_use]
    pub fn with_numeric_arg(mut self, value: u64) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Append an argument built from a static prefix and a number, such as
    /// `PID eq 1234`
    #[must_use]
    pub fn with_formatted_numeric_arg(mut self, prefix: &str, value: u64) -> Self {
        self.args.push(format!("{prefix}{value}"));
        self
    }

    /// Treat additional exit codes as success
    ///
    /// Some tools exit non-zero while still printing a complete listing.
    #[must_use]
    pub fn accept_exit_codes(mut self, codes: &[i32]) -> Self {
        for code in codes {
            if !self.accepted_exit_codes.contains(code) {
                self.accepted_exit_codes.push(*code);
            }
        }
        self
    }

    /// Program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether `code` counts as a successful exit
    #[must_use]
    pub fn accepts(&self, code: i32) -> bool {
        self.accepted_exit_codes.contains(&code)
    }

    /// Check the invocation can be handed to the OS as-is
    ///
    /// # Errors
    /// Returns `ExecError::EmptyProgram` for a blank program name and
    /// `ExecError::InvalidArgument` for anything containing a NUL byte.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.program.trim().is_empty() {
            return Err(ExecError::EmptyProgram);
        }
        if self.program.contains('\0') {
            return Err(ExecError::InvalidArgument(self.program.clone()));
        }
        if let Some(bad) = self.args.iter().find(|a| a.contains('\0')) {
            return Err(ExecError::InvalidArgument(bad.replace('\0', "\\0")));
        }
        Ok(())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
