use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;

/// Mutable, user-level view of the session.
///
/// The environment contains:
/// - `vars`: variables captured at start-up; `PATH` is used to resolve programs.
/// - `should_exit`: set by the `exit` built-in, checked by the read loop.
/// - `exit_code`: the status the interpreter exits with.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub should_exit: bool,
    pub exit_code: ExitCode,
}

impl Environment {
    /// Capture the current process variables into a new `Environment`.
    pub fn new() -> Self {
        Self {
            vars: stdenv::vars().collect(),
            should_exit: false,
            exit_code: 0,
        }
    }

    /// Look up `key` in `self.vars`, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directories searched for bare program names.
    pub fn search_path(&self) -> String {
        self.get_var("PATH").unwrap_or_default()
    }

    /// Ask the read loop to finish with `code`.
    pub fn request_exit(&mut self, code: ExitCode) {
        self.should_exit = true;
        self.exit_code = code;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
