use crate::command::{LaunchPlan, Stage};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use std::borrow::Cow;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// A pipeline stage resolved to something `execv` can run.
#[derive(Debug)]
pub(crate) struct ExternalProgram {
    pub name: String,
    /// `None` when the program could not be found; the child reports it.
    pub path: Option<CString>,
    pub argv: Vec<CString>,
}

impl ExternalProgram {
    fn resolve(stage: &Stage, search_paths: &OsStr) -> Result<Self> {
        let name = stage.program().to_string();
        let path = match find_command_path(search_paths, Path::new(&name)) {
            Some(found) => Some(c_string(found.as_os_str())?),
            None => None,
        };
        let argv = stage
            .argv
            .iter()
            .map(|arg| c_string(OsStr::new(arg)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, path, argv })
    }
}

/// Everything the forked child needs, built before `fork` so the child only
/// rewires file descriptors and execs.
#[derive(Debug)]
pub(crate) struct PreparedLaunch {
    pub programs: Vec<ExternalProgram>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Background commands leave the terminal's process group.
    pub background: bool,
}

impl PreparedLaunch {
    pub fn new(plan: &LaunchPlan, env: &Environment) -> Result<Self> {
        let search_paths = env.search_path();
        let programs = plan
            .stages
            .iter()
            .map(|stage| ExternalProgram::resolve(stage, OsStr::new(&search_paths)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            programs,
            input: plan.input.clone(),
            output: plan.output.clone(),
            background: plan.background,
        })
    }
}

fn c_string(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes())
        .map_err(|_| ShellError::InvalidArgument(value.to_string_lossy().into_owned()))
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo`: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first regular file with that name.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() || path.starts_with("./") {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
