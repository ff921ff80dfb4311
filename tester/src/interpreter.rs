//! Interpreter resolution
//!
//! The assertion helpers run scripts through an interpreter executable. An
//! explicitly configured path always wins; otherwise a build tree is searched
//! upwards for a fresh binary before falling back to `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use shared::Verbosity;

/// Directories searched, relative to the base, before falling back to `PATH`
const SEARCH_DEPTH: usize = 3;

/// Interpreter executable plus the flags that silence or raise its warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    path: PathBuf,
    quiet_flags: Vec<OsString>,
    verbose_flags: Vec<OsString>,
}

impl Interpreter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quiet_flags: Vec::new(),
            verbose_flags: Vec::new(),
        }
    }

    /// Configured path, else `name` found near the current directory, else `name`
    pub fn resolve(name: &str, configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            return Self::new(path);
        }
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(search_upwards(&base, name).unwrap_or_else(|| PathBuf::from(name)))
    }

    /// Flags passed when running silently (fluent API)
    pub fn with_quiet_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.quiet_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Flags passed when running verbosely (fluent API)
    pub fn with_verbose_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.verbose_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leading flags for a run at `verbosity`
    pub fn flags_for(&self, verbosity: Verbosity) -> &[OsString] {
        match verbosity {
            Verbosity::Silent => &self.quiet_flags,
            Verbosity::Default => &[],
            Verbosity::Verbose => &self.verbose_flags,
        }
    }
}

/// Look for `name` (or `name` plus the platform suffix) in `base`, `base/..`, `base/../..`
pub fn search_upwards(base: &Path, name: &str) -> Option<PathBuf> {
    let suffixed = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    let mut dir = base.to_path_buf();
    for _ in 0..SEARCH_DEPTH {
        for candidate in [dir.join(name), dir.join(&suffixed)] {
            if is_executable_file(&candidate) {
                return Some(std::fs::canonicalize(&candidate).unwrap_or(candidate));
            }
        }
        dir.push("..");
    }
    None
}

fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn make_executable(path: &Path) {
        std::fs::write(path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_configured_path_wins() {
        let interpreter = Interpreter::resolve("ruby", Some(Path::new("/opt/ruby/bin/ruby")));
        assert_eq!(interpreter.path(), Path::new("/opt/ruby/bin/ruby"));
    }

    #[test]
    fn test_finds_binary_two_levels_up() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        make_executable(&root.path().join("a/myinterp"));

        let found = search_upwards(&nested, "myinterp").unwrap();
        assert_eq!(found, std::fs::canonicalize(root.path().join("a/myinterp")).unwrap());
    }

    #[test]
    fn test_skips_non_executables_and_directories() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("plain"), "not executable").unwrap();
        std::fs::create_dir(root.path().join("dir")).unwrap();

        assert_eq!(search_upwards(root.path(), "plain"), None);
        assert_eq!(search_upwards(root.path(), "dir"), None);
    }

    #[test]
    fn test_flags_follow_verbosity() {
        let interpreter = Interpreter::new("ruby")
            .with_quiet_flags(["-W0"])
            .with_verbose_flags(["-W2"]);

        assert_eq!(interpreter.flags_for(Verbosity::Silent), [OsString::from("-W0")]);
        assert!(interpreter.flags_for(Verbosity::Default).is_empty());
        assert_eq!(interpreter.flags_for(Verbosity::Verbose), [OsString::from("-W2")]);
    }
}
