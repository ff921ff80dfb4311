//! Test fixtures for runner integration tests
//!
//! Child programs are small `/bin/sh` scripts so the tests run anywhere a
//! POSIX shell exists.

use std::time::Duration;

pub struct TestFixtures;

impl TestFixtures {
    pub const SHELL: &'static str = "/bin/sh";

    /// Exits immediately with status 0, writing nothing
    pub const SILENT_SUCCESS: &'static str = "exit 0";

    /// Copies stdin to stdout
    pub const ECHO_STDIN: &'static str = "exec cat";

    /// Prints the environment
    pub const PRINT_ENV: &'static str = "exec env";

    /// Ignores the terminate signal and sleeps for a minute
    pub const IGNORE_TERM: &'static str = "trap '' TERM; exec sleep 60";

    /// Writes interleaved lines to both streams
    pub const INTERLEAVED: &'static str = "echo out1; echo err1 >&2; echo out2; echo err2 >&2";

    /// Writes a lot to both streams and exits
    pub const CHATTY: &'static str = "i=0; while [ $i -lt 2000 ]; do echo line $i; echo warn $i >&2; i=$((i+1)); done";

    /// Writes a marker, then hangs
    pub const PARTIAL_THEN_HANG: &'static str = "echo started; echo trouble >&2; exec sleep 60";

    pub const SHORT_TIMEOUT: Duration = Duration::from_millis(300);
    pub const SHORT_GRACE: Duration = Duration::from_millis(300);
}
