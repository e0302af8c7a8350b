use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use tokio::process::Command as TokioCommand;

// ============================================================================
// CommandSpec - Secure Process Execution Specification
// ============================================================================

/// Specification for a command to execute.
///
/// All process execution goes through this type to ensure argv-style invocation.
/// This prevents shell injection attacks by ensuring arguments are passed as
/// discrete elements rather than shell strings.
///
/// # Security
///
/// `CommandSpec` enforces that:
/// - Arguments are `Vec<OsString>`, NOT shell strings
/// - No shell string evaluation (`sh -c`, `cmd /C`) is used
/// - Arguments cross trust boundaries as discrete elements
///
/// # Example
///
/// ```rust
/// use lfsforge_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("make")
///     .arg("-j4")
///     .arg("install")
///     .cwd("/build/gcc");
///
/// assert_eq!(cmd.program, OsString::from("make"));
/// assert_eq!(cmd.args.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
    /// If set, the child does not inherit the parent's environment;
    /// only `env` entries are visible to it. Used for the Isolation
    /// Manager's chroot clean-environment requirement.
    pub clear_env: bool,
}

impl CommandSpec {
    /// Create a new `CommandSpec` with the given program.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("make");
    /// ```
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
            clear_env: false,
        }
    }

    /// Clear the parent's environment before applying `env` entries.
    #[must_use]
    pub fn env_clear(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Add a single argument to the command.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("make").arg("-j4").arg("install");
    /// ```
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("sh").args(["-c", "./configure --prefix=/usr"]);
    /// ```
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the command.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("make").cwd("/build/gcc");
    /// ```
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("make")
    ///     .env("DESTDIR", "/build/gcc/destdir")
    ///     .env("MAKEFLAGS", "-j4");
    /// ```
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables for the command.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("make").envs([("DEBUG", "1"), ("VERBOSE", "1")]);
    /// ```
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let env_map = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in envs {
            env_map.insert(key.into(), value.into());
        }
        self
    }

    /// Convert this `CommandSpec` into a `std::process::Command`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use lfsforge_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("echo")
    ///     .arg("hello")
    ///     .arg("world");
    ///
    /// let output = cmd.to_command().output().expect("failed to execute");
    /// ```
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if self.clear_env {
            cmd.env_clear();
        }
        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }

    /// Convert this `CommandSpec` into a `tokio::process::Command`.
    ///
    /// This is used for async execution with timeout support.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use lfsforge_runner::CommandSpec;
    ///
    /// # async fn example() {
    /// let cmd = CommandSpec::new("echo")
    ///     .arg("hello");
    ///
    /// let output = cmd.to_tokio_command().output().await.expect("failed to execute");
    /// # }
    /// ```
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if self.clear_env {
            cmd.env_clear();
        }
        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self {
            program: OsString::new(),
            args: Vec::new(),
            cwd: None,
            env: None,
            clear_env: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_spec_new() {
        let cmd = CommandSpec::new("make");
        assert_eq!(cmd.program, OsString::from("make"));
        assert!(cmd.args.is_empty());
        assert!(cmd.cwd.is_none());
        assert!(cmd.env.is_none());
    }

    #[test]
    fn test_command_spec_arg() {
        let cmd = CommandSpec::new("make").arg("-j4").arg("install");
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0], OsString::from("-j4"));
        assert_eq!(cmd.args[1], OsString::from("install"));
    }

    #[test]
    fn test_command_spec_args() {
        let cmd = CommandSpec::new("sh").args(["-c", "./configure", "--prefix=/usr"]);
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.args[0], OsString::from("-c"));
        assert_eq!(cmd.args[1], OsString::from("./configure"));
        assert_eq!(cmd.args[2], OsString::from("--prefix=/usr"));
    }

    #[test]
    fn test_command_spec_cwd() {
        let cmd = CommandSpec::new("make").cwd("/build/gcc");
        assert_eq!(cmd.cwd, Some(PathBuf::from("/build/gcc")));
    }

    #[test]
    fn test_command_spec_env() {
        let cmd = CommandSpec::new("make")
            .env("DEBUG", "1")
            .env("VERBOSE", "true");
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(
            env.get(&OsString::from("DEBUG")),
            Some(&OsString::from("1"))
        );
        assert_eq!(
            env.get(&OsString::from("VERBOSE")),
            Some(&OsString::from("true"))
        );
    }

    #[test]
    fn test_command_spec_envs() {
        let cmd = CommandSpec::new("make").envs([("DEBUG", "1"), ("VERBOSE", "true")]);
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(
            env.get(&OsString::from("DEBUG")),
            Some(&OsString::from("1"))
        );
        assert_eq!(
            env.get(&OsString::from("VERBOSE")),
            Some(&OsString::from("true"))
        );
    }

    #[test]
    fn test_command_spec_builder_chain() {
        let cmd = CommandSpec::new("make")
            .arg("-j4")
            .args(["install", "DESTDIR=/tmp/out"])
            .cwd("/build/gcc")
            .env("DEBUG", "1")
            .envs([("VERBOSE", "true")]);

        assert_eq!(cmd.program, OsString::from("make"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/build/gcc")));
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_command_spec_default() {
        let cmd = CommandSpec::default();
        assert_eq!(cmd.program, OsString::new());
        assert!(cmd.args.is_empty());
        assert!(cmd.cwd.is_none());
        assert!(cmd.env.is_none());
    }

    #[test]
    fn test_command_spec_clone() {
        let cmd = CommandSpec::new("make")
            .arg("install")
            .cwd("/build/gcc")
            .env("DEBUG", "1");
        let cloned = cmd.clone();

        assert_eq!(cloned.program, cmd.program);
        assert_eq!(cloned.args, cmd.args);
        assert_eq!(cloned.cwd, cmd.cwd);
        assert_eq!(cloned.env, cmd.env);
    }

    #[test]
    fn test_command_spec_to_command() {
        let cmd = CommandSpec::new("echo").arg("hello").arg("world");

        let std_cmd = cmd.to_command();
        assert!(std::mem::size_of_val(&std_cmd) > 0);
    }

    #[test]
    fn test_command_spec_to_tokio_command() {
        let cmd = CommandSpec::new("echo").arg("hello");

        let tokio_cmd = cmd.to_tokio_command();
        assert!(std::mem::size_of_val(&tokio_cmd) > 0);
    }

    #[test]
    fn test_command_spec_osstring_args() {
        let cmd = CommandSpec::new(OsString::from("make")).arg(OsString::from("install"));
        assert_eq!(cmd.program, OsString::from("make"));
        assert_eq!(cmd.args[0], OsString::from("install"));
    }

    #[test]
    fn test_command_spec_args_are_vec_osstring() {
        // Verify args are stored as Vec<OsString>, not shell strings
        let cmd = CommandSpec::new("make")
            .arg("arg with spaces")
            .arg("arg;with;semicolons")
            .arg("arg|with|pipes")
            .arg("arg&with&ampersands");

        assert_eq!(cmd.args.len(), 4);
        assert_eq!(cmd.args[0], OsString::from("arg with spaces"));
        assert_eq!(cmd.args[1], OsString::from("arg;with;semicolons"));
        assert_eq!(cmd.args[2], OsString::from("arg|with|pipes"));
        assert_eq!(cmd.args[3], OsString::from("arg&with&ampersands"));
    }

    #[test]
    fn test_command_spec_shell_metacharacters_preserved() {
        // Shell metacharacters are preserved as-is, not interpreted,
        // since arguments never pass through a shell.
        let cmd = CommandSpec::new("echo")
            .arg("$(whoami)")
            .arg("`id`")
            .arg("${HOME}")
            .arg("$PATH");

        assert_eq!(cmd.args[0], OsString::from("$(whoami)"));
        assert_eq!(cmd.args[1], OsString::from("`id`"));
        assert_eq!(cmd.args[2], OsString::from("${HOME}"));
        assert_eq!(cmd.args[3], OsString::from("$PATH"));
    }
}
