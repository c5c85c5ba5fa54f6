//! Command-line interface for exec-bridge.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::execution::{Command, DEFAULT_NAMESPACE};

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Namespace of the target.
    pub namespace: String,
    /// Target name, or `namespace/name`.
    pub target: String,
    /// Timeout in seconds (overrides config file).
    pub timeout_secs: Option<u64>,
    /// Report nonzero exit codes as errors.
    pub fail_on_nonzero: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Command tokens to run.
    pub command: Vec<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            target: "local".to_string(),
            timeout_secs: None,
            fail_on_nonzero: false,
            log_level: None,
            command: Vec::new(),
            version: false,
            help: false,
        }
    }
}

impl Args {
    /// Fully qualified `namespace/name` of the target.
    pub fn target_name(&self) -> String {
        if self.target.contains('/') {
            self.target.clone()
        } else {
            format!("{}/{}", self.namespace, self.target)
        }
    }

    /// The command to run.
    pub fn to_command(&self) -> Command {
        Command::from_argv(self.command.iter().cloned())
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
///
/// The first positional argument starts the command; it and everything
/// after it are taken verbatim, so the command's own flags are not parsed.
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("namespace") => {
                result.namespace = parser.value()?.parse()?;
            }
            Short('t') | Long("target") => {
                result.target = parser.value()?.parse()?;
            }
            Short('T') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Long("fail-on-nonzero") => {
                result.fail_on_nonzero = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                result.command.push(into_string(val)?);
                for rest in parser.raw_args()? {
                    result.command.push(into_string(rest)?);
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.command.is_empty() && !result.help && !result.version {
        return Err(ArgsError::MissingCommand);
    }

    Ok(result)
}

fn into_string(value: OsString) -> Result<String, ArgsError> {
    value
        .into_string()
        .map_err(|v| ArgsError::InvalidValue("command", v.to_string_lossy().into_owned()))
}

/// Print help message.
pub fn print_help() {
    print!("{}", help_text());
}

fn help_text() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"exec-bridge {version}
Run one command on a remote target and wait for its output

USAGE:
    exec-bridge [OPTIONS] [--] <COMMAND>...

OPTIONS:
    -c, --config <FILE>      Path to configuration file (JSON)
    -n, --namespace <NS>     Target namespace [default: default]
    -t, --target <NAME>      Target name or namespace/name [default: local]
    -T, --timeout <SECS>     Seconds to wait for the command [default: 10]
        --fail-on-nonzero    Treat a nonzero exit code as an error
    -l, --log-level <LVL>    Log level (error, warn, info, debug, trace)
    -h, --help               Print help
    -V, --version            Print version

ENVIRONMENT VARIABLES:
    EXEC_BRIDGE_TIMEOUT_SECS  Timeout (overrides config)
    EXEC_BRIDGE_EXIT_POLICY   capture | fail_on_non_zero (overrides config)
    EXEC_BRIDGE_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                  Alternative log level setting

EXIT STATUS:
    0-255    The remote exit code (also with --fail-on-nonzero)
    124      No terminal event before the timeout
    2        Invalid arguments
    1        Any other error

EXAMPLES:
    # Run locally
    exec-bridge -- df -h

    # Run on a configured pod with a 1 second deadline
    exec-bridge -c targets.json -n prod -t web-0 -T 1 -- cat /etc/hostname
"#
    )
}

/// Print version.
pub fn print_version() {
    println!("exec-bridge {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// No command tokens were given.
    MissingCommand,
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::MissingCommand => write!(f, "no command given"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
