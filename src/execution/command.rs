//! Command representation.

use std::fmt;

/// A command to run on a remote target: program followed by its arguments.
///
/// Tokens are passed to the target verbatim, with no shell interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    argv: Vec<String>,
}

impl Command {
    /// Create a new command for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
        }
    }

    /// Create a command from a full token list.
    pub fn from_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace.
    ///
    /// No quoting rules apply; use [`Command::from_argv`] for arguments
    /// containing spaces.
    pub fn parse(line: &str) -> Self {
        Self::from_argv(line.split_whitespace())
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program token, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program.
    pub fn arguments(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    /// All tokens, program first.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Whether the command has no usable program token.
    pub fn is_empty(&self) -> bool {
        self.program().map_or(true, |p| p.trim().is_empty())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.argv.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_new() {
        let cmd = Command::new("ls");
        assert_eq!(cmd.program(), Some("ls"));
        assert!(cmd.arguments().is_empty());
        assert!(!cmd.is_empty());
    }

    #[test]
    fn test_command_args_chain() {
        let cmd = Command::new("df").arg("-h").args(["--total", "/"]);
        assert_eq!(cmd.argv(), &["df", "-h", "--total", "/"]);
        assert_eq!(cmd.arguments(), &["-h", "--total", "/"]);
    }

    #[test]
    fn test_command_parse() {
        let cmd = Command::parse("  echo   hi  ");
        assert_eq!(cmd.argv(), &["echo", "hi"]);
    }

    #[test]
    fn test_empty_commands() {
        assert!(Command::default().is_empty());
        assert!(Command::parse("   ").is_empty());
        assert!(Command::new("").is_empty());
        assert!(Command::default().arguments().is_empty());
    }

    #[test]
    fn test_display() {
        let cmd = Command::from_argv(["echo", "hi"]);
        assert_eq!(cmd.to_string(), "[echo, hi]");
    }
}
