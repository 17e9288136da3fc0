//! Command-line configuration
//!
//! Flags follow the single-dash style (`-listen`, `-text=hello`) used by the
//! container images this server is deployed with. Tokens are rewritten to
//! clap's `--long` form by [`normalize_args`] before parsing.
//!
//! Response text resolution: `-text` if non-empty, else `ECHO_TEXT`.

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use thiserror::Error;

/// Default bind address (all interfaces, port 5678)
pub const DEFAULT_LISTEN: &str = ":5678";

/// Environment variable consulted when `-text` is unset or empty
pub const TEXT_ENV_VAR: &str = "ECHO_TEXT";

/// Flags that consume the following token as their value when given without `=`
const VALUE_FLAGS: &[&str] = &["listen", "text", "status-code"];

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "http-echo")]
#[command(about = "Serves a fixed text payload over HTTP", long_about = None)]
#[command(disable_version_flag = true)]
pub struct CliArgs {
    /// Address and port to listen on
    #[arg(long, default_value = DEFAULT_LISTEN, allow_hyphen_values = true)]
    pub listen: String,

    /// Text to put on the webpage (overrides ECHO_TEXT)
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub text: String,

    /// Display version information
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub version: bool,

    /// HTTP response code, e.g.: 200
    #[arg(long = "status-code", default_value_t = 200, allow_hyphen_values = true)]
    pub status_code: i64,

    /// Set the IP_TRANSPARENT option on the listening socket
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub transparent: bool,

    /// Positional arguments; none are accepted
    #[arg(num_args = 0.., trailing_var_arg = true, hide = true)]
    pub args: Vec<String>,
}

/// Resolved, immutable server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bind address in `host:port` form (host may be empty)
    pub listen: String,
    /// Response body for the echo endpoint, without the trailing newline
    pub text: String,
    /// Status code returned by the echo endpoint
    ///
    /// Not range-checked: a code HTTP cannot carry fails each echo request
    /// instead of startup.
    pub status_code: i64,
    /// Whether to set IP_TRANSPARENT on the listener
    pub transparent: bool,
}

/// What the process should do after parsing its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// `-version` was given: print the version and exit 0
    Version,
    /// Start serving with this configuration
    Serve(Config),
}

/// Configuration errors, all reported before any socket is created
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown flag, malformed value or help request (rendered by clap)
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("Missing -text option or {} env var!", TEXT_ENV_VAR)]
    MissingText,

    #[error("Too many arguments!")]
    TooManyArguments(Vec<String>),
}

impl Startup {
    /// Resolve from the process arguments and environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(std::env::args_os(), std::env::var(TEXT_ENV_VAR).ok())
    }

    /// Resolve from explicit arguments (including the program name) and `ECHO_TEXT` value
    pub fn from_args<I, T>(args: I, env_text: Option<String>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let cli = CliArgs::try_parse_from(normalize_args(args))?;
        cli.resolve(env_text)
    }
}

impl CliArgs {
    /// Validate parsed flags into a [`Startup`] decision
    ///
    /// Checks run in order: version short-circuit, empty text, extra arguments.
    pub fn resolve(self, env_text: Option<String>) -> Result<Startup, ConfigError> {
        if self.version {
            return Ok(Startup::Version);
        }

        let text = resolve_text(&self.text, env_text);
        if text.is_empty() {
            return Err(ConfigError::MissingText);
        }

        if !self.args.is_empty() {
            return Err(ConfigError::TooManyArguments(self.args));
        }

        Ok(Startup::Serve(Config {
            listen: self.listen,
            text,
            status_code: self.status_code,
            transparent: self.transparent,
        }))
    }
}

/// Pick the response text: the flag if non-empty, otherwise the environment value
pub fn resolve_text(flag: &str, env_text: Option<String>) -> String {
    if !flag.is_empty() {
        return flag.to_string();
    }
    env_text.unwrap_or_default()
}

/// Rewrite single-dash long flags (`-text=x`) to clap's `--text=x` form
///
/// The first item is the program name and is passed through. Rewriting stops
/// at `--` or at the first positional argument, and the token after a
/// value-taking flag without `=` is left untouched. Single-character flags
/// (`-h`) keep their short form.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(Into::into);
    let mut out: Vec<OsString> = iter.next().into_iter().collect();

    let mut expect_value = false;
    let mut passthrough = false;

    for arg in iter {
        if passthrough || expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }

        let Some(token) = arg.to_str() else {
            passthrough = true;
            out.push(arg);
            continue;
        };

        if token == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let name = match token.strip_prefix("--").or_else(|| token.strip_prefix('-')) {
            Some(name) if !name.is_empty() => name,
            // Bare word or lone "-": flag parsing ends here
            _ => {
                passthrough = true;
                out.push(arg);
                continue;
            }
        };

        let flag = name.split_once('=').map_or(name, |(flag, _)| flag);
        if flag == name && VALUE_FLAGS.contains(&flag) {
            expect_value = true;
        }

        if name.chars().count() == 1 {
            out.push(arg);
        } else {
            out.push(OsString::from(format!("--{}", name)));
        }
    }

    out
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
