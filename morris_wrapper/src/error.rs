use std::path::PathBuf;
use std::time::Duration;

/// Error type for one request to the game server.
///
/// Every variant means the session can no longer be trusted. The runner
/// reacts by logging in again.
#[derive(Debug)]
pub enum ClientError {
    /// The request never got a response.
    Transport {
        endpoint: &'static str,
        err: reqwest::Error,
    },
    /// The server answered with a non-2xx status.
    Status {
        endpoint: &'static str,
        status: u16,
    },
    /// The body could not be decoded into the expected type.
    MalformedBody {
        endpoint: &'static str,
        err: serde_json::Error,
    },
    /// The server offers no board layout to create a game with.
    NoGameBoards,
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport { err, .. } => Some(err),
            ClientError::MalformedBody { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport { endpoint, .. } => {
                write!(f, "Request to {} failed", endpoint)
            }
            ClientError::Status { endpoint, status } => {
                write!(f, "Request to {} returned status {}", endpoint, status)
            }
            ClientError::MalformedBody { endpoint, .. } => {
                write!(f, "Response from {} could not be parsed", endpoint)
            }
            ClientError::NoGameBoards => write!(f, "The server offers no game boards"),
        }
    }
}

/// Error type for one invocation of the external move generator.
#[derive(Debug)]
pub enum OracleError {
    /// Writing the input file or reading the output file failed.
    ScratchFile { path: PathBuf, err: std::io::Error },
    /// The command template expanded to nothing runnable.
    EmptyCommand,
    Launch { program: String, err: std::io::Error },
    /// Waiting for the launched process failed.
    Wait(std::io::Error),
    NonZeroExit { code: Option<i32> },
    TimedOut { timeout: Duration },
    EmptyOutput,
    LengthMismatch { expected: usize, actual: usize },
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OracleError::ScratchFile { err, .. } => Some(err),
            OracleError::Launch { err, .. } => Some(err),
            OracleError::Wait(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::ScratchFile { path, .. } => {
                write!(f, "Could not access scratch file '{}'", path.display())
            }
            OracleError::EmptyCommand => write!(f, "The move command is empty"),
            OracleError::Launch { program, .. } => {
                write!(f, "Could not launch '{}'", program)
            }
            OracleError::Wait(_) => write!(f, "Could not wait for the move command"),
            OracleError::NonZeroExit { code: Some(code) } => {
                write!(f, "Command had a non-zero exit value of: {}", code)
            }
            OracleError::NonZeroExit { code: None } => {
                write!(f, "Command was terminated by a signal")
            }
            OracleError::TimedOut { timeout } => {
                write!(f, "Command did not finish within {:?}", timeout)
            }
            OracleError::EmptyOutput => {
                write!(f, "The move output file did not contain a board state string")
            }
            OracleError::LengthMismatch { expected, actual } => write!(
                f,
                "The move was expected to be {} characters but was {} characters",
                expected, actual
            ),
        }
    }
}

/// Error type for startup configuration. These are fatal.
#[derive(Debug)]
pub enum ConfigError {
    MissingFile { path: PathBuf },
    Unreadable { path: PathBuf, err: std::io::Error },
    EmptyTemplate { path: PathBuf },
    MissingPlaceholder {
        path: PathBuf,
        placeholder: &'static str,
    },
    WorkDirNotWritable { dir: PathBuf, err: std::io::Error },
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Unreadable { err, .. } => Some(err),
            ConfigError::WorkDirNotWritable { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingFile { path } => {
                write!(f, "Missing required file: {}", path.display())
            }
            ConfigError::Unreadable { path, .. } => {
                write!(f, "Error reading {}", path.display())
            }
            ConfigError::EmptyTemplate { path } => write!(f, "{} was empty", path.display()),
            ConfigError::MissingPlaceholder { path, placeholder } => write!(
                f,
                "{} missing required placeholder '{}'",
                path.display(),
                placeholder
            ),
            ConfigError::WorkDirNotWritable { dir, .. } => write!(
                f,
                "Insufficient file system permissions: unable to write files in '{}'",
                dir.display()
            ),
        }
    }
}

