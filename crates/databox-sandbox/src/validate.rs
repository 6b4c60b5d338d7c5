//! Input validation for execution plans.
//!
//! Rejects inputs that would fail at `execve` time or allow string-truncation
//! tricks: empty commands, empty arguments, embedded null bytes.

use thiserror::Error;

/// Validation error for plan inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("command cannot be empty")]
    EmptyCommand,

    #[error("argument {0} is empty")]
    EmptyArgument(usize),

    #[error("null byte in input")]
    NullByte,
}

/// Validate command and arguments.
pub fn validate_cmd(cmd: &[String]) -> Result<(), ValidationError> {
    if cmd.is_empty() {
        return Err(ValidationError::EmptyCommand);
    }
    for (i, arg) in cmd.iter().enumerate() {
        if arg.is_empty() {
            return Err(ValidationError::EmptyArgument(i));
        }
        if arg.contains('\0') {
            return Err(ValidationError::NullByte);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cmd_valid() {
        assert!(validate_cmd(&cmd(&["/bin/echo", "hello"])).is_ok());
    }

    #[test]
    fn cmd_empty() {
        assert_eq!(validate_cmd(&[]), Err(ValidationError::EmptyCommand));
    }

    #[test]
    fn cmd_empty_arg() {
        assert_eq!(
            validate_cmd(&cmd(&["/bin/echo", ""])),
            Err(ValidationError::EmptyArgument(1))
        );
    }

    #[test]
    fn cmd_null_byte() {
        assert_eq!(
            validate_cmd(&cmd(&["/bin/echo", "a\0b"])),
            Err(ValidationError::NullByte)
        );
    }
}
