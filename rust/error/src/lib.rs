// A small set of error codes modeled on the gRPC status codes.
// https://grpc.github.io/grpc/core/md_doc_statuscodes.html
// Error types across the workspace report one of these so callers (the CLI in
// particular) can handle failures generically.
use std::error::Error;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorCodes {
    // OK is returned on success, we use "Success" since Ok is a keyword in Rust.
    Success = 0,
    // UNKNOWN indicates an unknown error.
    Unknown = 2,
    // INVALID_ARGUMENT indicates the schema document or a parameter is invalid.
    InvalidArgument = 3,
    // NOT_FOUND means a schema or config file was not found.
    NotFound = 5,
    // FAILED_PRECONDITION indicates the environment is not in the state the operation requires.
    FailedPrecondition = 9,
    // UNIMPLEMENTED indicates a type or feature that is unknown or not enabled.
    Unimplemented = 12,
    // INTERNAL errors are internal errors.
    Internal = 13,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::NotFound => "NotFoundError",
            ErrorCodes::Unimplemented => "UnsupportedError",
            ErrorCodes::Internal => "InternalError",
            _ => "YamlvusError",
        }
    }

    /// Process exit status used by command line front ends.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCodes::Success => 0,
            ErrorCodes::InvalidArgument | ErrorCodes::Unimplemented => 1,
            ErrorCodes::NotFound => 2,
            ErrorCodes::FailedPrecondition => 3,
            ErrorCodes::Unknown | ErrorCodes::Internal => 70,
        }
    }
}

pub trait YamlvusError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn YamlvusError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl Error for Box<dyn YamlvusError> {}

impl YamlvusError for Box<dyn YamlvusError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}

impl YamlvusError for std::io::Error {
    fn code(&self) -> ErrorCodes {
        match self.kind() {
            std::io::ErrorKind::NotFound => ErrorCodes::NotFound,
            _ => ErrorCodes::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("bad input")]
    struct BadInput;

    impl YamlvusError for BadInput {
        fn code(&self) -> ErrorCodes {
            ErrorCodes::InvalidArgument
        }
    }

    #[test]
    fn test_boxed_error_keeps_code() {
        let boxed = BadInput.boxed();
        assert_eq!(boxed.code(), ErrorCodes::InvalidArgument);
        assert_eq!(boxed.code().name(), "InvalidArgumentError");
        assert_eq!(boxed.to_string(), "bad input");
    }

    #[test]
    fn test_io_error_codes() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(missing.code(), ErrorCodes::NotFound);
        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(other.code(), ErrorCodes::Unknown);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorCodes::Success.exit_code(), 0);
        assert_eq!(ErrorCodes::InvalidArgument.exit_code(), 1);
        assert_eq!(ErrorCodes::Unimplemented.exit_code(), 1);
        assert_eq!(ErrorCodes::NotFound.exit_code(), 2);
    }
}
