//! Translation of every failure into an [`SdkError`].

use momento_grpc::{GrpcError, HeaderError};
use std::error::Error as StdError;
use std::time::Duration;
use tonic::{Code, Status, TimeoutExpired};
use tracing::warn;

use crate::{ErrorKind, SdkError};

/// Anything that can go wrong while executing one operation.
#[derive(Debug)]
pub enum Failure {
    /// Already translated; passes through unchanged.
    Sdk(SdkError),
    /// Returned by the transport or the service.
    Status(Status),
    /// The request deadline elapsed before a response arrived.
    DeadlineElapsed(Duration),
}

impl From<SdkError> for Failure {
    fn from(err: SdkError) -> Self {
        Self::Sdk(err)
    }
}

impl From<Status> for Failure {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

/// Translate a failure and record it.
///
/// Logs exactly one warning per call.
pub fn translate(operation: &str, failure: Failure) -> SdkError {
    let err = match failure {
        Failure::Sdk(err) => err,
        Failure::Status(status) => convert_status(status),
        Failure::DeadlineElapsed(deadline) => SdkError::timeout(format!(
            "{} did not complete within {}ms",
            operation,
            deadline.as_millis()
        )),
    };

    warn!(
        operation,
        kind = %err.kind(),
        error = %err.message(),
        "Operation failed"
    );
    err
}

/// Kind of error a status code maps to.
pub fn kind_for_code(code: Code) -> ErrorKind {
    match code {
        Code::AlreadyExists => ErrorKind::AlreadyExists,
        Code::NotFound => ErrorKind::NotFound,
        Code::Unauthenticated | Code::PermissionDenied => ErrorKind::Authentication,
        Code::InvalidArgument
        | Code::OutOfRange
        | Code::FailedPrecondition
        | Code::Unimplemented
        | Code::ResourceExhausted => ErrorKind::BadRequest,
        Code::DeadlineExceeded => ErrorKind::Timeout,
        _ => ErrorKind::InternalServer,
    }
}

/// Map a status to the error taxonomy.
///
/// Statuses caused by the client's own state map to
/// [`ErrorKind::ClientSdk`] regardless of code. A channel that gave up on the
/// request's `grpc-timeout` reports `Cancelled`; that maps to
/// [`ErrorKind::Timeout`].
pub fn convert_status(status: Status) -> SdkError {
    let kind = match cause(&status) {
        Some(Cause::ClientFault) => ErrorKind::ClientSdk,
        Some(Cause::DeadlineExpired) => ErrorKind::Timeout,
        None => kind_for_code(status.code()),
    };
    SdkError::from_status(kind, status)
}

/// Map a connection-layer error to the error taxonomy.
pub fn convert_grpc_error(err: GrpcError) -> SdkError {
    match err {
        GrpcError::Config(message) => SdkError::invalid_argument(message),
        err if err.is_client_fault() => SdkError::ClientSdk {
            message: err.to_string(),
            status: Some(err.into_status()),
        },
        err => SdkError::InternalServer {
            message: err.to_string(),
            status: Some(err.into_status()),
        },
    }
}

enum Cause {
    ClientFault,
    DeadlineExpired,
}

fn cause(status: &Status) -> Option<Cause> {
    let mut source = StdError::source(status);
    while let Some(err) = source {
        if err.downcast_ref::<HeaderError>().is_some() {
            return Some(Cause::ClientFault);
        }
        if err.downcast_ref::<TimeoutExpired>().is_some() {
            return Some(Cause::DeadlineExpired);
        }
        if let Some(err) = err.downcast_ref::<GrpcError>() {
            return err.is_client_fault().then_some(Cause::ClientFault);
        }
        source = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table() {
        let table = [
            (Code::AlreadyExists, ErrorKind::AlreadyExists),
            (Code::NotFound, ErrorKind::NotFound),
            (Code::Unauthenticated, ErrorKind::Authentication),
            (Code::PermissionDenied, ErrorKind::Authentication),
            (Code::InvalidArgument, ErrorKind::BadRequest),
            (Code::OutOfRange, ErrorKind::BadRequest),
            (Code::FailedPrecondition, ErrorKind::BadRequest),
            (Code::Unimplemented, ErrorKind::BadRequest),
            (Code::ResourceExhausted, ErrorKind::BadRequest),
            (Code::DeadlineExceeded, ErrorKind::Timeout),
            (Code::Internal, ErrorKind::InternalServer),
            (Code::Unavailable, ErrorKind::InternalServer),
            (Code::Unknown, ErrorKind::InternalServer),
            (Code::DataLoss, ErrorKind::InternalServer),
            (Code::Aborted, ErrorKind::InternalServer),
            (Code::Cancelled, ErrorKind::InternalServer),
        ];

        for (code, kind) in table {
            let err = convert_status(Status::new(code, "boom"));
            assert_eq!(err.kind(), kind, "{:?}", code);
            assert_eq!(err.status().map(Status::code), Some(code));
        }
    }

    #[test]
    fn test_ok_status_is_internal() {
        assert_eq!(kind_for_code(Code::Ok), ErrorKind::InternalServer);
    }

    #[test]
    fn test_sdk_errors_pass_through() {
        let err = translate(
            "Get",
            Failure::Sdk(SdkError::invalid_argument("bad cache name")),
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "bad cache name");
    }

    #[test]
    fn test_deadline_elapsed_is_timeout() {
        let err = translate("Set", Failure::DeadlineElapsed(Duration::from_millis(5000)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.message().contains("5000ms"));
    }

    #[test]
    fn test_header_conflict_is_client_fault() {
        let status = Status::from_error(Box::new(HeaderError::Conflict("authorization".into())));
        assert_eq!(status.code(), Code::Unknown);

        let err = convert_status(status);
        assert_eq!(err.kind(), ErrorKind::ClientSdk);
    }

    #[test]
    fn test_channel_timeout_is_timeout() {
        let status = Status::from_error(Box::new(TimeoutExpired(())));
        assert_eq!(status.code(), Code::Cancelled);

        let err = convert_status(status);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.status().map(Status::code), Some(Code::Cancelled));
    }

    #[test]
    fn test_closed_connection_is_client_fault() {
        let status = GrpcError::Closed("cache.example.com".into()).into_status();
        assert_eq!(convert_status(status).kind(), ErrorKind::ClientSdk);
    }

    #[test]
    fn test_convert_grpc_error() {
        assert_eq!(
            convert_grpc_error(GrpcError::Config("bad uri".into())).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            convert_grpc_error(GrpcError::Closed("e".into())).kind(),
            ErrorKind::ClientSdk
        );
    }
}
