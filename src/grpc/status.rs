//! Service errors as gRPC statuses.

use tonic::{Code, Status};

use crate::service::{ErrorKind, ServiceError};

/// gRPC code for an error kind.
#[must_use]
pub const fn code_for(kind: ErrorKind) -> Code {
    match kind {
        ErrorKind::Unauthenticated => Code::Unauthenticated,
        ErrorKind::InvalidArgument => Code::InvalidArgument,
        ErrorKind::NotFound => Code::NotFound,
        ErrorKind::Conflict => Code::AlreadyExists,
        ErrorKind::Cancelled => Code::Cancelled,
        ErrorKind::Internal => Code::Internal,
    }
}

impl From<ServiceError> for Status {
    fn from(error: ServiceError) -> Self {
        Self::new(code_for(error.kind()), error.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use crate::infrastructure::RepositoryError;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Unauthenticated, Code::Unauthenticated)]
    #[case(ErrorKind::InvalidArgument, Code::InvalidArgument)]
    #[case(ErrorKind::NotFound, Code::NotFound)]
    #[case(ErrorKind::Conflict, Code::AlreadyExists)]
    #[case(ErrorKind::Cancelled, Code::Cancelled)]
    #[case(ErrorKind::Internal, Code::Internal)]
    fn test_code_for_kind(#[case] kind: ErrorKind, #[case] code: Code) {
        assert_eq!(code_for(kind), code);
    }

    #[rstest]
    fn test_internal_status_hides_cause() {
        let error = ServiceError::from_repository(
            "create_task",
            None,
            RepositoryError::database("insert task", "relation \"tasks\" does not exist"),
        );

        let status = Status::from(error);

        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("relation"));
    }

    #[rstest]
    fn test_not_found_status() {
        let status = Status::from(ServiceError::NotFound(TaskId::new(3)));
        assert_eq!(status.code(), Code::NotFound);
    }
}
