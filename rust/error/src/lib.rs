// Error codes follow the numbering of the gRPC status codes
// (https://grpc.github.io/grpc/core/md_doc_statuscodes.html) so that callers
// embedding the engine behind an RPC layer can map them without a table.
// Only the codes the descrint crates surface are listed.
use std::error::Error;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ErrorCodes {
    // INVALID_ARGUMENT indicates the caller specified an invalid argument.
    InvalidArgument = 3,
    // INTERNAL errors are internal errors.
    Internal = 13,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::Internal => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub trait DescrError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn DescrError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl Error for Box<dyn DescrError> {}

impl DescrError for Box<dyn DescrError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}
