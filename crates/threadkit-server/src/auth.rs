use threadkit_types::events::OperationDescriptor;

use crate::error::ServiceError;

/// Authorization hook run before every service call.
///
/// Receives the operation and the caller's identity as supplied by the
/// application, and returns the identity the store should act as.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, op: &OperationDescriptor, caller: &str) -> Result<String, ServiceError>;
}

/// Trusts the supplied identity. Only an empty identity is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _op: &OperationDescriptor, caller: &str) -> Result<String, ServiceError> {
        if caller.is_empty() {
            return Err(ServiceError::Unauthorized("missing identity".into()));
        }
        Ok(caller.to_string())
    }
}

impl<F> Authorizer for F
where
    F: Fn(&OperationDescriptor, &str) -> Result<String, ServiceError> + Send + Sync,
{
    fn authorize(&self, op: &OperationDescriptor, caller: &str) -> Result<String, ServiceError> {
        self(op, caller)
    }
}
