#[derive(Debug, Clone, thiserror::Error)]
pub enum CustomerError {
    #[error("customer already exists")]
    AlreadyExists,
    #[error("customer does not exist yet")]
    NotInitialized,
    #[error("email must not be empty")]
    EmptyEmail,
}
