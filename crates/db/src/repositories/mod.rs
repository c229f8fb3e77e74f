//! Repository layer: one struct of static methods per table.

pub mod credential_repo;
pub mod project_repo;

pub use credential_repo::GitCredentialRepo;
pub use project_repo::ProjectRepo;
