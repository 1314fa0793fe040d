pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::{AdminAccess, ApprovalGrant, AuthenticatedOrganizer};
pub use password::{Argon2Hasher, CredentialHasher};
pub use token::{OrganizerClaims, TokenIssuer};
