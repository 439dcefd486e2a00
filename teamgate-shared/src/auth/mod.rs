/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: `CredentialHasher` port and its Argon2id implementation
/// - [`jwt`]: Access/refresh token issuance and validation
/// - [`authorization`]: Visibility rules and the admin write gate
/// - [`middleware`]: Bearer token resolution into an `AuthContext`

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
