/// Router Module Index
///
/// Splits the HTTP surface by access level. Access control is applied to a whole
/// module at once (via an Axum route layer) so a protected endpoint cannot be
/// registered without its guard.

/// Routes reachable without a token: catalogue reads, sign-in upsert, role
/// lookups, stats, token issuance and image upload.
pub mod public;

/// Routes behind the `AuthUser` guard. A valid token is all they require;
/// no role is checked.
pub mod authenticated;
