//! Request handlers, grouped by the resource they serve.

/// Product catalogue, moderation and engagement (votes, comments, tags, reports).
pub mod products;

/// Sign-in upsert and role lookup/update.
pub mod users;

/// Dashboard counters.
pub mod stats;

/// Token issuance and image upload.
pub mod session;
