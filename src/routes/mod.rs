/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated
/// modules, so access control is applied explicitly at the module level (via
/// Axum layers) rather than per-handler.
///
/// The admin capability (delete-any-post) is not a separate router: it is the
/// same delete route with a role check inside the handler.

/// Routes accessible to all clients (anonymous, read-only plus the signup and
/// signin gateway). Read handlers only ever expose `published = true` rows.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated session token (or the local dev bypass).
pub mod authenticated;
