// handlers/protected - bearer token required (/api/*)
//
// Every handler here runs behind jwt_auth_middleware and
// resolve_identity_middleware, so `CurrentUser` is always available.
pub mod caregivers;
pub mod children;
pub mod indsatstrappe;
pub mod invitations;
pub mod notifications;
pub mod tools;
pub mod users;
