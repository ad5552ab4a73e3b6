pub mod invitations;
pub mod migrate;
pub mod notifications;
pub mod token;
