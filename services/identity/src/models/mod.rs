//! Identity service models

pub mod invitation;
pub mod user;

// Re-export for convenience
pub use invitation::{Invitation, InvitationStatus, NewInvitation};
pub use user::{AccountSummary, NewUser, User, UserProfile};
