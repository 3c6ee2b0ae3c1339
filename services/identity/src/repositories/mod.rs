//! Identity service repositories

pub mod invitation;
pub mod user;

pub use invitation::PgInvitationRepository;
pub use user::UserRepository;
