pub mod handler;
pub mod token;

pub use handler::{InviteDeps, InviteHandler};
pub use token::{RandomTokenGenerator, TokenGenerator};
