pub mod invite;
pub mod notification;
pub mod user;
