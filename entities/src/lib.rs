//! Concrete entity types served by the app.
mod addendum;
mod user;
mod user_group;

pub use addendum::Addendum;
pub use user::User;
pub use user_group::UserGroup;
