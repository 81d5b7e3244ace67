//! Data models exchanged with the y-net backend

mod comment;
mod credentials;
mod post;
mod user;

pub use comment::{AuthorRef, Comment, NewComment};
pub use credentials::{Credentials, Profile};
pub use post::{NewPost, Post};
pub use user::User;
