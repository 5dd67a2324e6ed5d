pub mod comment;
pub mod hashtag;
pub mod like;
pub mod post;
pub mod profile;
pub mod user;

pub use comment::Comment;
pub use hashtag::Hashtag;
pub use like::{Like, LikeToggle};
pub use post::{NewPost, Post, PostChanges};
pub use profile::{NewProfile, Profile, ProfileChanges};
pub use user::{NewUser, User};
