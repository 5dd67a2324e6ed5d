// One module per resource; each exposes list/create/retrieve/update/partial_update/destroy
// plus its extra actions, wired up in `crate::app`.
pub mod comments;
pub mod hashtags;
pub mod likes;
pub mod posts;
pub mod profiles;
