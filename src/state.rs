use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::database::SocialStore;
use crate::media::MediaStore;

/// Shared collaborators handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SocialStore>,
    pub media: Arc<dyn MediaStore>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn SocialStore>, media: Arc<dyn MediaStore>, jwt: JwtKeys) -> Self {
        Self { store, media, jwt }
    }
}
