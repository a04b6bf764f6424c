pub mod google;
pub mod storage;

pub use google::{GoogleAuth, GoogleOAuth2Provider, GoogleTokenResponse};
pub use storage::{TokenSet, TokenStore};
