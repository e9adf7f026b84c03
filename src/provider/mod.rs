mod drive;
mod oauth;
mod traits;

pub use drive::DriveRegistrar;
pub use oauth::OAuthRefresher;
pub use traits::{TokenRefresher, WatchChannel, WatchRegistrar};
