use std::time::Duration;

pub const USER_REGISTERED: &str = "user_registered";
pub const USER_LOGGED_IN: &str = "user_logged_in";
pub const ATTACHMENT_CREATED: &str = "attachment_created";

/// Lifetime of cached post listings and thread snapshots.
pub const LISTING_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Comments attached per post by the `lastThreeComments` include.
pub const LAST_COMMENTS_PER_POST: usize = 3;

pub const USERNAME_MAX_LENGTH: usize = 30;
pub const PASSWORD_MIN_LENGTH: usize = 6;
// bcrypt ignores input past 72 bytes.
pub const PASSWORD_MAX_LENGTH: usize = 72;

/// Upload size limit shared by every attachment type.
pub const ATTACHMENT_MAX_SIZE: u64 = 5 * 1024 * 1024;
pub const ATTACHMENT_NAME_MAX_LENGTH: usize = 255;
