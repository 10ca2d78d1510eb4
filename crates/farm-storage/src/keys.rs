//! Storage key constants.

/// Keys under which the session is persisted.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer access token
    pub const ACCESS_TOKEN: &'static str = "userToken";

    /// Refresh token used to mint new access tokens
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Stringified boolean, `"true"` until onboarding completes
    pub const IS_NEW_USER: &'static str = "isNewUser";

    /// Every session key, in the order they are cleared on sign-out.
    pub const SESSION: [&'static str; 3] =
        [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::IS_NEW_USER];
}
