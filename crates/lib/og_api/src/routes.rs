//! Route paths.

pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_CREATOR_LOGIN: &str = "/auth/creator-login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const POST_AUTH_BECOME_CREATOR: &str = "/auth/become-creator";
pub const GET_AUTH_CREATOR_PROFILE: &str = "/auth/creator-profile";
