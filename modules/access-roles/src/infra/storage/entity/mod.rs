pub mod auth_role;
pub mod auth_user_role;
pub mod tenant;
pub mod user_profile;
