// handlers/protected/mod.rs - Protected handlers (token required)
//
// Every route here sits behind `token_auth_middleware`. Handlers receive the
// caller as `AuthUser` and apply the predicates from `crate::auth::access`
// before touching data.

pub mod activities;
pub mod announcements;
pub mod chat;
pub mod church_files;
pub mod churches;
pub mod comments;
pub mod events;
pub mod group_notifications;
pub mod groups;
pub mod members;
pub mod messages;
pub mod notify;
pub mod participations;
pub mod posts;
pub mod profiles;
pub mod resources;
pub mod session;
pub mod staff;
