// handlers/protected/profiles.rs - /api/profiles/
//
// Profiles are created by registration and removed together with their
// account. Role flags (`is_admin`, `is_elder`) are administrator business.

use axum::extract::State;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Church, Profile, ProfileDetail, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

async fn load_profile(pool: &SqlitePool, id: i64) -> Result<Profile, ApiError> {
    Profile::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found."))
}

async fn into_detail(state: &AppState, profile: Profile) -> Result<ProfileDetail, ApiError> {
    let churches = Profile::church_ids(&state.pool, profile.id).await?;
    let groups = Profile::group_ids(&state.pool, profile.id).await?;
    let image_url = profile.image.as_deref().map(|path| state.media.url(path));
    Ok(ProfileDetail {
        profile,
        image_url,
        churches,
        groups,
    })
}

/// GET /api/profiles/ - Everyone for elevated callers; otherwise people sharing a church
pub async fn list(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Vec<Profile>> {
    let profiles = match auth_user.visibility_scope() {
        None => Profile::list_all(&state.pool).await?,
        Some(profile_id) => Profile::list_visible_to(&state.pool, profile_id).await?,
    };
    Ok(ApiResponse::success(profiles))
}

/// GET /api/profiles/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ProfileDetail> {
    let profile = load_profile(&state.pool, id).await?;
    if profile.id != auth_user.profile_id() && !auth_user.is_elevated() {
        let visible = Profile::list_visible_to(&state.pool, auth_user.profile_id()).await?;
        if !visible.iter().any(|p| p.id == profile.id) {
            return Err(ApiError::not_found("Profile not found."));
        }
    }
    Ok(ApiResponse::success(into_detail(&state, profile).await?))
}

/// POST /api/profiles/:id/update/ - Self or elevated
///
/// Accepts the account fields (`name`/`first_name`, `last_name`, `email`),
/// the profile fields (`phone`, `bio`, `image` upload), `churches` as a
/// replacement id list, and the role flags for administrators.
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<ProfileDetail> {
    let mut profile = load_profile(&state.pool, id).await?;
    access::require_self_or_elevated(&auth_user, profile.id)?;

    if (payload.has("is_admin") || payload.has("is_elder")) && !auth_user.is_admin() {
        return Err(ApiError::forbidden("Only administrators can change roles."));
    }

    let mut user = User::find(&state.pool, profile.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found."))?;

    let first_name = match payload.text("first_name")? {
        Some(name) => Some(name),
        None => payload.text("name")?,
    };
    if let Some(first_name) = first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = payload.text("last_name")? {
        user.last_name = last_name.trim().to_string();
    }
    if payload.has("email") {
        payload.require(&["email"])?;
        let email = payload.string("email")?.unwrap_or_default().to_lowercase();
        if let Some(other) = User::find_by_email(&state.pool, &email).await? {
            if other.id != user.id {
                return Err(ApiError::invalid_field("email", "Email already registered."));
            }
        }
        user.email = email;
    }

    if payload.has("phone") {
        profile.phone = payload.string("phone")?;
    }
    if let Some(bio) = payload.text("bio")? {
        profile.bio = (!bio.trim().is_empty()).then_some(bio);
    }
    if let Some(is_admin) = payload.bool("is_admin")? {
        profile.is_admin = is_admin;
    }
    if let Some(is_elder) = payload.bool("is_elder")? {
        profile.is_elder = is_elder;
    }

    let churches = payload.id_list("churches")?;
    if let Some(ids) = &churches {
        for church_id in ids {
            if !Church::exists(&state.pool, *church_id).await? {
                return Err(ApiError::invalid_field("churches", format!("Church {church_id} does not exist.")));
            }
        }
    }

    let previous_image = match payload.file("image") {
        Some(upload) => {
            let stored = state.media.save("profiles", upload).await?;
            profile.image.replace(stored)
        }
        None => None,
    };

    user.save(&state.pool).await?;
    profile.save(&state.pool).await?;
    if let Some(ids) = churches {
        Profile::clear_churches(&state.pool, profile.id).await?;
        for church_id in ids {
            Profile::add_church(&state.pool, profile.id, church_id).await?;
        }
    }
    if let Some(old) = previous_image {
        state.media.remove(&old).await;
    }

    let profile = load_profile(&state.pool, profile.id).await?;
    Ok(ApiResponse::success(into_detail(&state, profile).await?))
}

/// POST /api/profiles/:id/delete/ - Removes the account and everything it owns
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let profile = load_profile(&state.pool, id).await?;
    access::require_self_or_elevated(&auth_user, profile.id)?;

    User::delete(&state.pool, profile.user_id).await?;
    if let Some(image) = &profile.image {
        state.media.remove(image).await;
    }
    info!("Profile {} ({}) deleted by {}", profile.id, profile.username, auth_user.user.username);

    Ok(ApiResponse::detail("Profile deleted."))
}
