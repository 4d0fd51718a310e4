//! Authorization predicates shared by the protected handlers.
//!
//! Elevated callers (profile admin/elder, account staff/superuser) pass every
//! scoped check. Everyone else is judged by group membership, church staff
//! records and the permissions of their group role.

use sqlx::SqlitePool;

use crate::database::models::{GroupRole, Membership};
use crate::error::ApiError;
use crate::middleware::AuthUser;

impl AuthUser {
    pub fn is_elevated(&self) -> bool {
        self.profile.is_admin || self.profile.is_elder || self.user.is_staff || self.user.is_superuser
    }

    pub fn is_admin(&self) -> bool {
        self.profile.is_admin || self.user.is_superuser
    }

    pub fn profile_id(&self) -> i64 {
        self.profile.id
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// `None` for elevated callers, who see everything; the profile id otherwise
    pub fn visibility_scope(&self) -> Option<i64> {
        (!self.is_elevated()).then_some(self.profile.id)
    }
}

pub async fn is_group_member(pool: &SqlitePool, profile_id: i64, group_id: i64) -> Result<bool, ApiError> {
    Ok(Membership::is_active_member(pool, group_id, profile_id).await?)
}

pub async fn require_group_access(pool: &SqlitePool, user: &AuthUser, group_id: i64) -> Result<(), ApiError> {
    if user.is_elevated() || is_group_member(pool, user.profile_id(), group_id).await? {
        return Ok(());
    }
    Err(ApiError::forbidden("You are not a member of this group."))
}

pub async fn is_church_staff(pool: &SqlitePool, user: &AuthUser, church_id: i64) -> Result<bool, ApiError> {
    if user.is_elevated() {
        return Ok(true);
    }
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM church_staff WHERE church_id = ? AND user_id = ? AND is_active = 1",
    )
    .bind(church_id)
    .bind(user.user_id())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn require_church_staff(pool: &SqlitePool, user: &AuthUser, church_id: i64) -> Result<(), ApiError> {
    if is_church_staff(pool, user, church_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only church staff can do this."))
    }
}

/// Churches whose staff list contains the caller
pub async fn staffed_church_ids(pool: &SqlitePool, user: &AuthUser) -> Result<Vec<i64>, ApiError> {
    Ok(sqlx::query_scalar("SELECT church_id FROM church_staff WHERE user_id = ? AND is_active = 1")
        .bind(user.user_id())
        .fetch_all(pool)
        .await?)
}

pub async fn group_role(pool: &SqlitePool, profile_id: i64, group_id: i64) -> Result<Option<GroupRole>, ApiError> {
    Ok(GroupRole::for_member(pool, group_id, profile_id).await?)
}

pub async fn is_group_moderator(pool: &SqlitePool, user: &AuthUser, group_id: i64) -> Result<bool, ApiError> {
    if user.is_elevated() {
        return Ok(true);
    }
    Ok(group_role(pool, user.profile_id(), group_id)
        .await?
        .is_some_and(|role| role.can_manage_chat))
}

pub async fn require_group_moderator(pool: &SqlitePool, user: &AuthUser, group_id: i64) -> Result<(), ApiError> {
    if is_group_moderator(pool, user, group_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only group moderators can do this."))
    }
}

/// Promoters may manage members. Returns the caller's role when they hold one,
/// `None` when elevation alone grants the right.
pub async fn require_group_promoter(
    pool: &SqlitePool,
    user: &AuthUser,
    group_id: i64,
) -> Result<Option<GroupRole>, ApiError> {
    if user.is_elevated() {
        return Ok(None);
    }
    match group_role(pool, user.profile_id(), group_id).await? {
        Some(role) if role.can_promote_members => Ok(Some(role)),
        _ => Err(ApiError::forbidden("You cannot manage members of this group.")),
    }
}

pub fn require_self_or_elevated(user: &AuthUser, profile_id: i64) -> Result<(), ApiError> {
    if user.profile_id() == profile_id || user.is_elevated() {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only change your own profile."))
    }
}

pub fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator privileges required."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Group, Profile, User};
    use crate::database::DatabaseManager;
    use chrono::Utc;

    async fn member(pool: &SqlitePool, username: &str) -> AuthUser {
        let user = User {
            id: 0,
            username: username.into(),
            email: format!("{username}@example.com"),
            first_name: username.into(),
            last_name: String::new(),
            password_hash: "x".into(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        let user_id = user.insert(pool).await.unwrap();
        Profile::insert_for_user(pool, user_id, None, false, false).await.unwrap();
        let user = User::find(pool, user_id).await.unwrap().unwrap();
        let profile = Profile::find_by_user(pool, user_id).await.unwrap().unwrap();
        AuthUser { user, profile, token: String::new() }
    }

    async fn group(pool: &SqlitePool) -> i64 {
        sqlx::query("INSERT INTO churches (name, created_at, updated_at) VALUES ('Central', ?, ?)")
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        let group = Group {
            id: 0,
            church_id: 1,
            name: "Musica".into(),
            description: String::new(),
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
        };
        group.insert(pool).await.unwrap()
    }

    #[tokio::test]
    async fn members_pass_group_access_and_outsiders_do_not() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let group_id = group(&pool).await;
        let ana = member(&pool, "ana").await;
        let bia = member(&pool, "bia").await;
        Membership::upsert(&pool, group_id, ana.profile_id(), None).await.unwrap();

        assert!(require_group_access(&pool, &ana, group_id).await.is_ok());
        assert!(require_group_access(&pool, &bia, group_id).await.is_err());
        assert!(!is_group_moderator(&pool, &ana, group_id).await.unwrap());
    }

    #[tokio::test]
    async fn elevated_flags_bypass_scoped_checks() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let group_id = group(&pool).await;
        let mut elder = member(&pool, "elder").await;
        elder.profile.is_elder = true;

        assert!(elder.is_elevated());
        assert!(!elder.is_admin());
        assert!(require_group_access(&pool, &elder, group_id).await.is_ok());
        assert!(is_church_staff(&pool, &elder, 1).await.unwrap());
        assert_eq!(elder.visibility_scope(), None);
    }

    #[tokio::test]
    async fn role_permissions_grant_moderation_and_promotion() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let group_id = group(&pool).await;
        let leader = member(&pool, "leader").await;
        let role = GroupRole {
            id: 0,
            group_id,
            name: "Lider".into(),
            rank: 10,
            can_manage_chat: true,
            can_promote_members: true,
        };
        let role_id = role.insert(&pool).await.unwrap();
        Membership::upsert(&pool, group_id, leader.profile_id(), Some(role_id)).await.unwrap();

        assert!(require_group_moderator(&pool, &leader, group_id).await.is_ok());
        let held = require_group_promoter(&pool, &leader, group_id).await.unwrap();
        assert_eq!(held.map(|r| r.rank), Some(10));
    }

    #[tokio::test]
    async fn staff_record_makes_church_staff() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        group(&pool).await;
        let secretary = member(&pool, "secretary").await;
        assert!(!is_church_staff(&pool, &secretary, 1).await.unwrap());

        crate::database::models::ChurchStaff::upsert(&pool, 1, secretary.user_id(), "STAFF", true, None)
            .await
            .unwrap();
        assert!(is_church_staff(&pool, &secretary, 1).await.unwrap());
        assert_eq!(staffed_church_ids(&pool, &secretary).await.unwrap(), vec![1]);
    }
}
