use anyhow::{Context, Result};
use chrono::{DateTime, Duration, DurationRound, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{
    Activity, Announcement, AnnouncementKind, Church, ChurchFile, EducationalResource, Event, EventUpdate, Group,
    GroupNotification, GroupRole, Membership, OperatingHour, Post, PrivateMessage, Profile, User,
};
use crate::media::MediaStore;
use crate::services::account_service::{AccountService, NewAccount};

pub const DEMO_CHURCH: &str = "IASD Central";

/// What a seed run touched
#[derive(Debug, Default, Serialize)]
pub struct SeedSummary {
    pub users_created: usize,
    pub church_created: bool,
    pub groups_created: usize,
}

struct DemoUser {
    username: &'static str,
    name: &'static str,
    password: &'static str,
    is_admin: bool,
    is_elder: bool,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser { username: "admin@iasd.local", name: "Admin", password: "Admin123!", is_admin: true, is_elder: false },
    DemoUser { username: "elder@iasd.local", name: "Elder", password: "Elder123!", is_admin: false, is_elder: true },
    DemoUser { username: "membro@iasd.local", name: "Member", password: "Member123!", is_admin: false, is_elder: false },
];

const DEMO_GROUPS: [(&str, &str); 3] = [
    ("Musica", "Louvor, coral e escala de instrumentos."),
    ("Midia", "Transmissao e comunicacao."),
    ("Infantil", "Atividades para criancas e familias."),
];

/// Populate a development database. Safe to run repeatedly: accounts, the
/// church and its groups are looked up before being created, and the sample
/// content is only written alongside a newly created church.
pub struct SeedService {
    pool: SqlitePool,
    media: MediaStore,
    accounts: AccountService,
}

impl SeedService {
    pub fn new(pool: SqlitePool, media: MediaStore, hash_cost: u32) -> Self {
        let accounts = AccountService::new(pool.clone(), hash_cost);
        Self { pool, media, accounts }
    }

    pub async fn run(&self) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        let mut profiles = Vec::with_capacity(DEMO_USERS.len());
        for demo in &DEMO_USERS {
            let (profile, created) = self.ensure_user(demo).await?;
            if created {
                summary.users_created += 1;
            }
            profiles.push(profile);
        }
        let [admin, elder, member] = [&profiles[0], &profiles[1], &profiles[2]];

        let (church, church_created) = self.ensure_church().await?;
        summary.church_created = church_created;

        let mut groups = Vec::with_capacity(DEMO_GROUPS.len());
        for (name, description) in DEMO_GROUPS {
            let (group, created) = self.ensure_group(&church, name, description).await?;
            if created {
                summary.groups_created += 1;
                self.seed_roles(group.id).await?;
            }
            groups.push(group);
        }

        for profile in &profiles {
            Profile::add_church(&self.pool, profile.id, church.id).await?;
        }
        let leader_role = GroupRole::list_for_group(&self.pool, groups[0].id)
            .await?
            .into_iter()
            .find(|role| role.can_promote_members)
            .map(|role| role.id);
        for group in &groups {
            Membership::upsert(&self.pool, group.id, admin.id, None).await?;
        }
        Membership::upsert(&self.pool, groups[0].id, elder.id, leader_role).await?;
        Membership::upsert(&self.pool, groups[2].id, member.id, None).await?;

        if church_created {
            self.seed_content(&church, &groups, admin, elder, member).await?;
        }

        info!(
            "Seed finished: {} users, church created: {}, {} groups",
            summary.users_created, summary.church_created, summary.groups_created
        );
        Ok(summary)
    }

    async fn ensure_user(&self, demo: &DemoUser) -> Result<(Profile, bool)> {
        if let Some(user) = User::find_by_username(&self.pool, demo.username).await? {
            let profile = crate::auth::ensure_profile(&self.pool, &user).await?;
            return Ok((profile, false));
        }

        let (user, _) = self
            .accounts
            .create(
                NewAccount {
                    username: demo.username.to_string(),
                    email: demo.username.to_string(),
                    password: demo.password.to_string(),
                    first_name: demo.name.to_string(),
                    is_admin: demo.is_admin,
                    is_elder: demo.is_elder,
                    ..NewAccount::default()
                },
                false,
            )
            .await
            .with_context(|| format!("creating {}", demo.username))?;
        let profile = Profile::find_by_user(&self.pool, user.id)
            .await?
            .context("profile missing after account creation")?;
        Ok((profile, true))
    }

    async fn ensure_church(&self) -> Result<(Church, bool)> {
        if let Some(church) = Church::find_by_name(&self.pool, DEMO_CHURCH).await? {
            return Ok((church, false));
        }
        let now = Utc::now();
        let mut church = Church {
            id: 0,
            name: DEMO_CHURCH.to_string(),
            description: "Igreja Adventista do Setimo Dia - Central".to_string(),
            address: "Rua Esperanca, 120 - Centro".to_string(),
            phone: "(11) 3456-7890".to_string(),
            email: "contato@iasd.local".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        church.id = church.insert(&self.pool).await?;

        // Wednesday evening, Friday evening and Saturday morning services
        for (day, opens, closes) in [(2, (19, 30), (21, 0)), (4, (19, 30), (21, 0)), (5, (9, 0), (12, 30))] {
            OperatingHour {
                id: 0,
                church_id: church.id,
                day_of_week: day,
                opens_at: NaiveTime::from_hms_opt(opens.0, opens.1, 0),
                closes_at: NaiveTime::from_hms_opt(closes.0, closes.1, 0),
                is_closed: false,
                notes: String::new(),
            }
            .insert(&self.pool)
            .await?;
        }
        Ok((church, true))
    }

    async fn ensure_group(&self, church: &Church, name: &str, description: &str) -> Result<(Group, bool)> {
        if let Some(group) = Group::find_by_name(&self.pool, church.id, name).await? {
            return Ok((group, false));
        }
        let mut group = Group {
            id: 0,
            church_id: church.id,
            name: name.to_string(),
            description: description.to_string(),
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
        };
        group.id = group.insert(&self.pool).await?;
        Ok((group, true))
    }

    async fn seed_roles(&self, group_id: i64) -> Result<()> {
        for (name, rank, moderates) in [("Lider", 10, true), ("Membro", 0, false)] {
            GroupRole {
                id: 0,
                group_id,
                name: name.to_string(),
                rank,
                can_manage_chat: moderates,
                can_promote_members: moderates,
            }
            .insert(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn seed_content(
        &self,
        church: &Church,
        groups: &[Group],
        admin: &Profile,
        elder: &Profile,
        member: &Profile,
    ) -> Result<()> {
        let now = Utc::now();
        let tomorrow = next_minute(now + Duration::days(1));

        let event = Event {
            id: 0,
            church_id: church.id,
            title: "Culto de Celebracao".to_string(),
            description: "Mensagem especial e louvor.".to_string(),
            speaker_name: "Pr. Joao".to_string(),
            location: "Templo principal".to_string(),
            starts_at: tomorrow,
            ends_at: tomorrow + Duration::hours(2),
            image_url: String::new(),
            attendance_mode: "CONFIRM".to_string(),
            created_by: Some(admin.user_id),
            is_published: true,
            capacity: Some(200),
            created_at: now,
            updated_at: now,
        };
        let event_id = event.insert(&self.pool).await?;
        EventUpdate::insert(
            &self.pool,
            event_id,
            "Horario confirmado",
            "O culto comeca pontualmente.",
            Some(admin.user_id),
            true,
        )
        .await?;

        Activity {
            id: 0,
            group_id: groups[0].id,
            name: "Ensaio do Coral".to_string(),
            description: "Ensaios semanais.".to_string(),
            scheduled_at: next_minute(now + Duration::days(2)),
        }
        .insert(&self.pool)
        .await?;

        for (kind, title, message) in [
            (AnnouncementKind::Communique, "Reuniao de Lideres", "Sexta-feira as 20h na sala 2."),
            (AnnouncementKind::Notice, "Mutirao de Saude", "Sabado as 9h na praca central."),
        ] {
            Announcement {
                id: 0,
                church_id: church.id,
                kind: kind.as_str().to_string(),
                title: title.to_string(),
                message: message.to_string(),
                sent_at: now,
            }
            .insert(&self.pool)
            .await?;
        }

        let post_id = Post {
            id: 0,
            group_id: groups[0].id,
            author_id: admin.id,
            author_name: String::new(),
            content: "Ensaio extra nesta semana!".to_string(),
            attachment: None,
            poll: None,
            link: None,
            posted_at: now,
        }
        .insert(&self.pool)
        .await?;
        crate::database::models::Comment::insert(&self.pool, post_id, elder.id, "Confirmado, estarei la.").await?;

        PrivateMessage::insert(&self.pool, admin.id, member.id, "Bem-vindo ao grupo!").await?;
        GroupNotification::insert(&self.pool, groups[2].id, member.id, "Nova atividade disponivel.").await?;

        let guide = self
            .media
            .save_bytes("resources", "guia_estudos.txt", b"Material de estudo")
            .await?;
        EducationalResource {
            id: 0,
            church_id: church.id,
            title: "Guia de Estudos".to_string(),
            description: "Material para pequenos grupos.".to_string(),
            file_path: guide,
            uploaded_at: now,
        }
        .insert(&self.pool)
        .await?;

        let bulletin = self
            .media
            .save_bytes("church_files", "boletim.txt", b"Boletim semanal")
            .await?;
        ChurchFile {
            id: 0,
            church_id: church.id,
            file_name: "Boletim semanal".to_string(),
            file_path: bulletin,
            uploaded_at: now,
        }
        .insert(&self.pool)
        .await?;

        Ok(())
    }
}

/// Whole minutes keep seeded start times readable
fn next_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::database::DatabaseManager;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(&MediaConfig {
            root: dir.path().to_path_buf(),
            url_prefix: "/media/".to_string(),
        });
        let seed = SeedService::new(pool.clone(), media, 4);

        let first = seed.run().await.unwrap();
        assert_eq!(first.users_created, 3);
        assert!(first.church_created);
        assert_eq!(first.groups_created, 3);

        let second = seed.run().await.unwrap();
        assert_eq!(second.users_created, 0);
        assert!(!second.church_created);

        let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events").fetch_one(&pool).await.unwrap();
        assert_eq!(events, 1);

        let member = User::find_by_username(&pool, "membro@iasd.local").await.unwrap().unwrap();
        let profile = Profile::find_by_user(&pool, member.id).await.unwrap().unwrap();
        let groups = Group::list_for_member(&pool, profile.id, None).await.unwrap();
        assert_eq!(groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(), vec!["Infantil"]);
    }
}
