use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, MethodRouter},
    Extension, Json, Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::models::AnnouncementKind;
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::media::MediaStore;
use crate::middleware::{cors_middleware, token_auth_middleware, CorsPolicy};

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        let media = MediaStore::new(&config.media);
        Self {
            pool,
            config: Arc::new(config),
            media,
        }
    }

    /// List size used when the client sends no `limit`
    pub fn default_limit(&self) -> i64 {
        self.config.api.default_page_limit
    }
}

/// The five routes every resource shares
struct Crud {
    list: MethodRouter<AppState>,
    detail: MethodRouter<AppState>,
    create: MethodRouter<AppState>,
    update: MethodRouter<AppState>,
    delete: MethodRouter<AppState>,
}

/// Mount a resource under each of its prefixes. POST on the collection
/// creates, like `/create/`.
fn crud(router: Router<AppState>, prefixes: &[&str], routes: Crud) -> Router<AppState> {
    prefixes.iter().fold(router, |router, prefix| {
        router
            .route(&format!("{prefix}/"), routes.list.clone().merge(routes.create.clone()))
            .route(&format!("{prefix}/create/"), routes.create.clone())
            .route(&format!("{prefix}/:id/"), routes.detail.clone())
            .route(&format!("{prefix}/:id/update/"), routes.update.clone())
            .route(&format!("{prefix}/:id/delete/"), routes.delete.clone())
    })
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = CorsPolicy::new(&state.config.security);
    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .nest_service("/media", media)
        .layer(middleware::from_fn_with_state(cors, cors_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, church, events};

    Router::new()
        .route("/api/register/", post(auth::register))
        .route("/api/login/", post(auth::login))
        .route("/api/church/", get(church::detail))
        .route("/api/events/upcoming/", get(events::upcoming))
        .route("/api/event-updates/", get(events::published_updates))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::*;

    let router = Router::new()
        .route("/api/logout/", post(session::logout))
        .route("/api/auth/me/", get(session::me))
        .route("/api/participations/", get(participations::list))
        .route("/api/profiles/notify/", get(notify::list).post(notify::send));

    let router = crud(
        router,
        &["/api/churches", "/api/igrejas"],
        Crud {
            list: get(churches::list),
            detail: get(churches::detail),
            create: post(churches::create),
            update: post(churches::update),
            delete: post(churches::delete),
        },
    )
    .route("/api/churches/:id/hours/", get(churches::hours).post(churches::add_hour))
    .route("/api/churches/:id/hours/:hour_id/delete/", post(churches::delete_hour))
    .route("/api/churches/:id/exceptions/", get(churches::exceptions).post(churches::add_exception))
    .route("/api/churches/:id/exceptions/:exception_id/delete/", post(churches::delete_exception))
    .route("/api/churches/:id/staff/", get(staff::list).post(staff::assign))
    .route("/api/churches/:id/staff/:user_id/delete/", post(staff::remove));

    let router = crud(
        router,
        &["/api/groups", "/api/grupos"],
        Crud {
            list: get(groups::list),
            detail: get(groups::detail),
            create: post(groups::create),
            update: post(groups::update),
            delete: post(groups::delete),
        },
    )
    .route("/api/groups/:id/roles/", get(groups::roles).post(groups::add_role))
    .route("/api/groups/:id/roles/:role_id/delete/", post(groups::delete_role))
    .route("/api/groups/:id/members/", get(members::list).post(members::add))
    .route("/api/groups/:id/members/:profile_id/promote/", post(members::promote))
    .route("/api/groups/:id/members/:profile_id/delete/", post(members::remove))
    .route("/api/groups/:id/chat/", get(chat::list).post(chat::send))
    .route("/api/groups/:id/chat/:message_id/update/", post(chat::edit))
    .route("/api/groups/:id/chat/:message_id/delete/", post(chat::delete));

    // Profiles are created by registration
    let router = router
        .route("/api/profiles/", get(profiles::list))
        .route("/api/profiles/:id/", get(profiles::detail))
        .route("/api/profiles/:id/update/", post(profiles::update))
        .route("/api/profiles/:id/delete/", post(profiles::delete));

    let router = crud(
        router,
        &["/api/events"],
        Crud {
            list: get(events::list),
            detail: get(events::detail),
            create: post(events::create),
            update: post(events::update),
            delete: post(events::delete),
        },
    )
    .route("/api/events/:id/confirm/", post(events::confirm))
    .route("/api/events/:id/participants/", get(events::participants))
    .route("/api/events/:id/updates/", get(events::updates).post(events::add_update));

    let router = crud(
        router,
        &["/api/activities", "/api/atividades"],
        Crud {
            list: get(activities::list),
            detail: get(activities::detail),
            create: post(activities::create),
            update: post(activities::update),
            delete: post(activities::delete),
        },
    );

    let router = crud(
        router,
        &["/api/group-notifications", "/api/notificacoes-grupos"],
        Crud {
            list: get(group_notifications::list),
            detail: get(group_notifications::detail),
            create: post(group_notifications::create),
            update: post(group_notifications::update),
            delete: post(group_notifications::delete),
        },
    );

    let router = crud(
        router,
        &["/api/posts", "/api/postagens-grupos"],
        Crud {
            list: get(posts::list),
            detail: get(posts::detail),
            create: post(posts::create),
            update: post(posts::update),
            delete: post(posts::delete),
        },
    );

    let router = crud(
        router,
        &["/api/comments", "/api/comentarios-postagens"],
        Crud {
            list: get(comments::list),
            detail: get(comments::detail),
            create: post(comments::create),
            update: post(comments::update),
            delete: post(comments::delete),
        },
    );

    let router = crud(
        router,
        &["/api/private-messages", "/api/mensagens-privadas"],
        Crud {
            list: get(messages::list),
            detail: get(messages::detail),
            create: post(messages::create),
            update: post(messages::update),
            delete: post(messages::delete),
        },
    );

    let router = crud(
        router,
        &["/api/church-files", "/api/arquivos-igreja"],
        Crud {
            list: get(church_files::list),
            detail: get(church_files::detail),
            create: post(church_files::create),
            update: post(church_files::update),
            delete: post(church_files::delete),
        },
    );

    let router = crud(
        router,
        &["/api/educational-resources", "/api/recursos-educacionais"],
        Crud {
            list: get(resources::list),
            detail: get(resources::detail),
            create: post(resources::create),
            update: post(resources::update),
            delete: post(resources::delete),
        },
    )
    .merge(announcement_routes(AnnouncementKind::Communique, &["/api/communiques", "/api/comunicados"]))
    .merge(announcement_routes(AnnouncementKind::Notice, &["/api/notices", "/api/avisos"]));

    router.route_layer(middleware::from_fn_with_state(state, token_auth_middleware))
}

/// Communiques and notices share handlers; the kind rides along as an extension
fn announcement_routes(kind: AnnouncementKind, prefixes: &[&str]) -> Router<AppState> {
    use protected::announcements;

    crud(
        Router::new(),
        prefixes,
        Crud {
            list: get(announcements::list),
            detail: get(announcements::detail),
            create: post(announcements::create),
            update: post(announcements::update),
            delete: post(announcements::delete),
        },
    )
    .layer(Extension(kind))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Church API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Members, churches, groups, events, posts and messaging",
        "endpoints": {
            "public": ["/api/register/", "/api/login/", "/api/church/", "/api/events/upcoming/", "/api/event-updates/"],
            "protected": "/api/* (Authorization: Token <key>)",
            "media": "/media/*",
            "health": "/health",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::from_env();
        config.media.root = dir.path().to_path_buf();
        config.security.cors_allow_all = true;
        (AppState::new(pool, config), dir)
    }

    async fn test_app() -> (Router, tempfile::TempDir) {
        let (state, dir) = test_state().await;
        (app(state), dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_pings_the_database() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(Request::get("/api/grupos/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn options_under_api_is_an_empty_200_with_cors_headers() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/events/")
                    .header(header::ORIGIN, "http://localhost:8081")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:8081"
        );
    }

    #[tokio::test]
    async fn api_responses_carry_cors_headers_without_an_origin() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(Request::get("/api/church/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET, POST, OPTIONS");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type, Authorization"
        );
        assert!(headers.get(header::VARY).is_none());
    }

    #[tokio::test]
    async fn api_responses_echo_the_request_origin() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::get("/api/church/")
                    .header(header::ORIGIN, "http://a.b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "http://a.b");
        assert_eq!(headers.get(header::VARY).unwrap(), "Origin");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET, POST, OPTIONS");
    }

    #[tokio::test]
    async fn cors_stays_off_paths_outside_the_api() {
        let (app, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://a.b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }

    #[tokio::test]
    async fn non_numeric_ids_are_a_json_404() {
        let (state, _dir) = test_state().await;
        let accounts = crate::services::AccountService::new(state.pool.clone(), 4);
        let (_, token) = accounts
            .create(
                crate::services::NewAccount {
                    username: "ana@iasd.local".to_string(),
                    email: "ana@iasd.local".to_string(),
                    password: "StrongPass123!".to_string(),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();

        let response = app(state)
            .oneshot(
                Request::get("/api/groups/abc/")
                    .header(header::AUTHORIZATION, format!("Token {}", token.unwrap()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], true);
    }
}
