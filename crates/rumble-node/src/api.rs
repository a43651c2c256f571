//! HTTP API for RhymeRumble.
//!
//! The identity provider is external: every request that acts on behalf of a
//! user carries that user's id in the `x-rumble-user` header.

use crate::error::{Error, Result};
use crate::models::{generate_id, Poem, Profile, ProfileUpdate, Side, Theme};
use crate::node::RumbleState;
use crate::ws::ws_notifications_handler;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use rumble_ranking::LeaderboardEntry;
use rumble_social::{Edge, EdgeStore, Response as Answer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub(crate) type AppState = Arc<RwLock<RumbleState>>;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-rumble-user";

/// Longest accepted poem body, in characters.
pub const MAX_POEM_CHARS: usize = 2_000;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api/v1 for compatibility)
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/ready", get(ready))
        // Profiles
        .route("/api/v1/profiles", post(create_profile))
        .route("/api/v1/profiles/me", get(get_own_profile).patch(update_profile))
        .route("/api/v1/profiles/:id", get(get_profile))
        // Themes
        .route("/api/v1/themes", get(list_themes).post(create_theme))
        .route("/api/v1/themes/:id", get(get_theme))
        .route("/api/v1/themes/:id/close", post(close_theme))
        .route("/api/v1/themes/:id/poems", get(list_theme_poems))
        // Poems
        .route("/api/v1/poems", get(list_poems).post(create_poem))
        .route("/api/v1/poems/:id/like", post(toggle_like))
        // Leaderboard
        .route("/api/v1/leaderboard", get(get_leaderboard))
        // Friends
        .route("/api/v1/friends", get(list_friends))
        .route("/api/v1/friends/requests", post(send_friend_request))
        .route("/api/v1/friends/requests/:id", post(respond_friend_request))
        .route("/api/v1/friends/block", post(block_user))
        .route("/api/v1/friends/:user_id", delete(remove_friend))
        // WebSocket for friendship notifications
        .route("/api/v1/ws/notifications", get(ws_notifications_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// The authenticated user id, or 401.
pub(crate) fn current_user(headers: &HeaderMap) -> Result<String> {
    optional_user(headers)
        .ok_or_else(|| Error::Unauthorized(format!("missing {} header", USER_HEADER)))
}

fn optional_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Profile endpoints ---

#[derive(Debug, Deserialize)]
pub(crate) struct CreateProfileRequest {
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
}

async fn create_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    let user_id = current_user(&headers)?;
    let username = match (req.username, req.email) {
        (Some(username), _) => require_text("username", &username)?,
        (None, Some(email)) => Profile::username_from_email(&email),
        (None, None) => return Err(Error::InvalidInput("username or email required".into())),
    };

    let mut profile = Profile::new(user_id, username);
    profile.full_name = req.full_name;

    let state = state.write().await;
    state.storage.create_profile(&profile)?;
    tracing::info!(user = %profile.id, username = %profile.username, "profile created");

    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    let state = state.read().await;
    state
        .storage
        .get_profile(&id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("profile {}", id)))
}

async fn get_own_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>> {
    let user_id = current_user(&headers)?;
    get_profile(State(state), Path(user_id)).await
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    let profile = state.storage.update_profile(&user_id, update)?;
    Ok(Json(profile))
}

// --- Theme endpoints ---

/// Theme plus derived counters.
#[derive(Debug, Serialize)]
pub(crate) struct ThemeSummary {
    #[serde(flatten)]
    theme: Theme,
    total_poems: usize,
}

async fn list_themes(State(state): State<AppState>) -> Result<Json<Vec<ThemeSummary>>> {
    let state = state.read().await;
    let themes = state
        .storage
        .list_themes()?
        .into_iter()
        .map(|theme| {
            let total_poems = state.storage.poem_count(&theme.id)?;
            Ok(ThemeSummary { theme, total_poems })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(themes))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateThemeRequest {
    title: String,
    description: String,
    duality_option_1: String,
    duality_option_2: String,
    end_date: Option<u64>,
}

async fn create_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateThemeRequest>,
) -> Result<(StatusCode, Json<Theme>)> {
    let user_id = current_user(&headers)?;
    let title = require_text("title", &req.title)?;
    let side_1 = require_text("duality_option_1", &req.duality_option_1)?;
    let side_2 = require_text("duality_option_2", &req.duality_option_2)?;

    let id = generate_id(format!("theme:{}:{}", user_id, title).as_bytes());
    let mut theme = Theme::new(id, title, req.description, (side_1, side_2), user_id);
    theme.end_date = req.end_date;

    let state = state.write().await;
    state.storage.put_theme(&theme)?;
    tracing::info!(theme = %theme.id, by = %theme.created_by, "theme created");

    Ok((StatusCode::CREATED, Json(theme)))
}

async fn get_theme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThemeSummary>> {
    let state = state.read().await;
    let theme = state
        .storage
        .get_theme(&id)?
        .ok_or_else(|| Error::NotFound(format!("theme {}", id)))?;
    let total_poems = state.storage.poem_count(&id)?;
    Ok(Json(ThemeSummary { theme, total_poems }))
}

async fn close_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Theme>> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    let theme = state
        .storage
        .get_theme(&id)?
        .ok_or_else(|| Error::NotFound(format!("theme {}", id)))?;
    if theme.created_by != user_id {
        return Err(Error::Forbidden("only the theme creator can close it".into()));
    }
    Ok(Json(state.storage.close_theme(&id)?))
}

// --- Poem endpoints ---

/// Poem as seen by the requesting user, with the author's display fields.
#[derive(Debug, Serialize)]
pub(crate) struct PoemView {
    #[serde(flatten)]
    poem: Poem,
    author_username: Option<String>,
    author_avatar_url: Option<String>,
    is_liked: bool,
}

fn poem_views(
    state: &RumbleState,
    poems: Vec<Poem>,
    viewer: Option<&str>,
) -> Result<Vec<PoemView>> {
    let mut authors: HashMap<String, Option<Profile>> = HashMap::new();
    poems
        .into_iter()
        .map(|poem| {
            let author = match authors.get(&poem.author_id) {
                Some(author) => author.clone(),
                None => {
                    let author = state.storage.get_profile(&poem.author_id)?;
                    authors.insert(poem.author_id.clone(), author.clone());
                    author
                }
            };
            let is_liked = match viewer {
                Some(user) => state.storage.has_liked(&poem.id, user)?,
                None => false,
            };
            Ok(PoemView {
                author_username: author.as_ref().map(|p| p.username.clone()),
                author_avatar_url: author.and_then(|p| p.avatar_url),
                poem,
                is_liked,
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PoemListParams {
    /// Only poems by this user
    author: Option<String>,
}

/// All poems, newest first, optionally narrowed to one author.
async fn list_poems(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PoemListParams>,
) -> Result<Json<Vec<PoemView>>> {
    let viewer = optional_user(&headers);
    let state = state.read().await;

    let mut poems: Vec<Poem> = state
        .storage
        .list_poems()?
        .into_iter()
        .filter(|p| params.author.as_ref().map_or(true, |a| &p.author_id == a))
        .collect();
    poems.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(poem_views(&state, poems, viewer.as_deref())?))
}

async fn list_theme_poems(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(theme_id): Path<String>,
) -> Result<Json<Vec<PoemView>>> {
    let viewer = optional_user(&headers);
    let state = state.read().await;
    if state.storage.get_theme(&theme_id)?.is_none() {
        return Err(Error::NotFound(format!("theme {}", theme_id)));
    }

    let poems = state.storage.poems_for_theme(&theme_id)?;
    Ok(Json(poem_views(&state, poems, viewer.as_deref())?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePoemRequest {
    theme_id: String,
    title: String,
    content: String,
    side: Side,
}

async fn create_poem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePoemRequest>,
) -> Result<(StatusCode, Json<Poem>)> {
    let user_id = current_user(&headers)?;
    let title = require_text("title", &req.title)?;
    let content = require_text("content", &req.content)?;
    if content.chars().count() > MAX_POEM_CHARS {
        return Err(Error::InvalidInput(format!(
            "poem is longer than {} characters",
            MAX_POEM_CHARS
        )));
    }

    let state = state.write().await;
    let theme = state
        .storage
        .get_theme(&req.theme_id)?
        .ok_or_else(|| Error::NotFound(format!("theme {}", req.theme_id)))?;
    if !theme.accepts_poems(rumble_social::now_millis()) {
        return Err(Error::InvalidInput(format!("theme {} is closed", theme.id)));
    }

    let id = generate_id(format!("poem:{}:{}:{}", theme.id, user_id, title).as_bytes());
    let poem = Poem::new(id, theme.id, user_id, title, content, req.side);
    state.storage.put_poem(&poem)?;
    tracing::info!(poem = %poem.id, theme = %poem.theme_id, "poem published");

    Ok((StatusCode::CREATED, Json(poem)))
}

#[derive(Debug, Serialize)]
pub(crate) struct LikeResult {
    poem: Poem,
    liked: bool,
}

async fn toggle_like(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poem_id): Path<String>,
) -> Result<Json<LikeResult>> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    let (poem, liked) = state.storage.toggle_like(&poem_id, &user_id)?;
    Ok(Json(LikeResult { poem, liked }))
}

// --- Leaderboard endpoint ---

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeaderboardParams {
    /// Only count activity at or after this time (unix millis)
    since: Option<u64>,
    limit: Option<usize>,
}

/// Leaderboard row with the poet's display name.
#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardRow {
    #[serde(flatten)]
    entry: LeaderboardEntry,
    username: Option<String>,
    avatar_url: Option<String>,
}

async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardRow>>> {
    let state = state.read().await;
    let records = state.storage.contributions(params.since)?;
    let board = match params.limit {
        Some(limit) => rumble_ranking::top(&records, limit),
        None => rumble_ranking::rank(&records),
    };

    let profiles: HashMap<String, Profile> = state
        .storage
        .list_profiles()?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let rows = board
        .into_iter()
        .map(|entry| {
            let profile = profiles.get(&entry.user_id);
            LeaderboardRow {
                username: profile.map(|p| p.username.clone()),
                avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                entry,
            }
        })
        .collect();
    Ok(Json(rows))
}

// --- Friend endpoints ---

/// A friend, resolved to a profile where one exists.
#[derive(Debug, Serialize)]
pub(crate) struct FriendSummary {
    id: String,
    profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FriendsResponse {
    friends: Vec<FriendSummary>,
    sent: Vec<Edge>,
    received: Vec<Edge>,
}

async fn list_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FriendsResponse>> {
    let user_id = current_user(&headers)?;
    let state = state.read().await;
    let view = state.friendships.query(&user_id)?;

    let friends = view
        .friends
        .into_iter()
        .map(|id| {
            let profile = state.storage.get_profile(&id)?;
            Ok(FriendSummary { id, profile })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(FriendsResponse {
        friends,
        sent: view.sent,
        received: view.received,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TargetRequest {
    target_id: String,
}

/// Self-targets are rejected before the profile lookup.
fn check_target(state: &RumbleState, user_id: &str, target_id: &str) -> Result<()> {
    if user_id == target_id {
        return Err(rumble_social::Error::InvalidSelfRequest.into());
    }
    if state.storage.get_profile(target_id)?.is_none() {
        return Err(Error::NotFound(format!("profile {}", target_id)));
    }
    Ok(())
}

async fn send_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TargetRequest>,
) -> Result<(StatusCode, Json<Edge>)> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    check_target(&state, &user_id, &req.target_id)?;
    let edge = state.friendships.send_request(&user_id, &req.target_id)?;
    Ok((StatusCode::CREATED, Json(edge)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RespondRequest {
    action: Answer,
}

async fn respond_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(edge_id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Option<Edge>>> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;

    // Only the recipient may answer; unknown edges fall through to the
    // state machine's own rejection.
    let existing = state
        .storage
        .get_edge(&edge_id)
        .map_err(rumble_social::Error::from)?;
    if let Some(edge) = existing {
        if edge.involves(&user_id) && edge.recipient() != user_id {
            return Err(Error::Forbidden("only the recipient can answer a request".into()));
        }
        if !edge.involves(&user_id) {
            return Err(Error::NotFound(format!("friend request {}", edge_id)));
        }
    }

    let edge = state.friendships.respond(&edge_id, req.action)?;
    Ok(Json(edge))
}

async fn block_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TargetRequest>,
) -> Result<Json<Edge>> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    check_target(&state, &user_id, &req.target_id)?;
    let edge = state.friendships.block(&user_id, &req.target_id)?;
    Ok(Json(edge))
}

async fn remove_friend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other): Path<String>,
) -> Result<StatusCode> {
    let user_id = current_user(&headers)?;
    let state = state.write().await;
    state.friendships.remove(&user_id, &other)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeConfig;
    use axum::http::HeaderValue;
    use rumble_social::EdgeStatus;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        let state = RumbleState::open(config).unwrap();
        (dir, Arc::new(RwLock::new(state)))
    }

    fn as_user(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    async fn register(state: &AppState, id: &str, username: &str) {
        create_profile(
            State(state.clone()),
            as_user(id),
            Json(CreateProfileRequest {
                username: Some(username.into()),
                email: None,
                full_name: None,
            }),
        )
        .await
        .unwrap();
    }

    async fn new_theme(state: &AppState, owner: &str) -> Theme {
        let (_, Json(theme)) = create_theme(
            State(state.clone()),
            as_user(owner),
            Json(CreateThemeRequest {
                title: "Friend or Foe".into(),
                description: "Pick a side".into(),
                duality_option_1: "Friend".into(),
                duality_option_2: "Foe".into(),
                end_date: None,
            }),
        )
        .await
        .unwrap();
        theme
    }

    async fn new_poem(state: &AppState, author: &str, theme_id: &str) -> Poem {
        let (_, Json(poem)) = create_poem(
            State(state.clone()),
            as_user(author),
            Json(CreatePoemRequest {
                theme_id: theme_id.into(),
                title: "Ode".into(),
                content: "A friend in verse, a foe in rhyme".into(),
                side: Side::Option1,
            }),
        )
        .await
        .unwrap();
        poem
    }

    #[test]
    fn router_builds() {
        let (_dir, state) = test_state();
        let _router = build_router(state);
    }

    #[test]
    fn missing_user_header_is_unauthorized() {
        let err = current_user(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(current_user(&as_user(" u1 ")).unwrap(), "u1");
    }

    #[tokio::test]
    async fn profile_lifecycle() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;

        let Json(me) = get_own_profile(State(state.clone()), as_user("u1")).await.unwrap();
        assert_eq!(me.username, "ana");
        assert_eq!(me.level, 1);

        let Json(updated) = update_profile(
            State(state.clone()),
            as_user("u1"),
            Json(ProfileUpdate { bio: Some("I rhyme".into()), ..Default::default() }),
        )
        .await
        .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("I rhyme"));

        let err = get_profile(State(state.clone()), Path("ghost".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn username_from_email_fallback() {
        let (_dir, state) = test_state();
        let (status, Json(profile)) = create_profile(
            State(state.clone()),
            as_user("u9"),
            Json(CreateProfileRequest {
                username: None,
                email: Some("verse@example.com".into()),
                full_name: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(profile.username, "verse");
    }

    #[tokio::test]
    async fn poems_likes_and_leaderboard() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        register(&state, "u2", "ben").await;

        let theme = new_theme(&state, "u1").await;
        let p1 = new_poem(&state, "u1", &theme.id).await;
        new_poem(&state, "u2", &theme.id).await;

        let Json(like) = toggle_like(State(state.clone()), as_user("u2"), Path(p1.id.clone()))
            .await
            .unwrap();
        assert!(like.liked);
        assert_eq!(like.poem.likes_count, 1);

        let Json(poems) =
            list_theme_poems(State(state.clone()), as_user("u2"), Path(theme.id.clone()))
                .await
                .unwrap();
        assert_eq!(poems.len(), 2);
        assert!(poems.iter().any(|p| p.poem.id == p1.id && p.is_liked));

        // Only the creator can close
        let err = close_theme(State(state.clone()), as_user("u2"), Path(theme.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(closed) = close_theme(State(state.clone()), as_user("u1"), Path(theme.id.clone()))
            .await
            .unwrap();
        assert_eq!(closed.winner_poem_id.as_deref(), Some(p1.id.as_str()));

        // Closed themes take no new poems
        let err = create_poem(
            State(state.clone()),
            as_user("u2"),
            Json(CreatePoemRequest {
                theme_id: theme.id.clone(),
                title: "Late".into(),
                content: "Too late".into(),
                side: Side::Neutral,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let Json(board) = get_leaderboard(State(state.clone()), Query(LeaderboardParams::default()))
            .await
            .unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].entry.user_id, "u1");
        assert_eq!(board[0].entry.rank, 1);
        assert_eq!(board[0].entry.score, 5 + 2 + 10);
        assert_eq!(board[0].username.as_deref(), Some("ana"));
        assert_eq!(board[1].entry.score, 5);

        let Json(top) = get_leaderboard(
            State(state.clone()),
            Query(LeaderboardParams { since: None, limit: Some(1) }),
        )
        .await
        .unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn poems_filtered_by_author() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        register(&state, "u2", "ben").await;

        let theme = new_theme(&state, "u1").await;
        let first = new_poem(&state, "u1", &theme.id).await;
        new_poem(&state, "u2", &theme.id).await;
        let second = new_poem(&state, "u1", &theme.id).await;

        let Json(all) = list_poems(
            State(state.clone()),
            HeaderMap::new(),
            Query(PoemListParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 3);

        let Json(mine) = list_poems(
            State(state.clone()),
            as_user("u2"),
            Query(PoemListParams { author: Some("u1".into()) }),
        )
        .await
        .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.poem.author_id == "u1"));
        assert!(mine.iter().all(|p| p.author_username.as_deref() == Some("ana")));
        assert!(mine.windows(2).all(|w| w[0].poem.created_at >= w[1].poem.created_at));

        let ids: Vec<&str> = mine.iter().map(|p| p.poem.id.as_str()).collect();
        assert!(ids.contains(&first.id.as_str()) && ids.contains(&second.id.as_str()));

        let Json(none) = list_poems(
            State(state.clone()),
            HeaderMap::new(),
            Query(PoemListParams { author: Some("ghost".into()) }),
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn self_target_rejected_before_profile_lookup() {
        let (_dir, state) = test_state();

        let err = send_friend_request(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "u1".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = block_user(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "u1".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn block_unknown_profile() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        let err = block_user(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "nobody".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_poem_rejected() {
        let (_dir, state) = test_state();
        let theme = new_theme(&state, "u1").await;
        let err = create_poem(
            State(state.clone()),
            as_user("u1"),
            Json(CreatePoemRequest {
                theme_id: theme.id,
                title: "Blank".into(),
                content: "   ".into(),
                side: Side::Neutral,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn friendship_flow() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        register(&state, "u2", "ben").await;

        let mut events = state.read().await.notifier.subscribe();

        let (status, Json(edge)) = send_friend_request(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "u2".into() }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(events.recv().await.unwrap().concerns("u2"));

        // Duplicate from the other side
        let err = send_friend_request(
            State(state.clone()),
            as_user("u2"),
            Json(TargetRequest { target_id: "u1".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        // Requester cannot accept their own request
        let err = respond_friend_request(
            State(state.clone()),
            as_user("u1"),
            Path(edge.id.clone()),
            Json(RespondRequest { action: Answer::Accept }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(accepted) = respond_friend_request(
            State(state.clone()),
            as_user("u2"),
            Path(edge.id.clone()),
            Json(RespondRequest { action: Answer::Accept }),
        )
        .await
        .unwrap();
        assert_eq!(accepted.map(|e| e.status), Some(EdgeStatus::Accepted));

        let Json(friends) = list_friends(State(state.clone()), as_user("u1")).await.unwrap();
        assert_eq!(friends.friends.len(), 1);
        assert_eq!(friends.friends[0].id, "u2");
        assert_eq!(
            friends.friends[0].profile.as_ref().map(|p| p.username.as_str()),
            Some("ben")
        );
        assert!(friends.sent.is_empty() && friends.received.is_empty());

        let status = remove_friend(State(state.clone()), as_user("u2"), Path("u1".into()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = remove_friend(State(state.clone()), as_user("u2"), Path("u1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_to_unknown_profile() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        let err = send_friend_request(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "nobody".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blocked_user_cannot_request() {
        let (_dir, state) = test_state();
        register(&state, "u1", "ana").await;
        register(&state, "u2", "ben").await;

        block_user(
            State(state.clone()),
            as_user("u1"),
            Json(TargetRequest { target_id: "u2".into() }),
        )
        .await
        .unwrap();

        let err = send_friend_request(
            State(state.clone()),
            as_user("u2"),
            Json(TargetRequest { target_id: "u1".into() }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Social(rumble_social::Error::RequestBlocked)));
    }
}
