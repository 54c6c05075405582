use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Genre {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Director {
    pub name: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Actor {
    pub name: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub genre: Genre,
    pub director: Director,
    pub actors: Vec<String>,
    pub image_path: String,
    pub featured: bool,
}

/// A stored account. The password never leaves the server.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub favorite_movies: Vec<String>,
    pub watchlist: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default, alias = "Birthday")]
    pub birth_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "Birthday")]
    pub birth_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Everything the server knows: catalog, accounts and issued tokens.
#[derive(Debug, Default)]
pub struct Store {
    pub movies: Vec<Movie>,
    pub genres: Vec<Genre>,
    pub directors: Vec<Director>,
    pub actors: Vec<Actor>,
    pub users: HashMap<String, User>,
    /// token -> username
    pub tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, String);

fn reject(status: StatusCode, msg: impl Into<String>) -> Rejection {
    (status, msg.into())
}

/// Small fixed catalog so clients have something to browse.
pub fn seed() -> Store {
    let horror = Genre {
        name: "Horror".to_string(),
        description: "Films meant to frighten.".to_string(),
    };
    let scifi = Genre {
        name: "Science Fiction".to_string(),
        description: "Speculative futures and technology.".to_string(),
    };
    let scott = Director {
        name: "Ridley Scott".to_string(),
        bio: "English film director.".to_string(),
        birth: Some("1937".to_string()),
        death: None,
    };
    let wachowskis = Director {
        name: "Lana Wachowski".to_string(),
        bio: "American film director.".to_string(),
        birth: Some("1965".to_string()),
        death: None,
    };
    let weaver = Actor {
        name: "Sigourney Weaver".to_string(),
        bio: "American actress.".to_string(),
        birth: Some("1949".to_string()),
    };
    let reeves = Actor {
        name: "Keanu Reeves".to_string(),
        bio: "Canadian actor.".to_string(),
        birth: Some("1964".to_string()),
    };
    let movies = vec![
        Movie {
            id: "42".to_string(),
            title: "Alien".to_string(),
            description: "A crew answers a distress call.".to_string(),
            genre: horror.clone(),
            director: scott.clone(),
            actors: vec![weaver.name.clone()],
            image_path: "alien.jpg".to_string(),
            featured: true,
        },
        Movie {
            id: "43".to_string(),
            title: "Blade Runner".to_string(),
            description: "A blade runner hunts replicants.".to_string(),
            genre: scifi.clone(),
            director: scott.clone(),
            actors: Vec::new(),
            image_path: "blade-runner.jpg".to_string(),
            featured: false,
        },
        Movie {
            id: "44".to_string(),
            title: "The Matrix".to_string(),
            description: "A hacker learns the truth about reality.".to_string(),
            genre: scifi.clone(),
            director: wachowskis.clone(),
            actors: vec![reeves.name.clone()],
            image_path: "matrix.jpg".to_string(),
            featured: true,
        },
    ];
    Store {
        movies,
        genres: vec![horror, scifi],
        directors: vec![scott, wachowskis],
        actors: vec![weaver, reeves],
        ..Store::default()
    }
}

pub fn app() -> Router {
    app_with_state(Arc::new(RwLock::new(seed())))
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/users/register", post(register))
        .route("/login", post(login))
        .route("/catalog/movies", get(list_movies))
        .route("/catalog/movies/{title}", get(get_movie))
        .route("/catalog/genres", get(list_genres))
        .route("/catalog/genres/{name}", get(get_genre))
        .route("/catalog/directors", get(list_directors))
        .route("/catalog/directors/{name}", get(get_director))
        .route("/catalog/actors", get(list_actors))
        .route("/catalog/actors/{name}", get(get_actor))
        .route("/users/{username}", get(get_user).put(edit_user))
        .route("/users/{username}/deregister", delete(deregister))
        .route("/users/{username}/favorites", get(list_favorites))
        .route(
            "/users/{username}/favorites/{movie_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/users/{username}/watchlist", get(list_watchlist))
        .route(
            "/users/{username}/watchlist/{movie_id}",
            post(add_to_watchlist).delete(remove_from_watchlist),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Resolve the bearer token to a username.
fn authenticate(store: &Store, headers: &HeaderMap) -> Result<String, Rejection> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Unauthorized"))?;
    store
        .tokens
        .get(token)
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

/// Authenticate and require the token to belong to `username`.
fn authorize_user(store: &Store, headers: &HeaderMap, username: &str) -> Result<(), Rejection> {
    let caller = authenticate(store, headers)?;
    if caller != username {
        return Err(reject(StatusCode::FORBIDDEN, "Permission denied"));
    }
    if !store.users.contains_key(username) {
        return Err(reject(StatusCode::NOT_FOUND, format!("{username} was not found")));
    }
    Ok(())
}

// --- account ---

async fn register(
    State(db): State<Db>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), Rejection> {
    if input.username.is_empty() || input.password.is_empty() {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "Username and Password are required"));
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.username) {
        return Err(reject(StatusCode::CONFLICT, format!("{} already exists", input.username)));
    }
    let user = User {
        username: input.username,
        password: input.password,
        email: input.email,
        birth_date: input.birth_date,
        favorite_movies: Vec::new(),
        watchlist: Vec::new(),
    };
    store.users.insert(user.username.clone(), user.clone());
    info!(username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(db): State<Db>,
    Query(params): Query<LoginParams>,
) -> Result<Json<LoginResponse>, Rejection> {
    let mut store = db.write().await;
    let user = store
        .users
        .get(&params.username)
        .filter(|u| u.password == params.password)
        .cloned()
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Wrong username or password"))?;
    let token = Uuid::new_v4().to_string();
    store.tokens.insert(token.clone(), user.username.clone());
    info!(username = %user.username, "user logged in");
    Ok(Json(LoginResponse { token, user }))
}

async fn get_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<User>, Rejection> {
    let store = db.read().await;
    authorize_user(&store, &headers, &username)?;
    store
        .users
        .get(&username)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "user not found"))
}

async fn edit_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(input): Json<UserUpdate>,
) -> Result<Json<User>, Rejection> {
    let mut store = db.write().await;
    authorize_user(&store, &headers, &username)?;

    let new_name = input.username.filter(|n| !n.is_empty() && *n != username);
    if let Some(name) = &new_name {
        if store.users.contains_key(name) {
            return Err(reject(StatusCode::CONFLICT, format!("{name} already exists")));
        }
    }
    let mut user = store
        .users
        .remove(&username)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "user not found"))?;
    if let Some(password) = input.password.filter(|p| !p.is_empty()) {
        user.password = password;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(birth_date) = input.birth_date {
        user.birth_date = Some(birth_date);
    }
    if let Some(name) = new_name {
        user.username = name;
        for owner in store.tokens.values_mut().filter(|owner| **owner == username) {
            owner.clone_from(&user.username);
        }
    }
    store.users.insert(user.username.clone(), user.clone());
    Ok(Json(user))
}

async fn deregister(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<String, Rejection> {
    let mut store = db.write().await;
    authorize_user(&store, &headers, &username)?;
    store.users.remove(&username);
    store.tokens.retain(|_, owner| *owner != username);
    info!(%username, "user deregistered");
    Ok(format!("{username} was deleted."))
}

// --- catalog ---

async fn list_movies(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Movie>>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    Ok(Json(store.movies.clone()))
}

async fn get_movie(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(title): Path<String>,
) -> Result<Json<Movie>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    store
        .movies
        .iter()
        .find(|m| m.title == title)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{title} was not found")))
}

async fn list_genres(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Genre>>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    Ok(Json(store.genres.clone()))
}

async fn get_genre(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Genre>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    store
        .genres
        .iter()
        .find(|g| g.name == name)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{name} was not found")))
}

async fn list_directors(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Director>>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    Ok(Json(store.directors.clone()))
}

async fn get_director(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Director>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    store
        .directors
        .iter()
        .find(|d| d.name == name)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{name} was not found")))
}

async fn list_actors(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Actor>>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    Ok(Json(store.actors.clone()))
}

async fn get_actor(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Actor>, Rejection> {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    store
        .actors
        .iter()
        .find(|a| a.name == name)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("{name} was not found")))
}

// --- favorites & watchlist ---

#[derive(Clone, Copy)]
enum List {
    Favorites,
    Watchlist,
}

impl List {
    fn label(self) -> &'static str {
        match self {
            List::Favorites => "favorites",
            List::Watchlist => "watchlist",
        }
    }

    fn ids(self, user: &User) -> &[String] {
        match self {
            List::Favorites => &user.favorite_movies,
            List::Watchlist => &user.watchlist,
        }
    }

    fn ids_mut(self, user: &mut User) -> &mut Vec<String> {
        match self {
            List::Favorites => &mut user.favorite_movies,
            List::Watchlist => &mut user.watchlist,
        }
    }
}

async fn list_movies_of(
    db: Db,
    headers: HeaderMap,
    username: String,
    list: List,
) -> Result<Json<Vec<Movie>>, Rejection> {
    let store = db.read().await;
    authorize_user(&store, &headers, &username)?;
    let ids = store.users.get(&username).map(|u| list.ids(u)).unwrap_or_default();
    let movies = ids
        .iter()
        .filter_map(|id| store.movies.iter().find(|m| &m.id == id).cloned())
        .collect();
    Ok(Json(movies))
}

async fn change_list(
    db: Db,
    headers: HeaderMap,
    (username, movie_id): (String, String),
    list: List,
    add: bool,
) -> Result<String, Rejection> {
    let mut store = db.write().await;
    authorize_user(&store, &headers, &username)?;
    if !store.movies.iter().any(|m| m.id == movie_id) {
        return Err(reject(StatusCode::NOT_FOUND, format!("movie {movie_id} was not found")));
    }
    let user = store
        .users
        .get_mut(&username)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "user not found"))?;
    let ids = list.ids_mut(user);
    let label = list.label();
    if add {
        if !ids.contains(&movie_id) {
            ids.push(movie_id.clone());
        }
        Ok(format!("Movie {movie_id} was added to {label}."))
    } else {
        ids.retain(|id| *id != movie_id);
        Ok(format!("Movie {movie_id} was removed from {label}."))
    }
}

async fn list_favorites(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<Vec<Movie>>, Rejection> {
    list_movies_of(db, headers, username, List::Favorites).await
}

async fn list_watchlist(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<Vec<Movie>>, Rejection> {
    list_movies_of(db, headers, username, List::Watchlist).await
}

async fn add_favorite(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<(String, String)>,
) -> Result<String, Rejection> {
    change_list(db, headers, path, List::Favorites, true).await
}

async fn remove_favorite(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<(String, String)>,
) -> Result<String, Rejection> {
    change_list(db, headers, path, List::Favorites, false).await
}

async fn add_to_watchlist(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<(String, String)>,
) -> Result<String, Rejection> {
    change_list(db, headers, path, List::Watchlist, true).await
}

async fn remove_from_watchlist(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<(String, String)>,
) -> Result<String, Rejection> {
    change_list(db, headers, path, List::Watchlist, false).await
}
