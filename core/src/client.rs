//! Request builder and response parser for the Notflix API.
//!
//! # Design
//! `NotflixClient` holds a `ClientConfig` and an injected `SessionStore`.
//! Each backend operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; a
//! third method of the operation's own name runs both through a `Transport`.
//!
//! Authenticated builds read the token from the session every time, so a
//! login or logout between two builds is always observed. Session side
//! effects (login, registration, profile edit, deregistration) happen in the
//! matching `parse_*`, after the status check and before returning.
//!
//! Server records come back as [`Document`]s, so a body that is re-serialized
//! (or cached in the session) keeps the exact JSON the server sent.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientConfig, WatchlistPaths};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;
use crate::transport::Transport;
use crate::types::{
    Actor, Credentials, Director, Document, Genre, LoginResponse, Movie, NewUser, RegisterResponse, User,
    UserUpdate,
};

/// Which per-user movie list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovieList {
    Favorites,
    Watchlist,
}

/// Client for the Notflix API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values. Every call
/// is fire-once: nothing is retried or cached besides the session itself.
#[derive(Debug, Clone)]
pub struct NotflixClient<S> {
    config: ClientConfig,
    session: S,
}

impl<S: SessionStore> NotflixClient<S> {
    pub fn new(config: ClientConfig, session: S) -> Self {
        Self { config, session }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, method: HttpMethod, segments: &[&str]) -> Result<HttpRequest, ApiError> {
        let path = self.endpoint(segments)?.to_string();
        let mut headers = Vec::new();
        match self.session.token()? {
            Some(token) => headers.push(("authorization".to_string(), format!("Bearer {token}"))),
            None => debug!(url = %path, "no session token; sending request unauthenticated"),
        }
        Ok(HttpRequest {
            method,
            path,
            headers,
            body: None,
        })
    }

    fn authed_json<T: Serialize>(
        &self,
        method: HttpMethod,
        segments: &[&str],
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let mut req = self.authed(method, segments)?;
        req.headers.push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(encode(input)?);
        Ok(req)
    }

    fn build_list_change(
        &self,
        method: HttpMethod,
        list: MovieList,
        username: &str,
        movie_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        let joined = format!("{username}watchlist");
        let mut segments = match (list, self.config.watchlist_paths) {
            (MovieList::Favorites, _) => vec!["users", username, "favorites"],
            (MovieList::Watchlist, WatchlistPaths::Separated) => vec!["users", username, "watchlist"],
            (MovieList::Watchlist, WatchlistPaths::Legacy) => vec!["users", joined.as_str()],
        };
        segments.push(movie_id);
        self.authed(method, &segments)
    }

    fn round_trip<T>(
        &self,
        transport: &impl Transport,
        request: HttpRequest,
        parse: impl FnOnce(&Self, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let (method, url) = (request.method, request.path.clone());
        let response = transport.execute(request).map_err(|e| {
            warn!(%method, %url, error = %e, "request failed before a response arrived");
            e
        })?;
        parse(self, response)
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    pub fn build_register(&self, input: &NewUser) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.endpoint(&["users", "register"])?.to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(encode(input)?),
        })
    }

    /// Returns the registered user. When the server also logs the new user
    /// in, the session is stored before returning.
    pub fn parse_register(&self, response: HttpResponse) -> Result<Document<User>, ApiError> {
        check_status(&response)?;
        match decode_or_default::<RegisterResponse>(&response.body)? {
            RegisterResponse::Session(login) => {
                self.session.set(&login.token, &login.user)?;
                debug!(username = %login.user.username, "registered and logged in");
                Ok(login.user)
            }
            RegisterResponse::User(user) => Ok(user),
        }
    }

    pub fn register(
        &self,
        transport: &impl Transport,
        input: &NewUser,
    ) -> Result<Document<User>, ApiError> {
        self.round_trip(transport, self.build_register(input)?, Self::parse_register)
    }

    /// Credentials travel in the query string; no token is attached.
    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let mut url = self.endpoint(&["login"])?;
        url.query_pairs_mut()
            .append_pair("Username", &credentials.username)
            .append_pair("Password", &credentials.password);
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: url.to_string(),
            headers: Vec::new(),
            body: None,
        })
    }

    /// Stores the token and user in the session before returning them.
    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        check_status(&response)?;
        let login: LoginResponse = decode(&response.body)?;
        self.session.set(&login.token, &login.user)?;
        debug!(username = %login.user.username, "logged in");
        Ok(login)
    }

    pub fn login(
        &self,
        transport: &impl Transport,
        credentials: &Credentials,
    ) -> Result<LoginResponse, ApiError> {
        self.round_trip(transport, self.build_login(credentials)?, Self::parse_login)
    }

    /// Drops the local session. Nothing is sent to the server.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.clear()?;
        debug!("logged out");
        Ok(())
    }

    /// The user record cached at login or last profile edit.
    pub fn current_user(&self) -> Result<Option<Document<User>>, ApiError> {
        Ok(self.session.user()?)
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    pub fn build_list_movies(&self) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "movies"])
    }

    pub fn parse_list_movies(&self, response: HttpResponse) -> Result<Vec<Document<Movie>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn list_movies(&self, transport: &impl Transport) -> Result<Vec<Document<Movie>>, ApiError> {
        self.round_trip(transport, self.build_list_movies()?, Self::parse_list_movies)
    }

    pub fn build_get_movie(&self, title: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "movies", title])
    }

    pub fn parse_get_movie(&self, response: HttpResponse) -> Result<Document<Movie>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_movie(&self, transport: &impl Transport, title: &str) -> Result<Document<Movie>, ApiError> {
        self.round_trip(transport, self.build_get_movie(title)?, Self::parse_get_movie)
    }

    pub fn build_list_genres(&self) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "genres"])
    }

    pub fn parse_list_genres(&self, response: HttpResponse) -> Result<Vec<Document<Genre>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn list_genres(&self, transport: &impl Transport) -> Result<Vec<Document<Genre>>, ApiError> {
        self.round_trip(transport, self.build_list_genres()?, Self::parse_list_genres)
    }

    pub fn build_get_genre(&self, name: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "genres", name])
    }

    pub fn parse_get_genre(&self, response: HttpResponse) -> Result<Document<Genre>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_genre(&self, transport: &impl Transport, name: &str) -> Result<Document<Genre>, ApiError> {
        self.round_trip(transport, self.build_get_genre(name)?, Self::parse_get_genre)
    }

    pub fn build_list_directors(&self) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "directors"])
    }

    pub fn parse_list_directors(&self, response: HttpResponse) -> Result<Vec<Document<Director>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn list_directors(&self, transport: &impl Transport) -> Result<Vec<Document<Director>>, ApiError> {
        self.round_trip(transport, self.build_list_directors()?, Self::parse_list_directors)
    }

    pub fn build_get_director(&self, name: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "directors", name])
    }

    pub fn parse_get_director(&self, response: HttpResponse) -> Result<Document<Director>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_director(
        &self,
        transport: &impl Transport,
        name: &str,
    ) -> Result<Document<Director>, ApiError> {
        self.round_trip(transport, self.build_get_director(name)?, Self::parse_get_director)
    }

    pub fn build_list_actors(&self) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "actors"])
    }

    pub fn parse_list_actors(&self, response: HttpResponse) -> Result<Vec<Document<Actor>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn list_actors(&self, transport: &impl Transport) -> Result<Vec<Document<Actor>>, ApiError> {
        self.round_trip(transport, self.build_list_actors()?, Self::parse_list_actors)
    }

    pub fn build_get_actor(&self, name: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["catalog", "actors", name])
    }

    pub fn parse_get_actor(&self, response: HttpResponse) -> Result<Document<Actor>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_actor(&self, transport: &impl Transport, name: &str) -> Result<Document<Actor>, ApiError> {
        self.round_trip(transport, self.build_get_actor(name)?, Self::parse_get_actor)
    }

    // -----------------------------------------------------------------------
    // User profile
    // -----------------------------------------------------------------------

    pub fn build_get_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["users", username])
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<Document<User>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_user(&self, transport: &impl Transport, username: &str) -> Result<Document<User>, ApiError> {
        self.round_trip(transport, self.build_get_user(username)?, Self::parse_get_user)
    }

    pub fn build_edit_user(&self, username: &str, update: &UserUpdate) -> Result<HttpRequest, ApiError> {
        self.authed_json(HttpMethod::Put, &["users", username], update)
    }

    /// Replaces the cached user with the server's copy; the token is kept.
    pub fn parse_edit_user(&self, response: HttpResponse) -> Result<Document<User>, ApiError> {
        check_status(&response)?;
        let user: Document<User> = decode(&response.body)?;
        self.session.set_user(&user)?;
        debug!(username = %user.username, "cached user updated");
        Ok(user)
    }

    pub fn edit_user(
        &self,
        transport: &impl Transport,
        username: &str,
        update: &UserUpdate,
    ) -> Result<Document<User>, ApiError> {
        self.round_trip(transport, self.build_edit_user(username, update)?, Self::parse_edit_user)
    }

    pub fn build_delete_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Delete, &["users", username, "deregister"])
    }

    /// Clears the session on success and returns the server's message.
    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        self.session.clear()?;
        debug!("account deregistered; session cleared");
        Ok(response.body)
    }

    pub fn delete_user(&self, transport: &impl Transport, username: &str) -> Result<String, ApiError> {
        self.round_trip(transport, self.build_delete_user(username)?, Self::parse_delete_user)
    }

    // -----------------------------------------------------------------------
    // Favorites & watchlist
    // -----------------------------------------------------------------------

    pub fn build_get_favorites(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["users", username, "favorites"])
    }

    pub fn parse_get_favorites(&self, response: HttpResponse) -> Result<Vec<Document<Movie>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_favorites(
        &self,
        transport: &impl Transport,
        username: &str,
    ) -> Result<Vec<Document<Movie>>, ApiError> {
        self.round_trip(transport, self.build_get_favorites(username)?, Self::parse_get_favorites)
    }

    /// Always uses the separated `users/:username/watchlist` path; only the
    /// add/remove calls are affected by [`WatchlistPaths::Legacy`].
    pub fn build_get_watchlist(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &["users", username, "watchlist"])
    }

    pub fn parse_get_watchlist(&self, response: HttpResponse) -> Result<Vec<Document<Movie>>, ApiError> {
        check_status(&response)?;
        decode_or_default(&response.body)
    }

    pub fn get_watchlist(
        &self,
        transport: &impl Transport,
        username: &str,
    ) -> Result<Vec<Document<Movie>>, ApiError> {
        self.round_trip(transport, self.build_get_watchlist(username)?, Self::parse_get_watchlist)
    }

    pub fn build_add_favorite(&self, username: &str, movie_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_list_change(HttpMethod::Post, MovieList::Favorites, username, movie_id)
    }

    pub fn build_remove_favorite(&self, username: &str, movie_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_list_change(HttpMethod::Delete, MovieList::Favorites, username, movie_id)
    }

    pub fn build_add_to_watchlist(&self, username: &str, movie_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_list_change(HttpMethod::Post, MovieList::Watchlist, username, movie_id)
    }

    pub fn build_remove_from_watchlist(
        &self,
        username: &str,
        movie_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.build_list_change(HttpMethod::Delete, MovieList::Watchlist, username, movie_id)
    }

    /// Shared by all four list mutations: the server answers with plain text,
    /// which is returned unchanged.
    pub fn parse_list_change(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    pub fn add_favorite(
        &self,
        transport: &impl Transport,
        username: &str,
        movie_id: &str,
    ) -> Result<String, ApiError> {
        let request = self.build_add_favorite(username, movie_id)?;
        self.round_trip(transport, request, Self::parse_list_change)
    }

    pub fn remove_favorite(
        &self,
        transport: &impl Transport,
        username: &str,
        movie_id: &str,
    ) -> Result<String, ApiError> {
        let request = self.build_remove_favorite(username, movie_id)?;
        self.round_trip(transport, request, Self::parse_list_change)
    }

    pub fn add_to_watchlist(
        &self,
        transport: &impl Transport,
        username: &str,
        movie_id: &str,
    ) -> Result<String, ApiError> {
        let request = self.build_add_to_watchlist(username, movie_id)?;
        self.round_trip(transport, request, Self::parse_list_change)
    }

    pub fn remove_from_watchlist(
        &self,
        transport: &impl Transport,
        username: &str,
        movie_id: &str,
    ) -> Result<String, ApiError> {
        let request = self.build_remove_from_watchlist(username, movie_id)?;
        self.round_trip(transport, request, Self::parse_list_change)
    }
}

/// Map non-2xx status codes to the appropriate `ApiError` variant, logging
/// the status and body.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, body = %response.body, "server rejected request");
    let body = response.body.clone();
    Err(match response.status {
        401 => ApiError::Unauthorized { body },
        404 => ApiError::NotFound,
        status => ApiError::Http { status, body },
    })
}

fn encode<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "response body did not match the expected shape");
        ApiError::Deserialization(e.to_string())
    })
}

/// An empty or `null` body decodes to `T::default()`.
fn decode_or_default<T: DeserializeOwned + Default>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    decode::<Option<T>>(body).map(Option::unwrap_or_default)
}
