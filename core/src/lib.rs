//! Client core for the Notflix movie-catalog API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for every
//! backend operation (account, catalog, favorites, watchlist), attaching the
//! bearer token held by an injected `SessionStore`. The round-trip itself is
//! the caller's, or a `Transport`'s.
//!
//! # Design
//! - `NotflixClient` owns its config and session store and nothing else.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - Failures are a tagged `ApiError`; the generic UI message is available
//!   through `ApiError::user_message`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use client::NotflixClient;
pub use config::{ClientConfig, WatchlistPaths};
pub use error::{ApiError, ErrorKind, SessionError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Actor, Credentials, Director, Document, Genre, LoginResponse, Movie, NewUser, RegisterResponse, User,
    UserUpdate,
};
