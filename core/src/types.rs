//! Domain DTOs for the Notflix API.
//!
//! # Design
//! Server documents (users and catalog records) are decoded into a
//! [`Document`]: the exact JSON the server sent, plus a typed view of it.
//! Serializing a `Document` writes the original JSON back, so a record passes
//! through the client (and through the session store) unchanged. The typed
//! views default every field and treat `null` like an absent field.
//!
//! Field names follow the backend's PascalCase wire format. The mock-server
//! crate defines its own copies; the integration tests catch schema drift
//! between the two.

use std::fmt;
use std::ops::Deref;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A server document: the JSON as received plus its typed view.
///
/// Derefs to the view, so `movie.title` reads the typed field. Equality
/// compares the raw JSON.
#[derive(Clone)]
pub struct Document<T> {
    view: T,
    raw: Value,
}

impl<T> Document<T> {
    pub fn view(&self) -> &T {
        &self.view
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_view(self) -> T {
        self.view
    }
}

impl<T: Serialize> Document<T> {
    /// Build a document from a typed value, using its serialized form as the
    /// raw JSON.
    pub fn new(view: T) -> Result<Self, serde_json::Error> {
        let raw = serde_json::to_value(&view)?;
        Ok(Self { view, raw })
    }
}

impl<T: DeserializeOwned> Document<T> {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let view = T::deserialize(without_nulls(&raw))?;
        Ok(Self { view, raw })
    }
}

/// Copy of `value` with every `null` object member removed, so container
/// defaults apply to `null` fields the same way they apply to missing ones.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

impl<T> Deref for Document<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.view
    }
}

impl<T: Default> Default for Document<T> {
    fn default() -> Self {
        Self {
            view: T::default(),
            raw: Value::Object(Map::new()),
        }
    }
}

impl<T> PartialEq for Document<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Document<T> {}

impl<T: fmt::Debug> fmt::Debug for Document<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view, f)
    }
}

impl<T> Serialize for Document<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Document<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(de::Error::custom)
    }
}

/// A registered user, as cached by the client.
///
/// `favorite_movies` and `watchlist` hold movie ids. The server keeps them
/// free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub email: String,
    #[serde(alias = "Birthday", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub favorite_movies: Vec<String>,
    pub watchlist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Genre {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Director {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub bio: String,
    pub birth: Option<String>,
    pub death: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Actor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub bio: String,
    pub birth: Option<String>,
}

/// A catalog movie with its genre and director embedded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
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

/// Login credentials. Sent as query parameters, never as a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Request payload for `POST users/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// Request payload for `PUT users/:username`. Omitted fields are left
/// unchanged by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// Body of a successful `POST login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Document<User>,
}

/// Body of a successful `POST users/register`. Some deployments log the new
/// user straight in; others only echo the created record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Session(LoginResponse),
    User(Document<User>),
}

impl RegisterResponse {
    pub fn user(&self) -> &Document<User> {
        match self {
            RegisterResponse::Session(login) => &login.user,
            RegisterResponse::User(user) => user,
        }
    }
}

impl Default for RegisterResponse {
    fn default() -> Self {
        RegisterResponse::User(Document::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: DeserializeOwned>(raw: &str) -> (Document<T>, Value) {
        let doc: Document<T> = serde_json::from_str(raw).unwrap();
        let back = serde_json::to_value(&doc).unwrap();
        (doc, back)
    }

    #[test]
    fn movie_decodes_backend_document() {
        let raw = r#"{
            "_id": "42",
            "Title": "Alien",
            "Description": "In space no one can hear you scream.",
            "Genre": {"Name": "Horror", "Description": "Scary"},
            "Director": {"Name": "Ridley Scott", "Bio": "British director", "Birth": "1937"},
            "Actors": ["Sigourney Weaver"],
            "ImagePath": "alien.png",
            "Featured": true
        }"#;
        let movie: Document<Movie> = serde_json::from_str(raw).unwrap();
        assert_eq!(movie.id, "42");
        assert_eq!(movie.genre.name, "Horror");
        assert_eq!(movie.director.birth.as_deref(), Some("1937"));
        assert!(movie.director.death.is_none());
        assert!(movie.featured);
    }

    #[test]
    fn null_fields_decode_as_defaults() {
        let raw = r#"{"_id":"d1","Name":"Ridley Scott","Bio":null,"Death":null}"#;
        let (director, back) = round_trip::<Director>(raw);
        assert_eq!(director.bio, "");
        assert!(director.death.is_none());
        assert_eq!(back["Bio"], Value::Null);
        assert_eq!(back["Death"], Value::Null);
        assert_eq!(back.as_object().unwrap().len(), 4);
    }

    #[test]
    fn nested_nulls_decode_as_defaults() {
        let (movie, _) = round_trip::<Movie>(r#"{"_id":"1","Genre":{"Name":null},"Actors":[]}"#);
        assert_eq!(movie.genre.name, "");
    }

    #[test]
    fn partial_record_round_trips_exactly() {
        let raw = r#"{"_id":"44","Title":"The Matrix"}"#;
        let doc: Document<Movie> = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.description, "");
        assert!(!doc.featured);
        assert_eq!(serde_json::to_string(&doc).unwrap(), raw);
    }

    #[test]
    fn unknown_fields_survive_a_pass_through() {
        let raw = r#"{"_id":"1","Name":"Drama","Description":"Feelings","__v":0}"#;
        let (genre, back) = round_trip::<Genre>(raw);
        assert_eq!(genre.name, "Drama");
        assert_eq!(back, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn user_keeps_the_servers_birth_field_name() {
        let (a, back) = round_trip::<User>(r#"{"Username":"ana","Birthday":"1990-01-01"}"#);
        let (b, _) = round_trip::<User>(r#"{"Username":"ana","BirthDate":"1990-01-01"}"#);
        assert_eq!(a.birth_date, b.birth_date);
        assert_eq!(back["Birthday"], "1990-01-01");
        assert!(back.get("BirthDate").is_none());
        assert!(a.favorite_movies.is_empty());
    }

    #[test]
    fn non_object_document_is_rejected() {
        let result: Result<Document<Movie>, _> = serde_json::from_str(r#""Alien""#);
        assert!(result.is_err());
    }

    #[test]
    fn new_document_uses_serialized_view() {
        let doc = Document::new(User {
            username: "ana".to_string(),
            ..User::default()
        })
        .unwrap();
        assert_eq!(doc.raw()["Username"], "ana");
        assert_eq!(doc.view().username, "ana");
    }

    #[test]
    fn user_update_omits_unset_fields() {
        let update = UserUpdate {
            email: Some("ana@example.com".to_string()),
            ..UserUpdate::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({"Email": "ana@example.com"}));
    }

    #[test]
    fn register_response_prefers_session_shape() {
        let with_token: RegisterResponse =
            serde_json::from_str(r#"{"token":"abc","user":{"Username":"ana"}}"#).unwrap();
        assert!(matches!(with_token, RegisterResponse::Session(ref l) if l.token == "abc"));

        let bare: RegisterResponse = serde_json::from_str(r#"{"Username":"ana"}"#).unwrap();
        assert!(matches!(bare, RegisterResponse::User(_)));
        assert_eq!(bare.user().username, "ana");
    }
}
