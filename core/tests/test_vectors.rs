//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Results are compared as JSON values, not raw
//! strings, so field ordering does not matter. Parsed records serialize back
//! to exactly the JSON the server sent.

use notflix_core::{
    ApiError, ClientConfig, Credentials, Document, HttpMethod, HttpRequest, HttpResponse, MemorySessionStore,
    NotflixClient, SessionStore, WatchlistPaths,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000";

fn client(paths: WatchlistPaths) -> NotflixClient<MemorySessionStore> {
    let config = ClientConfig::new(BASE_URL).with_watchlist_paths(paths);
    NotflixClient::new(config, MemorySessionStore::new())
}

fn logged_in(paths: WatchlistPaths) -> NotflixClient<MemorySessionStore> {
    let c = client(paths);
    c.session().set("abc", &Document::default()).unwrap();
    c
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_paths(s: &str) -> WatchlistPaths {
    match s {
        "separated" => WatchlistPaths::Separated,
        "legacy" => WatchlistPaths::Legacy,
        other => panic!("unknown watchlist_paths: {other}"),
    }
}

fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");
    if let Some(headers) = expected.get("headers") {
        let expected_headers: Vec<(String, String)> = headers
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
    }
    assert!(req.body.is_none(), "{name}: body should be None");
}

fn assert_outcome(name: &str, case: &Value, result: Result<Value, ApiError>) {
    if let Some(expected_error) = case.get("expected_error") {
        let err = result.unwrap_err();
        match expected_error.as_str().unwrap() {
            "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound, got {err}"),
            "Unauthorized" => {
                assert!(matches!(err, ApiError::Unauthorized { .. }), "{name}: expected Unauthorized")
            }
            "Http" => assert!(matches!(err, ApiError::Http { .. }), "{name}: expected Http, got {err}"),
            other => panic!("{name}: unknown expected_error: {other}"),
        }
    } else {
        assert_eq!(result.unwrap(), case["expected_result"], "{name}: parsed result");
    }
}

fn to_value<T: serde::Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    result.map(|v| serde_json::to_value(v).unwrap())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[test]
fn catalog_test_vectors() {
    let raw = include_str!("../../test-vectors/catalog.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = logged_in(WatchlistPaths::Separated);
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = case["input"].as_str().unwrap_or_default();

        let req = match case["operation"].as_str().unwrap() {
            "list_movies" => c.build_list_movies(),
            "get_movie" => c.build_get_movie(input),
            "list_genres" => c.build_list_genres(),
            "get_genre" => c.build_get_genre(input),
            "list_directors" => c.build_list_directors(),
            "get_director" => c.build_get_director(input),
            "list_actors" => c.build_list_actors(),
            "get_actor" => c.build_get_actor(input),
            other => panic!("{name}: unknown operation {other}"),
        }
        .unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let response = simulated_response(case);
        let result = match case["operation"].as_str().unwrap() {
            "list_movies" => to_value(c.parse_list_movies(response)),
            "get_movie" => to_value(c.parse_get_movie(response)),
            "list_genres" => to_value(c.parse_list_genres(response)),
            "get_genre" => to_value(c.parse_get_genre(response)),
            "list_directors" => to_value(c.parse_list_directors(response)),
            "get_director" => to_value(c.parse_get_director(response)),
            "list_actors" => to_value(c.parse_list_actors(response)),
            "get_actor" => to_value(c.parse_get_actor(response)),
            other => panic!("{name}: unknown operation {other}"),
        };
        assert_outcome(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Favorites & watchlist
// ---------------------------------------------------------------------------

#[test]
fn list_change_test_vectors() {
    let raw = include_str!("../../test-vectors/lists.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = logged_in(parse_paths(case["watchlist_paths"].as_str().unwrap()));

        let req = match case["operation"].as_str().unwrap() {
            "add_favorite" => c.build_add_favorite("ana", "42"),
            "remove_favorite" => c.build_remove_favorite("ana", "42"),
            "add_to_watchlist" => c.build_add_to_watchlist("ana", "42"),
            "remove_from_watchlist" => c.build_remove_from_watchlist("ana", "42"),
            other => panic!("{name}: unknown operation {other}"),
        }
        .unwrap();
        assert_request(name, &req, &case["expected_request"]);
        assert_eq!(req.header("authorization"), Some("Bearer abc"), "{name}: token");

        let result = to_value(c.parse_list_change(simulated_response(case)));
        assert_outcome(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn login_test_vectors() {
    let raw = include_str!("../../test-vectors/login.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(WatchlistPaths::Separated);
        let input: Credentials = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_login(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_login(simulated_response(case));
        if case.get("expected_error").is_some() {
            assert_outcome(name, case, to_value(result));
            assert_eq!(c.session().token().unwrap(), None, "{name}: session must stay empty");
            continue;
        }

        let login = result.unwrap();
        let expected_token = case["expected_token"].as_str().unwrap();
        assert_eq!(login.token, expected_token, "{name}: token");
        assert_eq!(c.session().token().unwrap().as_deref(), Some(expected_token), "{name}: stored token");

        let stored = serde_json::to_value(c.current_user().unwrap().unwrap()).unwrap();
        assert_eq!(stored, case["expected_user"], "{name}: stored user");
    }
}
