//! End-to-end tests of the catalog API through the full router
//!
//! Tokens are signed with the fixture key from `casting-auth`'s `test-utils`
//! feature and verified against an in-memory key set.

use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Method, Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use casting_auth::test_utils::{StaticKeySet, TokenFactory, test_config, trusted_key_set, valid_claims};
use casting_auth::{AuthorizationGate, TokenVerifier};
use casting_server::{AppState, MemoryStore, build_app};

const ALL_PERMISSIONS: &[&str] = &[
    "get:actors",
    "post:actors",
    "patch:actors",
    "delete:actors",
    "get:movies",
    "post:movies",
    "patch:movies",
    "delete:movies",
];

struct TestApp {
    router: Router,
    keys: Arc<StaticKeySet>,
}

impl TestApp {
    fn new() -> Self {
        let keys = Arc::new(StaticKeySet::new(trusted_key_set()));
        let gate = AuthorizationGate::new(TokenVerifier::new(test_config(), keys.clone()));
        let router = build_app(AppState::new(Arc::new(MemoryStore::new())), &gate);
        Self { router, keys }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        permissions: Option<&[&str]>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(permissions) = permissions {
            builder = builder.header(
                header::AUTHORIZATION,
                TokenFactory::trusted().bearer(&valid_claims(permissions)),
            );
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(ALL_PERMISSIONS), body).await
    }
}

fn error_body(status: u16, message: &str) -> Value {
    json!({"success": false, "error": status, "message": message})
}

#[tokio::test]
async fn test_actor_lifecycle() {
    let app = TestApp::new();

    let (status, body) = app.admin(Method::GET, "/actors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, error_body(404, "resource not found"));

    let (status, body) = app
        .admin(
            Method::POST,
            "/actors",
            Some(json!({"name": "Jane Doe", "birth_date": "November 19, 1992", "gender": "f"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "actor": {
            "actor_id": 1, "name": "Jane Doe", "birth_date": "1992-11-19", "gender": "F"
        }})
    );

    let (status, body) = app
        .admin(Method::PATCH, "/actors/1", Some(json!({"birth_date": "1992-11-20"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actor"]["birth_date"], "1992-11-20");
    assert_eq!(body["actor"]["name"], "Jane Doe");

    let (status, body) = app.admin(Method::GET, "/actors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actors"].as_array().unwrap().len(), 1);

    let (status, body) = app.admin(Method::DELETE, "/actors/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "delete": 1}));

    let (status, _) = app.admin(Method::DELETE, "/actors/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_lifecycle() {
    let app = TestApp::new();

    let (status, body) = app
        .admin(
            Method::POST,
            "/movies",
            Some(json!({"title": "Heat", "release_date": "December 15, 1995"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "movie": {"movie_id": 1, "title": "Heat", "release_date": "1995-12-15"}})
    );

    let (status, body) = app
        .admin(Method::PATCH, "/movies/1", Some(json!({"title": "Heat (1995)"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movie"]["title"], "Heat (1995)");
    assert_eq!(body["movie"]["release_date"], "1995-12-15");

    let (status, body) = app.admin(Method::GET, "/movies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movies"][0]["movie_id"], 1);

    let (status, body) = app.admin(Method::DELETE, "/movies/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "delete": 1}));
}

#[tokio::test]
async fn test_validation_failures_are_unprocessable() {
    let app = TestApp::new();
    let unprocessable = error_body(422, "unprocessable");

    for body in [
        json!({"name": "Jane", "birth_date": "1992-11-19"}),
        json!({"name": "Jane", "birth_date": "not a date", "gender": "F"}),
        json!({"name": "Jane", "birth_date": "1992-11-19", "gender": "female"}),
        json!({"name": 7, "birth_date": "1992-11-19", "gender": "F"}),
    ] {
        let (status, response) = app.admin(Method::POST, "/actors", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response, unprocessable);
    }

    let (status, _) = app
        .admin(Method::POST, "/movies", Some(json!({"title": "Heat"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_duplicate_names_ignore_case() {
    let app = TestApp::new();
    let actor = json!({"name": "Jane Doe", "birth_date": "1992-11-19", "gender": "F"});
    assert_eq!(app.admin(Method::POST, "/actors", Some(actor)).await.0, StatusCode::OK);

    let shouting = json!({"name": "JANE DOE", "birth_date": "1990-01-01", "gender": "X"});
    let (status, _) = app.admin(Method::POST, "/actors", Some(shouting)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let movie = json!({"title": "Heat", "release_date": "1995-12-15"});
    assert_eq!(app.admin(Method::POST, "/movies", Some(movie)).await.0, StatusCode::OK);
    let (status, _) = app
        .admin(Method::POST, "/movies", Some(json!({"title": "heat", "release_date": "2000-01-01"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_ids_and_routes_are_not_found() {
    let app = TestApp::new();
    let not_found = error_body(404, "resource not found");

    let (status, body) = app
        .admin(Method::PATCH, "/actors/42", Some(json!({"name": "Nobody"})))
        .await;
    assert_eq!((status, body), (StatusCode::NOT_FOUND, not_found.clone()));

    let (status, _) = app.admin(Method::PATCH, "/movies/42", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.admin(Method::DELETE, "/movies/not-a-number", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.admin(Method::GET, "/directors", None).await;
    assert_eq!((status, body), (StatusCode::NOT_FOUND, not_found));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/movies")
        .header(
            header::AUTHORIZATION,
            TokenFactory::trusted().bearer(&valid_claims(&["post:movies"])),
        )
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let (status, body) = app.dispatch(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error_body(400, "bad request"));
}

#[tokio::test]
async fn test_each_route_enforces_its_own_permission() {
    let app = TestApp::new();
    let unauthorized = error_body(401, "unauthorized");
    let routes = [
        (Method::GET, "/actors", "get:actors"),
        (Method::POST, "/actors", "post:actors"),
        (Method::PATCH, "/actors/1", "patch:actors"),
        (Method::DELETE, "/actors/1", "delete:actors"),
        (Method::GET, "/movies", "get:movies"),
        (Method::POST, "/movies", "post:movies"),
        (Method::PATCH, "/movies/1", "patch:movies"),
        (Method::DELETE, "/movies/1", "delete:movies"),
    ];

    for (method, uri, permission) in routes {
        let others: Vec<&str> = ALL_PERMISSIONS
            .iter()
            .copied()
            .filter(|p| *p != permission)
            .collect();
        let (status, body) = app.send(method.clone(), uri, Some(others.as_slice()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body, unauthorized);

        // With the permission the request gets past the gate.
        let (status, _) = app.send(method.clone(), uri, Some(&[permission][..]), None).await;
        assert_ne!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_rejections_are_uniform_and_run_before_body_parsing() {
    let app = TestApp::new();
    let unauthorized = error_body(401, "unauthorized");

    let (status, body) = app
        .send(Method::POST, "/actors", None, Some(json!({"name": 7})))
        .await;
    assert_eq!((status, body), (StatusCode::UNAUTHORIZED, unauthorized.clone()));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/movies")
        .header(header::AUTHORIZATION, "Basic abc123")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.dispatch(request).await;
    assert_eq!((status, body), (StatusCode::UNAUTHORIZED, unauthorized.clone()));

    let mut expired = valid_claims(&["get:movies"]);
    expired["exp"] = json!(1);
    let request = Request::builder()
        .uri("/movies")
        .header(header::AUTHORIZATION, TokenFactory::trusted().bearer(&expired))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.dispatch(request).await;
    assert_eq!((status, body), (StatusCode::UNAUTHORIZED, unauthorized.clone()));

    let request = Request::builder()
        .uri("/movies")
        .header(
            header::AUTHORIZATION,
            TokenFactory::rogue().bearer(&valid_claims(&["get:movies"])),
        )
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.dispatch(request).await;
    assert_eq!((status, body), (StatusCode::UNAUTHORIZED, unauthorized));
}

#[tokio::test]
async fn test_malformed_headers_never_fetch_keys() {
    let app = TestApp::new();

    app.send(Method::GET, "/actors", None, None).await;
    let request = Request::builder()
        .uri("/actors")
        .header(header::AUTHORIZATION, "Bearer")
        .body(Body::empty())
        .unwrap();
    app.dispatch(request).await;

    assert_eq!(app.keys.fetch_count(), 0);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/actors")
        .header(header::ORIGIN, "https://casting.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
