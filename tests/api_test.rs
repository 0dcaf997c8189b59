use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use recipehub::{app::build_app, state::AppState, storage::MemoryStorage};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "recipehub-test-boundary";

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            router: build_app(AppState::fake_with_storage(storage)),
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(req.body(body).unwrap()).await
    }

    async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(req).await
    }

    async fn register_and_login(&self, name: &str, email: &str) -> (String, String) {
        let (status, _) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "secret1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        (
            data["token"].as_str().unwrap().to_string(),
            data["userId"].as_str().unwrap().to_string(),
        )
    }

    async fn create_soup(&self, token: &str) -> Value {
        let (status, body) = self
            .multipart(Method::POST, "/api/recipes", token, &soup_parts())
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
        }
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn soup_parts() -> Vec<Part<'static>> {
    vec![
        Part::Text("title", "Soup"),
        Part::Text("description", "Hot"),
        Part::Text("ingredients", "Water"),
        Part::Text("steps", "Boil"),
    ]
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let res = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_validation_and_conflict_use_the_envelope() {
    let app = TestApp::new();

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "nope", "password": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["errors"].as_array().unwrap().len(), 3);

    app.register_and_login("Alice", "alice@x.com").await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Alice", "email": "alice@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already in use");
}

#[tokio::test]
async fn bad_login_and_missing_token_are_401() {
    let app = TestApp::new();
    app.register_and_login("Alice", "alice@x.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@x.com", "password": "wrong!!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .json(Method::GET, "/api/users/profile", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(Method::GET, "/api/users/profile", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recipe_review_lifecycle() {
    let app = TestApp::new();
    let (alice, _) = app.register_and_login("Alice", "alice@x.com").await;
    let (bob, _) = app.register_and_login("Bob", "bob@x.com").await;

    let recipe = app.create_soup(&alice).await;
    assert_eq!(recipe["averageRating"], 0.0);
    assert_eq!(recipe["reviewCount"], 0);
    assert_eq!(recipe["userName"], "Alice");
    let recipe_id = recipe["id"].as_str().unwrap();
    let recipe_uri = format!("/api/recipes/{recipe_id}");
    let reviews_uri = format!("{recipe_uri}/reviews");

    let (status, body) = app
        .json(
            Method::POST,
            &reviews_uri,
            Some(&bob),
            Some(json!({ "rating": 4, "comment": "Nice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let review_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.json(Method::GET, &recipe_uri, None, None).await;
    assert_eq!(body["data"]["averageRating"], 4.0);
    assert_eq!(body["data"]["reviewCount"], 1);

    let (status, body) = app
        .json(Method::POST, &reviews_uri, Some(&bob), Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already reviewed this recipe");

    let review_uri = format!("{reviews_uri}/{review_id}");
    let (status, _) = app.json(Method::DELETE, &review_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.json(Method::DELETE, &review_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, &recipe_uri, None, None).await;
    assert_eq!(body["data"]["averageRating"], 0.0);
    assert_eq!(body["data"]["reviewCount"], 0);
}

#[tokio::test]
async fn review_rating_out_of_range_is_rejected() {
    let app = TestApp::new();
    let (alice, _) = app.register_and_login("Alice", "alice@x.com").await;
    let recipe = app.create_soup(&alice).await;
    let uri = format!("/api/recipes/{}/reviews", recipe["id"].as_str().unwrap());

    for body in [
        json!({ "rating": 0 }),
        json!({ "rating": 6 }),
        json!({ "comment": "no rating" }),
    ] {
        let (status, _) = app.json(Method::POST, &uri, Some(&alice), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn recipe_with_json_part_and_image() {
    let storage = Arc::new(MemoryStorage::new());
    let app = TestApp::with_storage(storage.clone());
    let (alice, _) = app.register_and_login("Alice", "alice@x.com").await;

    let recipe_json = json!({
        "title": "Pie", "description": "Sweet", "ingredients": "Apples", "steps": "Bake"
    })
    .to_string();
    let parts = [
        Part::Text("recipe", &recipe_json),
        Part::File {
            name: "image",
            file_name: "pie.png",
            content_type: "image/png",
            data: b"png",
        },
    ];
    let (status, body) = app.multipart(Method::POST, "/api/recipes", &alice, &parts).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["title"], "Pie");
    let image = body["data"]["imageUrl"].as_str().unwrap().to_string();
    assert!(image.ends_with("_pie.png"));
    assert!(storage.contains(&image).await);

    let uri = format!("/api/recipes/{}", body["data"]["id"].as_str().unwrap());
    let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!storage.contains(&image).await);

    let (status, _) = app.json(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recipe_update_checks_owner() {
    let app = TestApp::new();
    let (alice, _) = app.register_and_login("Alice", "alice@x.com").await;
    let (bob, _) = app.register_and_login("Bob", "bob@x.com").await;
    let recipe = app.create_soup(&alice).await;
    let uri = format!("/api/recipes/{}", recipe["id"].as_str().unwrap());

    let mut parts = soup_parts();
    parts[0] = Part::Text("title", "Stolen soup");
    let (status, body) = app.multipart(Method::PUT, &uri, &bob, &parts).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only update your own recipes");

    parts[0] = Part::Text("title", "Better soup");
    let (status, body) = app.multipart(Method::PUT, &uri, &alice, &parts).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Better soup");
}

#[tokio::test]
async fn listing_and_search_pages() {
    let app = TestApp::new();
    let (alice, _) = app.register_and_login("Alice", "alice@x.com").await;
    for _ in 0..3 {
        app.create_soup(&alice).await;
    }

    let (status, body) = app
        .json(Method::GET, "/api/recipes?page=0&size=2&sortBy=title&direction=asc", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["content"].as_array().unwrap().len(), 2);
    assert_eq!(data["totalElements"], 3);
    assert_eq!(data["totalPages"], 2);
    assert_eq!(data["last"], false);

    let (_, body) = app
        .json(Method::GET, "/api/recipes/search?keyword=Wat", None, None)
        .await;
    assert_eq!(body["data"]["totalElements"], 3);

    let (_, body) = app
        .json(Method::GET, "/api/recipes/search?keyword=wat", None, None)
        .await;
    assert_eq!(body["data"]["totalElements"], 0);

    let (status, _) = app
        .json(Method::GET, "/api/recipes?sortBy=password_hash", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_and_password_changes() {
    let app = TestApp::new();
    let (alice, alice_id) = app.register_and_login("Alice", "alice@x.com").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&alice),
            Some(json!({ "name": "Alice L" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice L");

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/users/change-password",
            Some(&alice),
            Some(json!({ "currentPassword": "secret1", "newPassword": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@x.com", "password": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::GET, &format!("/api/users/{alice_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn account_deletion_cascades() {
    let app = TestApp::new();
    let (alice, alice_id) = app.register_and_login("Alice", "alice@x.com").await;
    let (bob, bob_id) = app.register_and_login("Bob", "bob@x.com").await;

    let alice_recipe = app.create_soup(&alice).await;
    let bob_recipe = app.create_soup(&bob).await;
    let alice_uri = format!("/api/recipes/{}", alice_recipe["id"].as_str().unwrap());
    let bob_uri = format!("/api/recipes/{}", bob_recipe["id"].as_str().unwrap());
    app.json(
        Method::POST,
        &format!("{bob_uri}/reviews"),
        Some(&alice),
        Some(json!({ "rating": 2 })),
    )
    .await;

    let (status, _) = app
        .json(Method::DELETE, &format!("/api/users/{alice_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(Method::DELETE, "/api/auth/delete-account", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.json(Method::GET, &alice_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .json(Method::GET, &format!("/api/users/{alice_id}/recipes"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.json(Method::GET, &bob_uri, None, None).await;
    assert_eq!(body["data"]["reviewCount"], 0);

    let (status, body) = app
        .json(Method::GET, &format!("/api/users/{bob_id}/recipes"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn huge_page_index_is_a_validation_error() {
    let app = TestApp::new();
    let (status, body) = app
        .json(
            Method::GET,
            "/api/recipes?page=9223372036854775807&size=10",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["errors"][0]["field"], "page");
}

#[tokio::test]
async fn refresh_issues_a_new_token_pair() {
    let app = TestApp::new();
    app.register_and_login("Alice", "alice@x.com").await;
    let (_, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@x.com", "password": "secret1" })),
        )
        .await;
    let access = body["data"]["token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@x.com");
    let token = body["data"]["token"].as_str().unwrap();
    let (status, _) = app
        .json(Method::GET, "/api/users/profile", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": access })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn own_recipes_and_reviews_listings() {
    let app = TestApp::new();
    let (alice, alice_id) = app.register_and_login("Alice", "alice@x.com").await;
    let (bob, bob_id) = app.register_and_login("Bob", "bob@x.com").await;
    let recipe = app.create_soup(&alice).await;
    let recipe_id = recipe["id"].as_str().unwrap();
    app.json(
        Method::POST,
        &format!("/api/recipes/{recipe_id}/reviews"),
        Some(&bob),
        Some(json!({ "rating": 5 })),
    )
    .await;

    let (status, body) = app
        .json(Method::GET, "/api/users/recipes", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let recipes = body["data"].as_array().unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0]["userId"], alice_id.as_str());
    assert_eq!(recipes[0]["reviewCount"], 1);

    let (status, body) = app
        .json(Method::GET, "/api/users/reviews", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body["data"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["userId"], bob_id.as_str());
    assert_eq!(reviews[0]["recipeId"], recipe_id);

    let (_, body) = app
        .json(Method::GET, "/api/users/reviews", Some(&alice), None)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app.json(Method::GET, "/api/users/recipes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
