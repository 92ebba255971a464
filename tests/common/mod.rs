#![allow(dead_code)]

use reqwest::{Client, Response, StatusCode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

use baranki_market::entities::{seed_admin, setup_schema};
use baranki_market::{create_api_router, Config};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "Secret15";
pub const PASSWORD: &str = "Muzion15";

pub struct TestApp {
    pub base: String,
    pub client: Client,
    pub db: Arc<DatabaseConnection>,
}

/// Serves the full router on an ephemeral port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    //one connection, kept open, or the in-memory database is lost
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    seed_admin(&db, ADMIN_USERNAME, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed admin");

    let config = Config {
        database_url: "sqlite::memory:".to_owned(),
        secret: "test-secret".to_owned(),
        bind_addr: "127.0.0.1:0".to_owned(),
        token_ttl_hours: 1,
        admin: None,
    };

    let db = Arc::new(db);
    let app = create_api_router(db.clone(), Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestApp {
        base: format!("http://{}", addr),
        client: Client::new(),
        db,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request")
    }

    /// Registers a user with the given role and returns its id.
    pub async fn register(&self, username: &str, role: &str) -> i32 {
        let response = self
            .client
            .post(self.url("/users/"))
            .json(&json!({
                "username": username,
                "password": PASSWORD,
                "role": role
            }))
            .send()
            .await
            .expect("Failed to send register request");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse register response JSON");
        body["id"].as_i64().expect("User id missing") as i32
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/users/token"))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send login request");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse login response JSON");
        body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_owned()
    }

    /// Registers and logs in; returns (user id, token).
    pub async fn user(&self, username: &str, role: &str) -> (i32, String) {
        let id = self.register(username, role).await;
        let token = self.login(username, PASSWORD).await;
        (id, token)
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn create_category(&self, admin_token: &str, name: &str) -> i32 {
        let response = self
            .client
            .post(self.url("/categories/"))
            .bearer_auth(admin_token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("Failed to send create category request");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse category JSON");
        body["id"].as_i64().expect("Category id missing") as i32
    }

    pub async fn deactivate_category(&self, admin_token: &str, id: i32) {
        let response = self
            .client
            .delete(self.url(&format!("/categories/{}", id)))
            .bearer_auth(admin_token)
            .send()
            .await
            .expect("Failed to send delete category request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    pub async fn post_product(&self, token: &str, payload: &Value) -> Response {
        self.client
            .post(self.url("/products/"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .expect("Failed to send create product request")
    }

    /// Creates a product as `seller_token` and returns its JSON.
    pub async fn create_product(&self, seller_token: &str, category_id: i32, name: &str) -> Value {
        let response = self
            .post_product(seller_token, &product_payload(name, category_id))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        response
            .json::<Value>()
            .await
            .expect("Failed to parse product JSON")
    }

    pub async fn post_review(&self, token: &str, product_id: i64, grade: i64) -> Response {
        self.client
            .post(self.url("/reviews/"))
            .bearer_auth(token)
            .json(&json!({
                "product_id": product_id,
                "comment": "Tasty",
                "grade": grade
            }))
            .send()
            .await
            .expect("Failed to send create review request")
    }

    pub async fn delete_review(&self, token: &str, review_id: i64) -> Response {
        self.client
            .delete(self.url(&format!("/reviews/{}", review_id)))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send delete review request")
    }

    pub async fn product_rating(&self, product_id: i64) -> f64 {
        let response = self.get(&format!("/products/{}", product_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse product JSON");
        body["rating"].as_f64().expect("Rating missing")
    }
}

pub fn product_payload(name: &str, category_id: i32) -> Value {
    json!({
        "name": name,
        "description": "Fresh from the oven",
        "price": 120.5,
        "image_url": null,
        "stock": 10,
        "category_id": category_id
    })
}
