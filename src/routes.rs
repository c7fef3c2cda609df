use crate::config::AppConfig;
use crate::db::product_repository::ProductRepository;
use crate::db::user_repository::UserRepository;
use crate::db::Database;
use crate::errors::AppError;
use crate::handlers;
use crate::middleware::api_key::ApiKeyMiddleware;
use crate::middleware::auth::AuthMiddleware;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::utils::auth::TokenService;
use actix_web::web;
use std::sync::Arc;
use tracing::debug;

/// Everything the routes share. Built once, cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub users: UserRepository,
    pub products: ProductRepository,
    auth_limiter: RateLimitMiddleware,
}

impl AppState {
    pub fn new(config: AppConfig, database: Database) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
        let auth_limiter = RateLimitMiddleware::new(config.auth_rate_limit_per_minute);
        AppState {
            tokens: Arc::new(tokens),
            users: UserRepository::new(database.clone()),
            products: ProductRepository::new(database),
            auth_limiter,
            config: Arc::new(config),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let api_key = state.config.api_key.as_str();

    cfg.app_data(web::Data::from(state.config.clone()))
        .app_data(web::Data::from(state.tokens.clone()))
        .app_data(web::Data::new(state.users.clone()))
        .app_data(web::Data::new(state.products.clone()))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            debug!(error = %err, "Rejected malformed JSON body");
            AppError::BadRequest("Invalid request body".to_string()).into()
        }))
        // Public
        .route("/api/health", web::get().to(handlers::health::health))
        // Account routes: API key only, rate limited per IP
        .service(
            web::resource("/api/signup")
                .wrap(ApiKeyMiddleware::new(api_key))
                .wrap(state.auth_limiter.clone())
                .route(web::post().to(handlers::auth::signup)),
        )
        .service(
            web::resource("/api/login")
                .wrap(ApiKeyMiddleware::new(api_key))
                .wrap(state.auth_limiter.clone())
                .route(web::post().to(handlers::auth::login)),
        )
        // Catalogue: API key checked before the bearer token (last wrap runs first)
        .service(
            web::scope("/api/product")
                .wrap(AuthMiddleware::new(state.tokens.clone()))
                .wrap(ApiKeyMiddleware::new(api_key))
                .route("", web::get().to(handlers::product::list_products))
                .route("/{id}", web::get().to(handlers::product::get_product)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::api_key::API_KEY_HEADER;
    use crate::models::product::NewProduct;
    use crate::models::user::User;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    const API_KEY: &str = "test-api-key";

    fn state() -> AppState {
        AppState::new(AppConfig::for_tests(), Database::temporary().unwrap())
    }

    fn jollof() -> NewProduct {
        NewProduct {
            name: "Jellof rice".to_string(),
            image: "/uploads/jellof.png".to_string(),
            price: 2000.0,
            count_in_stock: 2,
            description: "Jellof rice as you like it".to_string(),
            active: true,
        }
    }

    async fn token_for(state: &AppState) -> String {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Zell".to_string(),
            email: format!("{}@gmail.com", uuid::Uuid::new_v4()),
            phone: None,
            password_hash: String::new(),
            created_at: chrono::Utc::now(),
        };
        let (user, _) = state.users.create(user).await.unwrap();
        state.tokens.issue(&user).unwrap()
    }

    fn list_request(uri: &str, token: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .insert_header((API_KEY_HEADER, API_KEY))
            .insert_header(("Accept", "application/json"))
            .insert_header(("Authorization", format!("Bearer {}", token)))
    }

    fn signup_body() -> Value {
        json!({
            "name": "Zell",
            "email": "test@gmail.com",
            "password": "Password2@",
            "phone": "09036040503"
        })
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_unauthorized() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::get().uri("/api/product").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_wrong_api_key_is_unauthorized() {
        let state = state();
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = list_request("/api/product", &token)
            .insert_header((API_KEY_HEADER, "not-the-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_missing_token_is_bad_request() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::get()
            .uri("/api/product")
            .insert_header((API_KEY_HEADER, API_KEY))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/product")
            .insert_header((API_KEY_HEADER, API_KEY))
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_bearer_scheme_is_case_insensitive() {
        let state = state();
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = list_request("/api/product", &token)
            .insert_header(("Authorization", format!("bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_tampered_token_is_unauthorized_with_message() {
        let state = state();
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = list_request("/api/product", &format!("{}3", token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"]["message"].is_string());
    }

    #[actix_web::test]
    async fn test_signup_token_lists_products() {
        let state = state();
        state.products.create(jollof()).await.unwrap();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/signup")
            .insert_header((API_KEY_HEADER, API_KEY))
            .set_json(signup_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["user"]["email"], "test@gmail.com");
        assert!(body["data"]["user"].get("password_hash").is_none());

        let resp = test::call_service(&app, list_request("/api/product", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Jellof rice");
        assert_eq!(data[0]["countInStock"], 2);
        assert!(body.get("pagination").is_none());
    }

    #[actix_web::test]
    async fn test_signup_requires_api_key() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/signup")
            .set_json(signup_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_duplicate_signup_conflicts_and_login_works() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = test::TestRequest::post()
                .uri("/api/signup")
                .insert_header((API_KEY_HEADER, API_KEY))
                .set_json(signup_body())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
        }

        let req = test::TestRequest::post()
            .uri("/api/login")
            .insert_header((API_KEY_HEADER, API_KEY))
            .set_json(json!({ "email": "test@gmail.com", "password": "Password2@" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let token = body["data"]["token"].as_str().unwrap();
        assert!(state.tokens.verify(token).is_ok());

        let req = test::TestRequest::post()
            .uri("/api/login")
            .insert_header((API_KEY_HEADER, API_KEY))
            .set_json(json!({ "email": "test@gmail.com", "password": "Wrong-pass1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_signup_rejects_short_password() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/signup")
            .insert_header((API_KEY_HEADER, API_KEY))
            .set_json(json!({ "name": "Zell", "email": "test@gmail.com", "password": "short" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_account_routes_are_rate_limited() {
        let mut config = AppConfig::for_tests();
        config.auth_rate_limit_per_minute = 2;
        let state = AppState::new(config, Database::temporary().unwrap());
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/api/login")
                .insert_header((API_KEY_HEADER, API_KEY))
                .set_json(json!({ "email": "nobody@gmail.com", "password": "Password2@" }))
                .to_request();
            statuses.push(test::call_service(&app, req).await.status());
        }
        assert_eq!(
            statuses,
            vec![
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }

    /// Each case: (query, expect at least one product).
    #[actix_web::test]
    async fn test_query_parameters_filter_the_listing() {
        let state = state();
        state.products.create(jollof()).await.unwrap();
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let cases = [
            ("search=likz", false),
            ("search=like", true),
            ("search=JELLOF", true),
            ("price=1-1000", false),
            ("price=1000-2000", true),
            ("price=not-a-range", true),
            ("active=false", false),
            ("active=true", true),
            ("colour=red", true),
            ("search=rice&price=1-1000", false),
        ];

        for (query, expect_found) in cases {
            let uri = format!("/api/product?{}", query);
            let resp = test::call_service(&app, list_request(&uri, &token).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{query}");

            let body: Value = test::read_body_json(resp).await;
            let data = body["data"].as_array().expect("data is a list");
            assert_eq!(!data.is_empty(), expect_found, "{query}");
        }
    }

    #[actix_web::test]
    async fn test_pagination_is_reported() {
        let state = state();
        for i in 0..3 {
            let mut product = jollof();
            product.name = format!("Jellof rice {}", i);
            state.products.create(product).await.unwrap();
        }
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let resp = test::call_service(
            &app,
            list_request("/api/product?page=2&limit=2", &token).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"], json!({ "page": 2, "limit": 2, "offset": 2 }));
    }

    #[actix_web::test]
    async fn test_get_product_by_id() {
        let state = state();
        let product = state.products.create(jollof()).await.unwrap();
        let token = token_for(&state).await;
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let uri = format!("/api/product/{}", product.id);
        let resp = test::call_service(&app, list_request(&uri, &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["id"], product.id.as_str());

        let resp = test::call_service(
            &app,
            list_request("/api/product/missing", &token).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health_reports_configured_secret() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["database"], true);
    }

    #[actix_web::test]
    async fn test_malformed_json_body_uses_error_envelope() {
        let state = state();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/signup")
            .insert_header((API_KEY_HEADER, API_KEY))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(r#"{"email": 5"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Invalid request body");
    }

    #[actix_web::test]
    async fn test_storage_failure_is_generic_server_error() {
        let database = Database::temporary().unwrap();
        let state = AppState::new(AppConfig::for_tests(), database.clone());
        let token = token_for(&state).await;
        database
            .tree("products")
            .unwrap()
            .insert(b"bad", vec![0xff, 0xff, 0xff])
            .unwrap();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

        let resp = test::call_service(&app, list_request("/api/product", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Internal server error");
    }
}
