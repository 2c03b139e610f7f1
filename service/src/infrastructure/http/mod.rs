use anyhow::Context;
use axum::Router;
use axum::routing::{get, patch, post, put};
use axum_prometheus::PrometheusMetricLayer;
use tokio::net;

use crate::domain::AppState;
use crate::infrastructure::http::handlers::{account, courses, health_check, payments};

mod api;
mod auth;
mod handlers;
mod querystring;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub port: &'a str,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub async fn new<S: AppState>(state: S, config: HttpServerConfig<'_>) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );
        // see: https://github.com/Ptrskay3/axum-prometheus
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let router = router(state)
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(trace_layer)
            .layer(prometheus_layer);

        let listener = net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("failed to listen on {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Runs the HTTP server.
    pub async fn run(self) -> anyhow::Result<()> {
        if let Ok(address) = self.listener.local_addr() {
            tracing::info!("listening on {}", address);
        }
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

/// Health check plus the `/api` routes, bound to `state`.
pub fn router<S: AppState>(state: S) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/categories", get(courses::list_categories::<S>))
        .route(
            "/courses",
            get(courses::list_courses::<S>).post(courses::create_course::<S>),
        )
        .route(
            "/courses/{course_id}",
            get(courses::get_course::<S>)
                .patch(courses::update_course::<S>)
                .delete(courses::delete_course::<S>),
        )
        .route("/courses/{course_id}/publish", patch(courses::publish_course::<S>))
        .route("/courses/{course_id}/unpublish", patch(courses::unpublish_course::<S>))
        .route("/courses/{course_id}/checkout", post(payments::checkout::<S>))
        .route("/courses/{course_id}/progress", get(courses::course_progress::<S>))
        .route("/courses/{course_id}/attachments", post(courses::add_attachment::<S>))
        .route(
            "/courses/{course_id}/attachments/{attachment_id}",
            axum::routing::delete(courses::delete_attachment::<S>),
        )
        .route("/courses/{course_id}/chapters", post(courses::create_chapter::<S>))
        .route("/courses/{course_id}/chapters/reorder", put(courses::reorder_chapters::<S>))
        .route(
            "/courses/{course_id}/chapters/{chapter_id}",
            get(courses::get_chapter::<S>)
                .patch(courses::update_chapter::<S>)
                .delete(courses::delete_chapter::<S>),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/publish",
            patch(courses::publish_chapter::<S>),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/unpublish",
            patch(courses::unpublish_chapter::<S>),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/progress",
            put(courses::set_chapter_progress::<S>),
        )
        .route("/payment/submit", post(payments::submit_payment::<S>))
        .route("/admin/payments", get(payments::list_pending_payments::<S>))
        .route("/admin/payments/{payment_id}/approve", post(payments::approve_payment::<S>))
        .route("/admin/payments/{payment_id}/reject", post(payments::reject_payment::<S>))
        .route("/admin/overview", get(account::admin_overview::<S>))
        .route("/admin/courses", get(account::list_all_courses::<S>))
        .route("/admin/users", get(account::list_users::<S>))
        .route("/admin/users/{user_id}/ban", patch(account::toggle_ban::<S>))
        .route("/notifications", get(account::list_notifications::<S>))
        .route("/notifications/read", patch(account::mark_all_notifications_read::<S>))
        .route("/notifications/{id}/read", patch(account::mark_notification_read::<S>))
        .route("/dashboard", get(account::dashboard::<S>))
        .route("/teacher/courses", get(courses::list_own_courses::<S>))
        .route("/teacher/analytics", get(account::analytics::<S>))
        .route("/webhooks/binance", post(payments::payment_webhook::<S>))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use coursehub_common::Role;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::ids::{CourseId, UserId};
    use crate::domain::payment_provider::{PaymentSettings, sign};
    use crate::domain::test_utils::MemoryStore;

    const SECRET: &str = "webhook-secret";

    #[derive(Clone, Default)]
    struct TestState {
        store: MemoryStore,
    }

    impl AppState for TestState {
        type C = MemoryStore;
        type E = MemoryStore;
        type P = MemoryStore;
        type N = MemoryStore;
        type U = MemoryStore;

        fn courses(&self) -> &Self::C {
            &self.store
        }

        fn enrollments(&self) -> &Self::E {
            &self.store
        }

        fn progress(&self) -> &Self::P {
            &self.store
        }

        fn notifications(&self) -> &Self::N {
            &self.store
        }

        fn users(&self) -> &Self::U {
            &self.store
        }

        fn payment_settings(&self) -> &PaymentSettings {
            static SETTINGS: std::sync::LazyLock<PaymentSettings> =
                std::sync::LazyLock::new(|| PaymentSettings {
                    currency: "USDT".into(),
                    webhook_secret: Some(SECRET.into()),
                });
            &SETTINGS
        }

        fn identity_header(&self) -> &str {
            "x-user-id"
        }
    }

    async fn send(state: &TestState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    fn json_request(method: &str, uri: &str, user: Option<UserId>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: &str, uri: &str, user: Option<UserId>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submission(course_id: CourseId) -> Value {
        json!({
            "courseId": course_id.to_string(),
            "orderId": "ORDER-42",
            "proofImageUrl": "https://img.example/proof.png"
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let state = TestState::default();
        let response = send(&state, empty_request("GET", "/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn identity_header_is_required() {
        let state = TestState::default();

        let response = send(&state, empty_request("GET", "/api/notifications", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let stranger = UserId::generate();
        let response = send(&state, empty_request("GET", "/api/notifications", Some(stranger))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn banned_users_are_forbidden() {
        let state = TestState::default();
        let user = state.store.add_user(Role::Student);
        state.store.ban(user);

        let response = send(&state, empty_request("GET", "/api/dashboard", Some(user))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["data"]["message"], "Account is banned");
    }

    #[tokio::test]
    async fn admin_ban_toggles_access() {
        let state = TestState::default();
        let admin = state.store.add_user(Role::Admin);
        let student = state.store.add_user(Role::Student);
        let uri = format!("/api/admin/users/{}/ban", student);

        let response = send(&state, empty_request("PATCH", &uri, Some(student))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&state, empty_request("PATCH", &uri, Some(admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["isBanned"], true);
        let response = send(&state, empty_request("GET", "/api/dashboard", Some(student))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        send(&state, empty_request("PATCH", &uri, Some(admin))).await;
        let response = send(&state, empty_request("GET", "/api/dashboard", Some(student))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let unknown = format!("/api/admin/users/{}/ban", UserId::generate());
        let response = send(&state, empty_request("PATCH", &unknown, Some(admin))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submitted_payment_is_approved_by_admin() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let admin = state.store.add_user(Role::Admin);
        let course_id = state.store.add_course(Some(30.0), Some(5));

        let response = send(
            &state,
            json_request("POST", "/api/payment/submit", Some(student), submission(course_id)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));

        let response = send(&state, empty_request("GET", "/api/admin/payments", Some(student))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&state, empty_request("GET", "/api/admin/payments", Some(admin))).await;
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["status"], "PENDING");
        let payment_id = listed[0]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/admin/payments/{}/approve", payment_id);
        let response = send(&state, empty_request("POST", &uri, Some(admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.purchase_count(course_id), 1);

        let response = send(&state, empty_request("POST", &uri, Some(admin))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&state, empty_request("GET", "/api/notifications", Some(student))).await;
        let notifications = body_json(response).await;
        assert_eq!(notifications[0]["title"], "Payment Approved! 🎉");
    }

    #[tokio::test]
    async fn rejection_accepts_empty_body() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let admin = state.store.add_user(Role::Admin);
        let course_id = state.store.add_course(Some(30.0), None);
        send(
            &state,
            json_request("POST", "/api/payment/submit", Some(student), submission(course_id)),
        )
        .await;

        let response = send(&state, empty_request("GET", "/api/admin/payments", Some(admin))).await;
        let payment_id = body_json(response).await[0]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/admin/payments/{}/reject", payment_id);
        let response = send(&state, empty_request("POST", &uri, Some(admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.purchase_count(course_id), 0);
        let pending = state.store.pending(payment_id.parse().unwrap()).unwrap();
        assert_eq!(pending.admin_note.as_deref(), Some("Payment proof was not verified"));
    }

    #[tokio::test]
    async fn full_course_refuses_submission() {
        let state = TestState::default();
        let enrolled = state.store.add_user(Role::Student);
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), Some(1));
        state.store.add_purchase(enrolled, course_id);

        let response = send(
            &state,
            json_request("POST", "/api/payment/submit", Some(student), submission(course_id)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["data"]["message"], "Course is at full capacity");
        assert_eq!(state.store.pending_count(), 0);
    }

    #[tokio::test]
    async fn submission_without_order_id_is_refused() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), None);

        let response = send(
            &state,
            json_request(
                "POST",
                "/api/payment/submit",
                Some(student),
                json!({ "courseId": course_id.to_string() }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["data"]["message"], "Missing required fields");
    }

    #[tokio::test]
    async fn free_checkout_enrolls_immediately() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(None, None);

        let uri = format!("/api/courses/{}/checkout", course_id);
        let response = send(&state, empty_request("POST", &uri, Some(student))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["url"],
            format!("/courses/{}", course_id)
        );
        assert_eq!(state.store.purchase_count(course_id), 1);

        let response = send(&state, empty_request("POST", &uri, Some(student))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn webhook_request(body: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/binance")
            .header("content-type", "application/json")
            .header("BinancePay-Timestamp", "1718000000000")
            .header("BinancePay-Nonce", "nonce")
            .header("BinancePay-Signature", signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_refused() {
        let state = TestState::default();
        let body = json!({ "bizStatus": "PAY_SUCCESS" }).to_string();

        let response = send(&state, webhook_request(&body, "00FF")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["data"]["message"], "Invalid signature");
    }

    #[tokio::test]
    async fn signed_payment_notification_enrolls_buyer() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), None);
        let body = json!({
            "bizType": "PAY",
            "bizStatus": "PAY_SUCCESS",
            "data": json!({ "merchantTradeNo": format!("COURSE_{}_{}_1718000000000", course_id, student) }).to_string()
        })
        .to_string();
        let signature = sign(SECRET, "1718000000000", "nonce", &body);

        for _ in 0..2 {
            let response = send(&state, webhook_request(&body, &signature)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                body_json(response).await,
                json!({ "returnCode": "SUCCESS", "returnMessage": null })
            );
        }
        assert_eq!(state.store.purchase_count(course_id), 1);
    }

    #[tokio::test]
    async fn students_cannot_author_courses() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let instructor = state.store.add_user(Role::Instructor);

        let body = json!({ "title": "Rust for everyone" });
        let response = send(&state, json_request("POST", "/api/courses", Some(student), body.clone())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&state, json_request("POST", "/api/courses", Some(instructor), body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["title"], "Rust for everyone");

        let response = send(
            &state,
            json_request("POST", "/api/courses", Some(instructor), json!({ "title": "  " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn catalogue_filters_by_title() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        state.store.add_course(Some(10.0), None);

        let response = send(&state, empty_request("GET", "/api/courses?title=cour", Some(student))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

        let response = send(&state, empty_request("GET", "/api/courses?title=python", Some(student))).await;
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(0));

        let response = send(&state, empty_request("GET", "/api/courses?title=_", Some(student))).await;
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn purchaser_can_navigate_course_chapters() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), None);
        let intro = state.store.add_chapter(course_id, true);
        let next = state.store.add_chapter(course_id, true);
        state.store.add_chapter(course_id, false);
        state.store.add_purchase(student, course_id);
        state.store.complete_chapter(student, intro);

        let uri = format!("/api/courses/{}", course_id);
        let response = send(&state, empty_request("GET", &uri, Some(student))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let detail = body_json(response).await;
        assert_eq!(detail["purchased"], true);
        assert_eq!(detail["progress"], 50.0);
        assert_eq!(detail["chapters"].as_array().map(Vec::len), Some(2));
        assert_eq!(detail["chapters"][0]["id"], intro.to_string());
        assert_eq!(detail["chapters"][0]["isCompleted"], true);
        assert_eq!(detail["chapters"][1]["isCompleted"], false);

        let chapter = format!("/api/courses/{}/chapters/{}", course_id, intro);
        let response = send(&state, empty_request("GET", &chapter, Some(student))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["nextChapterId"], next.to_string());
    }

    #[tokio::test]
    async fn owner_sees_drafts_and_own_course_list() {
        let state = TestState::default();
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), None);
        state.store.add_course(Some(10.0), None);
        let owner = state.store.course_owner(course_id).unwrap();
        state.store.add_chapter(course_id, true);
        state.store.add_chapter(course_id, false);

        let uri = format!("/api/courses/{}", course_id);
        let response = send(&state, empty_request("GET", &uri, Some(owner))).await;
        assert_eq!(body_json(response).await["chapters"].as_array().map(Vec::len), Some(2));

        let response = send(&state, empty_request("GET", "/api/teacher/courses", Some(owner))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let own = body_json(response).await;
        assert_eq!(own.as_array().map(Vec::len), Some(1));
        assert_eq!(own[0]["id"], course_id.to_string());

        let response = send(&state, empty_request("GET", "/api/teacher/courses", Some(student))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        state.store.set_published(course_id, false);
        let response = send(&state, empty_request("GET", &uri, Some(student))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_lists_users_courses_and_totals() {
        let state = TestState::default();
        let admin = state.store.add_user(Role::Admin);
        let student = state.store.add_user(Role::Student);
        let course_id = state.store.add_course(Some(30.0), None);
        let draft = state.store.add_course(None, None);
        state.store.set_published(draft, false);
        state.store.add_purchase(student, course_id);

        for uri in ["/api/admin/users", "/api/admin/courses", "/api/admin/overview"] {
            let response = send(&state, empty_request("GET", uri, Some(student))).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = send(&state, empty_request("GET", "/api/admin/users", Some(admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let users = body_json(response).await;
        let listed = users.as_array().unwrap();
        assert_eq!(listed.len(), 4);
        assert!(listed
            .iter()
            .any(|user| user["id"] == student.to_string() && user["isBanned"] == false));

        let response = send(&state, empty_request("GET", "/api/admin/courses", Some(admin))).await;
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));

        let response = send(&state, empty_request("GET", "/api/admin/overview", Some(admin))).await;
        let overview = body_json(response).await;
        assert_eq!(overview["totalCourses"], 2);
        assert_eq!(overview["publishedCourses"], 1);
        assert_eq!(overview["totalUsers"], 4);
        assert_eq!(overview["totalPurchases"], 1);
        assert_eq!(overview["pendingPayments"], 0);
    }
}
