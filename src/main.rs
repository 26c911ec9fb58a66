#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use crate::{
    config::RuntimeConfiguration,
    routes::{
        all_students::{
            delete_student, get_add_student_form, get_students, internal_get_students,
            put_new_student,
        },
        import_export::{get_export, post_backup, put_confirm_import, put_import_students},
        index::get_index_route,
        payments::{internal_delete_payment, internal_put_payment},
        sse::sse_feed,
        student_in_detail::{
            get_student, internal_get_edit_student_form, internal_get_student_in_detail,
            internal_post_edit_student,
        },
    },
    state::FeebookState,
    storage::{DirectoryBlobStore, Repository},
};
use axum::{
    Router,
    routing::{get, post, put},
};
use dotenvy::var;
use tokio::{net::TcpListener, signal};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod config;
mod data;
mod error;
mod exchange;
mod ledger;
mod maud_conveniences;
mod routes;
mod state;
mod storage;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
}

fn build_router(state: FeebookState) -> Router {
    Router::new()
        .route("/", get(get_index_route))
        .route(
            "/students",
            get(get_students)
                .put(put_new_student)
                .delete(delete_student),
        )
        .route("/students/new", get(get_add_student_form))
        .route("/student/{id}", get(get_student))
        .route("/internal/get_students", get(internal_get_students))
        .route("/internal/get_student", get(internal_get_student_in_detail))
        .route(
            "/internal/students/edit_form",
            get(internal_get_edit_student_form),
        )
        .route("/internal/students/edit", post(internal_post_edit_student))
        .route(
            "/internal/payments",
            put(internal_put_payment).delete(internal_delete_payment),
        )
        .route("/import_export/export", get(get_export))
        .route("/import_export/import_students", put(put_import_students))
        .route("/import_export/confirm_import", put(put_confirm_import))
        .route("/import_export/backup", post(post_backup))
        .route("/sse_feed", get(sse_feed))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");
    if let Err(e) = dotenv {
        warn!(?e, "No .env file loaded, using the process environment");
    }

    let config = RuntimeConfiguration::new().expect("unable to create config");
    let store = DirectoryBlobStore::new(config.data_dir().clone())
        .await
        .expect("unable to open data directory");
    info!(data_dir = ?store.root(), "Opened data directory");

    let state = FeebookState::new(Repository::new(store), config);
    let app = build_router(state);

    let server_ip = var("FEEBOOK_SERVER_IP").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = TcpListener::bind(&server_ip)
        .await
        .expect("unable to listen on server ip");

    info!(?server_ip, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("unable to serve app");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    const NEW_STUDENT: &str = "name=Asha+Rao&email=asha%40example.org&phone=9876543210&joining=2024-01-01&semester=6&fees=6000";

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn form(method: &str, uri: &str, body: impl Into<String>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.into()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn add_student(app: &Router) -> Uuid {
        let response = send(app, form("PUT", "/students", NEW_STUDENT)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let location = response.headers()["HX-Redirect"].to_str().unwrap();
        location.trim_start_matches("/student/").parse().unwrap()
    }

    #[tokio::test]
    async fn dashboard_renders() {
        let app = build_router(FeebookState::test_state());
        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Dashboard"));
    }

    #[tokio::test]
    async fn new_student_redirects_to_their_page() {
        let state = FeebookState::test_state();
        let app = build_router(state.clone());
        let id = add_student(&app).await;

        let response = send(&app, get(&format!("/student/{id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Asha Rao"));
        assert!(page.contains("Monthly Fee Breakdown"));

        assert_eq!(state.students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_student_form_is_shown_again() {
        let app = build_router(FeebookState::test_state());
        let response = send(
            &app,
            form("PUT", "/students", NEW_STUDENT.replace("semester=6", "semester=0")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("HX-Redirect"));
        let page = body_text(response).await;
        assert!(page.contains("Semester must be a positive number of months"));
        assert!(page.contains("asha@example.org"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = build_router(FeebookState::test_state());
        add_student(&app).await;

        let response = send(
            &app,
            form("PUT", "/students", NEW_STUDENT.replace("asha%40", "ASHA%40")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn missing_student_is_not_found() {
        let app = build_router(FeebookState::test_state());
        let response = send(&app, get(&format!("/student/{}", Uuid::new_v4()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payments_are_recorded_and_capped() {
        let state = FeebookState::test_state();
        let app = build_router(state.clone());
        let id = add_student(&app).await;

        let response = send(
            &app,
            form(
                "PUT",
                "/internal/payments",
                format!("student_id={id}&amount=1500&date=2024-02-10"),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            form(
                "PUT",
                "/internal/payments",
                format!("student_id={id}&amount=4500.01&date="),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            form("PUT", "/internal/payments", format!("student_id={id}&amount=lots")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let students = state.students().await.unwrap();
        let student = students.get(id).unwrap();
        assert_eq!(student.fee_history().len(), 1);
        approx::assert_relative_eq!(student.paid_fees(), 1500.0);
    }

    #[tokio::test]
    async fn deleting_a_student_redirects_to_the_list() {
        let state = FeebookState::test_state();
        let app = build_router(state.clone());
        let id = add_student(&app).await;

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/students?id={id}"))
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.headers()["HX-Redirect"], "/students");
        assert!(state.students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn editing_keeps_payments() {
        let state = FeebookState::test_state();
        let app = build_router(state.clone());
        let id = add_student(&app).await;
        send(
            &app,
            form(
                "PUT",
                "/internal/payments",
                format!("student_id={id}&amount=1000"),
            ),
        )
        .await;

        let response = send(
            &app,
            form(
                "POST",
                "/internal/students/edit",
                format!("id={id}&{}", NEW_STUDENT.replace("Asha+Rao", "Asha+R")),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let students = state.students().await.unwrap();
        let student = students.get(id).unwrap();
        assert_eq!(student.details.name, "Asha R");
        approx::assert_relative_eq!(student.paid_fees(), 1000.0);
    }

    #[tokio::test]
    async fn empty_export_is_rejected() {
        let app = build_router(FeebookState::test_state());
        let response = send(&app, get("/import_export/export")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_then_import_into_a_fresh_tracker() {
        let source = build_router(FeebookState::test_state());
        let id = add_student(&source).await;
        send(
            &source,
            form(
                "PUT",
                "/internal/payments",
                format!("student_id={id}&amount=2000&date=2024-01-15"),
            ),
        )
        .await;

        let response = send(&source, get("/import_export/export")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        let zip = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let boundary = "feebookboundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"import_file\"; filename=\"export.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&zip);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let target_state = FeebookState::test_state();
        let target = build_router(target_state.clone());
        let request = Request::builder()
            .method("PUT")
            .uri("/import_export/import_students")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let preview = body_text(send(&target, request).await).await;
        assert!(preview.contains("Successfully read 1 student(s)."));
        assert!(target_state.students().await.unwrap().is_empty());

        let draft = preview
            .split("name=\"b64students\" value=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        let response = send(
            &target,
            form(
                "PUT",
                "/import_export/confirm_import",
                format!("b64students={draft}"),
            ),
        )
        .await;
        assert!(body_text(response).await.contains("1 student(s) imported"));

        let students = target_state.students().await.unwrap();
        let student = students.get(id).unwrap();
        approx::assert_relative_eq!(student.paid_fees(), 2000.0);

        let response = send(
            &target,
            form(
                "PUT",
                "/import_export/confirm_import",
                format!("b64students={draft}"),
            ),
        )
        .await;
        assert!(body_text(response).await.contains("All students already exist"));
    }

    #[tokio::test]
    async fn backup_is_recorded() {
        let state = FeebookState::test_state();
        let app = build_router(state.clone());
        add_student(&app).await;

        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/import_export/backup")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("backups/feebook_backup_"));
        assert!(state.repository().last_backup().await.unwrap().is_some());
    }
}
