//! 题库客户端，使用 mock 后端

use std::time::Duration;

use mockito::{Matcher, Server};
use qpaper_builder::clients::{StatusUpdate, UnitPayload};
use qpaper_builder::error::ApiError;
use qpaper_builder::models::RawImage;
use qpaper_builder::{AppError, QuestionBankApi, QuestionBankClient};

fn client(server: &Server) -> QuestionBankClient {
    QuestionBankClient::with_base_url(&format!("{}/api/", server.url()), Duration::from_secs(5))
        .expect("Failed to build client")
}

fn payload(image: Option<RawImage>) -> UnitPayload {
    UnitPayload {
        subject_code: "CS301".to_string(),
        subject_name: "Operating Systems".to_string(),
        semester: 5,
        question_number: "2a".to_string(),
        question_text: "什么是死锁".to_string(),
        co: "CO1".to_string(),
        level: "L3".to_string(),
        marks: 8,
        faculty_email: "prof@example.edu".to_string(),
        exam_type: "BE_MTECH".to_string(),
        image,
    }
}

#[tokio::test]
async fn test_fetch_subject_codes_accepts_string_semester() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/faculty/subject-codes/prof@example.edu")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"subject_code": "CS301", "subject_name": "Operating Systems", "semester": "5", "status": "Pending"},
                {"subject_code": "CS405", "subject_name": "Compilers", "semester": 7, "status": "Submitted"}
            ]"#,
        )
        .create_async()
        .await;

    let subjects = client(&server)
        .fetch_subject_codes("prof@example.edu")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0].semester, 5);
    assert!(!subjects[0].is_submitted());
    assert!(subjects[1].is_submitted());
}

#[tokio::test]
async fn test_submit_unit_sends_multipart_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/question-bank")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="question_number"\s+2a"#.to_string()),
            Matcher::Regex(r#"name="marks"\s+8"#.to_string()),
            Matcher::Regex(r#"name="exam_type"\s+BE_MTECH"#.to_string()),
            Matcher::Regex(r#"name="image"; filename="deadlock.png""#.to_string()),
        ]))
        .with_status(201)
        .create_async()
        .await;

    let image = RawImage::new(b"fake-png".to_vec(), "deadlock.png", "image/png");
    client(&server)
        .submit_unit(&payload(Some(image)))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_submit_unit_server_error_carries_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/question-bank")
        .with_status(500)
        .with_body("database unavailable")
        .create_async()
        .await;

    let err = client(&server).submit_unit(&payload(None)).await.unwrap_err();
    match err {
        AppError::Api(ApiError::BadResponse {
            endpoint,
            status,
            message,
        }) => {
            assert_eq!(endpoint, "/question-bank");
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("database unavailable"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_assignment_status_posts_json() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/assignments/update-status")
        .match_body(Matcher::Json(serde_json::json!({
            "faculty_email": "prof@example.edu",
            "subject_code": "CS301",
            "status": "Submitted"
        })))
        .with_status(200)
        .create_async()
        .await;

    let update = StatusUpdate {
        faculty_email: "prof@example.edu".to_string(),
        subject_code: "CS301".to_string(),
        status: "Submitted".to_string(),
    };
    client(&server)
        .update_assignment_status(&update)
        .await
        .unwrap();

    mock.assert_async().await;
}
