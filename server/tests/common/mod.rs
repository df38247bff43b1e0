#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use eventfinder_server::config::Config;
use eventfinder_server::mail::{Email, MailError, Mailer};
use eventfinder_server::models::{Event, Location, NewEvent, NewUser, User, UserRole};
use eventfinder_server::repository::{EventRepository, MemoryStore, UserRepository};
use eventfinder_server::routes::create_routes;
use eventfinder_server::services::{CodeGenerator, NotificationDispatcher};
use eventfinder_server::state::AppState;

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent().into_iter().filter(|e| e.to == address).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_state() -> (AppState, Arc<MemoryStore>, Arc<RecordingMailer>) {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let notifier = NotificationDispatcher::new(mailer.clone(), 1).with_backoff(StdDuration::ZERO);
    let state = AppState::new(
        store.clone(),
        Arc::new(CodeGenerator::secure(16)),
        notifier,
        "GB",
    );
    (state, store, mailer)
}

pub fn test_app() -> TestApp {
    let (state, store, mailer) = test_state();
    let config = Config::from_lookup(|_| None).unwrap();
    TestApp {
        router: create_routes(state.clone(), &config),
        state,
        store,
        mailer,
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn raw_get(&self, uri: &str) -> axum::response::Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    pub async fn create_user(&self, email: &str, role: &str) -> Value {
        let (status, body) = self
            .post(
                "/users",
                json!({"displayName": "Test User", "email": email, "role": role}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    pub async fn create_event(&self, organizer_email: &str, title: &str, capacity: i32) -> Value {
        let (status, body) = self
            .post("/events", event_body(organizer_email, title, capacity, 3))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

pub fn event_body(organizer_email: &str, title: &str, capacity: i32, days_out: i64) -> Value {
    json!({
        "email": organizer_email,
        "title": title,
        "description": "Live on the main stage",
        "tag": "music",
        "date": (Utc::now() + Duration::days(days_out)).to_rfc3339(),
        "time": "19:30",
        "ticketPrice": "25.00",
        "numberOfTickets": capacity,
        "location": {
            "address": "1 High Street",
            "city": "London",
            "pincode": "E1 6AN",
            "country": "GB"
        },
        "duration": 120
    })
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"].as_str().unwrap().parse().unwrap()
}

/// Seeds a user straight into the store.
pub async fn seed_user(store: &MemoryStore, email: &str, role: UserRole) -> User {
    let user = NewUser {
        display_name: "Seeded User".to_string(),
        email: email.to_string(),
        role,
        phone_code: None,
        mobile_number: None,
        picture: None,
        country: Some("GB".to_string()),
    }
    .into_user("GB");
    store.create_user(user).await.unwrap()
}

/// Seeds an event straight into the store, bypassing date validation.
pub async fn seed_event(store: &MemoryStore, organizer: &User, capacity: i32, days_out: i64) -> Event {
    let event = NewEvent {
        email: organizer.email.clone(),
        title: "Seeded Event".to_string(),
        description: "Seeded".to_string(),
        tag: "music".to_string(),
        date: Utc::now() + Duration::days(days_out),
        time: "19:30".to_string(),
        ticket_price: Decimal::from(25),
        number_of_tickets: capacity,
        location: Location {
            address: "1 High Street".to_string(),
            city: "London".to_string(),
            pincode: "E1 6AN".to_string(),
            country: "GB".to_string(),
            latitude: None,
            longitude: None,
        },
        duration: 120,
    }
    .into_event(organizer.id);
    store.create_event(event).await.unwrap()
}
