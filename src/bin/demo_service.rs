//! Demo event service for exercising apicase end to end
//!
//! Serves a small event/guest API from in-memory fixtures. Business outcomes
//! are reported in the body (`status`, `message`); a form submission missing a
//! field is rejected with HTTP 422 and a `detail` list, the way schema
//! validation layers answer.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Parser)]
#[command(name = "demo-service", about = "In-memory event API for contract tests")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind; 0 picks a free port
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[derive(Debug, Clone, Serialize)]
struct Event {
    eid: i64,
    name: String,
    limit: String,
    address: String,
    start_time: String,
}

#[derive(Debug, Clone, Serialize)]
struct Guest {
    eid: i64,
    realname: String,
    phone: String,
    email: String,
}

/// Fixture data plus the snapshot it is reset to
#[derive(Debug, Clone)]
struct Store {
    events: Vec<Event>,
    guests: Vec<Guest>,
    initial: (Vec<Event>, Vec<Guest>),
}

impl Store {
    fn seeded() -> Self {
        let event = |eid, name: &str, limit: &str, address: &str, start_time: &str| Event {
            eid,
            name: name.to_string(),
            limit: limit.to_string(),
            address: address.to_string(),
            start_time: start_time.to_string(),
        };
        let events = vec![
            event(1, "红米", "100", "北京", "2024-01-01 10:00:00"),
            event(3, "华为荣耀8发布会", "2000", "深圳福田会展中心", "2018-12-10 12:00:00"),
            event(11, "红米Pro发布会", "2000", "北京会展中心", "2018-12-10 12:00:00"),
        ];
        let guests = vec![Guest {
            eid: 1,
            realname: "张三".to_string(),
            phone: "13355557777".to_string(),
            email: "a@b.com".to_string(),
        }];

        Self {
            initial: (events.clone(), guests.clone()),
            events,
            guests,
        }
    }

    fn reset(&mut self) {
        self.events = self.initial.0.clone();
        self.guests = self.initial.1.clone();
    }
}

type Shared = Arc<Mutex<Store>>;

fn lock(store: &Shared) -> MutexGuard<'_, Store> {
    // A poisoned store still holds consistent fixture data
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Business response; always HTTP 200
fn business(status: i64, message: &str, data: Option<Value>) -> Response {
    let mut payload = json!({
        "status": status,
        "message": message,
        "status_code": status,
        "msg": message,
    });
    if let Some(data) = data {
        payload["data"] = data;
    }
    (StatusCode::OK, Json(payload)).into_response()
}

/// Validation rejection for a missing form field
fn missing_field(field: &str) -> Response {
    let detail = json!({
        "detail": [{
            "loc": ["body", field],
            "msg": "field required",
            "type": "value_error.missing",
        }]
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(detail)).into_response()
}

fn blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.is_empty())
}

async fn reset(State(store): State<Shared>) -> Response {
    lock(&store).reset();
    tracing::info!("Fixtures reset");
    business(200, "reset success", None)
}

async fn get_event_list(
    State(store): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let eid = query.get("eid");
    let name = query.get("name");
    if blank(eid) && blank(name) {
        return business(10021, "parameter error", None);
    }

    let store = lock(&store);
    let found: Vec<&Event> = match (eid, name) {
        (Some(eid), _) if !eid.is_empty() => store
            .events
            .iter()
            .filter(|e| e.eid.to_string() == *eid)
            .collect(),
        (_, Some(name)) => store.events.iter().filter(|e| e.name == *name).collect(),
        _ => Vec::new(),
    };

    if found.is_empty() {
        business(10022, "query result is empty", None)
    } else {
        business(200, "success", Some(json!(found)))
    }
}

const EVENT_FIELDS: [&str; 5] = ["eid", "name", "limit", "address", "start_time"];

async fn add_event(State(store): State<Shared>, body: Bytes) -> Response {
    let form: HashMap<String, String> = form_urlencoded::parse(&body).into_owned().collect();

    if let Some(field) = EVENT_FIELDS.iter().find(|f| !form.contains_key(**f)) {
        return missing_field(field);
    }
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();
    if EVENT_FIELDS.iter().any(|f| field(*f).is_empty()) {
        return business(10021, "parameter error", None);
    }

    let mut store = lock(&store);
    let eid = field("eid");
    if store.events.iter().any(|e| e.eid.to_string() == eid) {
        return business(10022, "event id already exists", None);
    }
    let name = field("name");
    if store.events.iter().any(|e| e.name == name) {
        return business(10023, "event name already exists", None);
    }
    let start_time = field("start_time");
    if chrono::NaiveDateTime::parse_from_str(start_time, "%Y-%m-%d %H:%M:%S").is_err() {
        return business(
            10024,
            "start_time format error. It must be in YYYY-MM-DD HH:MM:SS format.",
            None,
        );
    }
    let Ok(eid) = eid.trim().parse::<i64>() else {
        return business(10021, "parameter error", None);
    };

    store.events.push(Event {
        eid,
        name: name.to_string(),
        limit: field("limit").to_string(),
        address: field("address").to_string(),
        start_time: start_time.to_string(),
    });
    tracing::info!(eid, "Event added");
    business(200, "add event success", None)
}

async fn get_guest_list(
    State(store): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(eid) = query.get("eid").filter(|e| !e.is_empty()) else {
        return business(10021, "eid cannot be empty", None);
    };
    // An empty phone counts as not given
    let phone = query.get("phone").filter(|p| !p.is_empty());

    let store = lock(&store);
    let found: Vec<&Guest> = store
        .guests
        .iter()
        .filter(|g| g.eid.to_string() == *eid)
        .filter(|g| phone.map_or(true, |p| g.phone == *p))
        .collect();

    if found.is_empty() {
        business(10022, "query result is empty", None)
    } else {
        business(200, "success", Some(json!(found)))
    }
}

fn router(store: Shared) -> Router {
    Router::new()
        .route("/api/test/reset", post(reset))
        .route("/api/get_event_list/", get(get_event_list))
        .route("/api/add_event/", post(add_event))
        .route("/api/get_guest_list/", get(get_guest_list))
        .with_state(store)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("demo_service=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let listener = match tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Error: cannot bind {}:{}: {e}", args.host, args.port);
            std::process::exit(1);
        }
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("demo-service listening at: http://{addr}");

    let app = router(Arc::new(Mutex::new(Store::seeded())));
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
