use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use blurg_core::models::MAX_ENTRY_BYTES;
use blurg_core::protocol::{ListReply, StatusResponse, LOG_PATH, MAX_REQUEST_BYTES};
use blurg_core::{ClientSettings, DiaryKind, EntryId, EntryStore, ErrorKind, Registry};
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::routes::{app_router, AppState};

const SECRET: &str = "integration-test-secret-key";

/// A diary server on an ephemeral port, running on its own runtime thread so
/// the blocking client can be driven from plain tests.
struct TestServer {
    url: String,
    storage_root: PathBuf,
    _root: TempDir,
}

fn spawn_server() -> TestServer {
    spawn_server_with(|router| router)
}

/// Largest `/log` body let through by [`spawn_server_behind_small_proxy`].
const PROXY_LOG_LIMIT: usize = 1024;

/// A server behind a front end that turns away `/log` bodies over
/// [`PROXY_LOG_LIMIT`], so uploads can fail after `/init` succeeded.
fn spawn_server_behind_small_proxy() -> TestServer {
    spawn_server_with(|router| router.layer(middleware::from_fn(reject_large_logs)))
}

async fn reject_large_logs(request: Request, next: Next) -> Response {
    let too_large = request.uri().path() == LOG_PATH
        && request
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok())
            .is_some_and(|length| length > PROXY_LOG_LIMIT);
    if too_large {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }
    next.run(request).await
}

fn spawn_server_with(wrap: impl FnOnce(Router) -> Router) -> TestServer {
    let root = TempDir::new().unwrap();
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        storage_root: root.path().join("server"),
        secret_key: SECRET.to_string(),
    };
    let storage_root = config.storage_root.clone();
    let router = wrap(app_router(AppState::from_config(Arc::new(config))));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });

    TestServer {
        url: format!("http://{addr}"),
        storage_root,
        _root: root,
    }
}

fn registry(dir: &TempDir, name: &str) -> Registry {
    let mut settings = ClientSettings::with_base_dir(dir.path().join(name));
    settings.http_timeout = Duration::from_secs(5);
    settings.author = "tester".to_string();
    Registry::open(settings).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 4, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn basic(key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{key}:")))
}

fn http() -> reqwest::blocking::Client {
    reqwest::blocking::Client::new()
}

/// Swap a character in the middle of the key's signature.
fn flip_signature_char(key: &str) -> String {
    let (signed, signature) = key.rsplit_once('.').unwrap();
    let mut chars = signature.chars().collect::<Vec<_>>();
    let middle = chars.len() / 2;
    chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
    format!("{signed}.{}", chars.into_iter().collect::<String>())
}

fn server_diary_count(server: &TestServer) -> usize {
    std::fs::read_dir(&server.storage_root).map_or(0, Iterator::count)
}

fn triples(entries: &[blurg_core::Entry]) -> Vec<(String, String, NaiveDateTime)> {
    entries
        .iter()
        .map(|entry| (entry.text.clone(), entry.author.clone(), entry.timestamp))
        .collect()
}

#[test]
fn promote_then_demote_preserves_entries() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");

    let diary = registry.switch("travel").unwrap();
    diary.add("hello", at(1, 9, 15), "u1").unwrap();
    diary.add("world", at(2, 18, 40), "u2").unwrap();
    let original = triples(&diary.list(None).unwrap());

    let key = registry.promote("travel", &server.url, "u1").unwrap();
    assert!(!key.is_empty());
    let promoted = registry.open_diary("travel").unwrap();
    assert_eq!(promoted.kind(), DiaryKind::Remote);
    assert_eq!(triples(&promoted.list(None).unwrap()), original);
    assert_eq!(registry.key("travel").unwrap(), key);

    registry.demote("travel").unwrap();
    let demoted = registry.open_diary("travel").unwrap();
    assert_eq!(demoted.kind(), DiaryKind::Local);
    let entries = demoted.list(None).unwrap();
    assert_eq!(triples(&entries), original);
    assert_eq!(
        entries.iter().map(|entry| entry.id.get()).collect::<Vec<_>>(),
        vec![1, 2]
    );

    // The server copy is gone.
    let response = http()
        .get(format!("{}/list", server.url))
        .header("authorization", basic(&key))
        .send()
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[test]
fn remote_diary_add_list_remove() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");

    registry.create_remote("shared", &server.url, "alice").unwrap();
    let diary = registry.switch("shared").unwrap();
    assert_eq!(diary.kind(), DiaryKind::Remote);

    let (_, first) = registry.log("from the cli", None).unwrap();
    let second = diary.add("by bob", at(3, 7, 0), "bob").unwrap();
    assert_eq!((first.get(), second.get()), (1, 2));

    let entries = diary.list(None).unwrap();
    assert_eq!(entries[0].author, "alice");
    assert_eq!(entries[0].text, "from the cli\n");
    assert_eq!(entries[1].timestamp, at(3, 7, 0));
    assert_eq!(diary.list(Some("bob")).unwrap().len(), 1);

    diary.remove(first).unwrap();
    let ids = diary
        .list(None)
        .unwrap()
        .iter()
        .map(|entry| entry.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![second]);

    let error = diary.remove(EntryId::new(99).unwrap()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn connect_shares_a_diary_between_clients() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let owner = registry(&dir, "owner");
    let guest = registry(&dir, "guest");

    let key = owner.create_remote("family", &server.url, "alice").unwrap();
    owner
        .open_diary("family")
        .unwrap()
        .add("first post", at(5, 10, 0), "alice")
        .unwrap();

    let url_without_scheme = server.url.trim_start_matches("http://");
    let name = guest.connect(url_without_scheme, "bob", &key).unwrap();
    assert_eq!(name, "family");
    let shared = guest.open_diary("family").unwrap();
    assert_eq!(shared.list(None).unwrap()[0].text, "first post\n");

    // Entries logged without an author carry the connecting user's name.
    guest.switch("family").unwrap();
    guest.log("hi from bob", None).unwrap();
    let authors = owner
        .open_diary("family")
        .unwrap()
        .list(None)
        .unwrap()
        .into_iter()
        .map(|entry| entry.author)
        .collect::<Vec<_>>();
    assert_eq!(authors, vec!["alice", "bob"]);

    assert_eq!(
        guest.connect(&server.url, "bob", &key).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
}

#[test]
fn connect_rejects_forged_key() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");

    let error = registry
        .connect(&server.url, "mallory", "not.a.key")
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidKey);
    assert!(!registry.exists("not.a.key"));
}

#[test]
fn init_is_deterministic() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let first = registry(&dir, "first");
    let second = registry(&dir, "second");

    let a = first.create_remote("notes", &server.url, "alice").unwrap();
    let b = second.create_remote("notes", &server.url, "alice").unwrap();
    let c = second.create_remote("other", &server.url, "alice").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn wiping_remote_diary_invalidates_key() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");

    let key = registry.create_remote("scratch", &server.url, "alice").unwrap();
    registry.switch("scratch").unwrap();
    registry.delete("scratch").unwrap();

    assert!(!registry.exists("scratch"));
    assert_eq!(registry.current_name().unwrap(), "default");
    assert!(!server.storage_root.join(&key).exists());
    assert_eq!(
        registry.connect(&server.url, "alice", &key).unwrap_err().kind(),
        ErrorKind::InvalidKey
    );
}

#[test]
fn create_remote_reserved_name_is_rejected() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");
    for name in ["default", "config"] {
        assert_eq!(
            registry
                .create_remote(name, &server.url, "alice")
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidName
        );
    }
}

#[test]
fn feed_includes_remote_entries() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "client");

    registry.create_remote("shared", &server.url, "alice").unwrap();
    registry
        .open_diary("shared")
        .unwrap()
        .add("remote", at(1, 12, 0), "alice")
        .unwrap();
    registry
        .open_diary("default")
        .unwrap()
        .add("local", at(1, 8, 0), "tester")
        .unwrap();

    let feed = registry.feed(10).unwrap();
    let shown = feed
        .iter()
        .map(|entry| (entry.diary_name.as_deref().unwrap(), entry.body()))
        .collect::<Vec<_>>();
    assert_eq!(shown, vec![("default", "local"), ("shared", "remote")]);
}

#[test]
fn protocol_rejects_tampered_keys_and_bad_input() {
    let server = spawn_server();
    let client = http();

    let init: serde_json::Value = client
        .post(format!("{}/init", server.url))
        .form(&[("diaryname", "raw"), ("username", "alice")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    let key = init["key"].as_str().unwrap().to_string();

    assert_eq!(init["created"], true);
    let tampered = flip_signature_char(&key);
    let response = client
        .get(format!("{}/list", server.url))
        .header("authorization", basic(&tampered))
        .send()
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let status: StatusResponse = response.json().unwrap();
    assert_eq!(status.error_type.as_deref(), Some("bad_key"));

    let verify: StatusResponse = client
        .get(format!("{}/verify", server.url))
        .header("authorization", basic(&tampered))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(verify, StatusResponse::failed());

    let reserved = client
        .post(format!("{}/init", server.url))
        .form(&[("diaryname", "config"), ("username", "alice")])
        .send()
        .unwrap();
    assert_eq!(reserved.status().as_u16(), 400);
    let status: StatusResponse = reserved.json().unwrap();
    assert_eq!(status.error_type.as_deref(), Some("bad_name"));

    let missing = client
        .post(format!("{}/init", server.url))
        .form(&[("diaryname", "raw")])
        .send()
        .unwrap();
    assert_eq!(missing.status().as_u16(), 400);

    let bad_date = client
        .post(format!("{}/log", server.url))
        .header("authorization", basic(&key))
        .form(&[("text", "x"), ("username", "alice"), ("date", "2021-04-01")])
        .send()
        .unwrap();
    assert_eq!(bad_date.status().as_u16(), 400);

    let logged: StatusResponse = client
        .post(format!("{}/log", server.url))
        .header("authorization", basic(&key))
        .form(&[("text", "undated"), ("username", "alice")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(logged.is_ok());
    assert_eq!(logged.id, Some(1));

    let listed: ListReply = client
        .get(format!("{}/list", server.url))
        .header("authorization", basic(&key))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(matches!(listed, ListReply::Entries { ref result } if result.len() == 1));

    let removed: StatusResponse = client
        .delete(format!("{}/rm/7", server.url))
        .header("authorization", basic(&key))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(removed.error_type.as_deref(), Some("bad_id"));
}

#[test]
fn healthz_reports_ok() {
    let server = spawn_server();
    let body: serde_json::Value = http()
        .get(format!("{}/healthz", server.url))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[test]
fn promote_onto_an_existing_server_diary_is_refused() {
    let server = spawn_server();
    let dir = TempDir::new().unwrap();
    let owner = registry(&dir, "owner");
    let other = registry(&dir, "other");

    owner.create_remote("notes", &server.url, "alice").unwrap();
    owner
        .open_diary("notes")
        .unwrap()
        .add("precious", at(1, 8, 0), "alice")
        .unwrap();

    let local = other.switch("notes").unwrap();
    local.add("mine", at(2, 9, 0), "alice").unwrap();
    let before = local.list(None).unwrap();

    let error = other.promote("notes", &server.url, "alice").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);

    let restored = other.open_diary("notes").unwrap();
    assert_eq!(restored.kind(), DiaryKind::Local);
    assert_eq!(restored.list(None).unwrap(), before);

    let shared = owner.open_diary("notes").unwrap().list(None).unwrap();
    assert_eq!(triples(&shared), vec![("precious\n".to_string(), "alice".to_string(), at(1, 8, 0))]);
    assert_eq!(server_diary_count(&server), 1);
}

#[test]
fn failed_upload_wipes_only_the_new_diary_and_restores_ids() {
    let server = spawn_server_behind_small_proxy();
    let dir = TempDir::new().unwrap();
    let owner = registry(&dir, "owner");
    let other = registry(&dir, "other");

    owner.create_remote("notes", &server.url, "alice").unwrap();
    owner
        .open_diary("notes")
        .unwrap()
        .add("precious", at(1, 8, 0), "alice")
        .unwrap();
    assert_eq!(server_diary_count(&server), 1);

    let local = other.switch("trip").unwrap();
    local.add("small", at(1, 9, 0), "bob").unwrap();
    local.add("dropped", at(1, 10, 0), "bob").unwrap();
    local
        .add(&"y".repeat(PROXY_LOG_LIMIT * 2), at(2, 11, 0), "bob")
        .unwrap();
    local.remove(EntryId::new(2).unwrap()).unwrap();
    let before = local.list(None).unwrap();

    let error = other.promote("trip", &server.url, "bob").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Remote);

    let restored = other.open_diary("trip").unwrap();
    assert_eq!(restored.kind(), DiaryKind::Local);
    assert!(!restored.path().join("remote").exists());
    let entries = restored.list(None).unwrap();
    assert_eq!(entries, before);
    assert_eq!(
        entries.iter().map(|entry| entry.id.get()).collect::<Vec<_>>(),
        vec![1, 3]
    );

    // The half-uploaded diary is gone; the shared one is untouched.
    assert_eq!(server_diary_count(&server), 1);
    let shared = owner.open_diary("notes").unwrap().list(None).unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].body(), "precious");
}

#[test]
fn log_rejects_oversized_entries() {
    let server = spawn_server();
    let client = http();
    let init: serde_json::Value = client
        .post(format!("{}/init", server.url))
        .form(&[("diaryname", "big"), ("username", "alice")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    let key = init["key"].as_str().unwrap().to_string();

    let at_limit = "z".repeat(MAX_ENTRY_BYTES);
    let accepted = client
        .post(format!("{}/log", server.url))
        .header("authorization", basic(&key))
        .form(&[("text", at_limit.as_str()), ("username", "alice")])
        .send()
        .unwrap();
    assert_eq!(accepted.status().as_u16(), 200);

    let over_limit = "z".repeat(MAX_ENTRY_BYTES + 1);
    let rejected = client
        .post(format!("{}/log", server.url))
        .header("authorization", basic(&key))
        .form(&[("text", over_limit.as_str()), ("username", "alice")])
        .send()
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 400);

    let over_request = "z".repeat(MAX_REQUEST_BYTES + 1);
    let refused = client
        .post(format!("{}/log", server.url))
        .header("authorization", basic(&key))
        .form(&[("text", over_request.as_str()), ("username", "alice")])
        .send()
        .unwrap();
    assert!(refused.status().is_client_error());

    let listed: ListReply = client
        .get(format!("{}/list", server.url))
        .header("authorization", basic(&key))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(matches!(listed, ListReply::Entries { ref result } if result.len() == 1));
}
