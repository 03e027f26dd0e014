use crate::application::use_cases::conversion_session::{ConversionSession, ConversionSummary};
use crate::domain::csv::{
    BlockingError, ConversionConfig, PreviewMode, Record, Section, StatusMessage,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::config::SessionLimits;
use crate::infrastructure::file_source::{FileSource, InMemoryFile};
use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, put, web, App, HttpResponse, HttpServer,
    Responder, Scope,
};
use base64::Engine as _;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// One session per browser tab; the async mutex serializes Convert runs
/// against the same state.
pub type SharedSession = Arc<AsyncMutex<ConversionSession>>;

struct SessionSlot {
    session: SharedSession,
    last_seen: Instant,
}

pub struct HttpState {
    pub conversion: ConversionConfig,
    pub clock: Arc<dyn Clock>,
    pub limits: SessionLimits,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn new(
        conversion: ConversionConfig,
        clock: Arc<dyn Clock>,
        limits: SessionLimits,
        logs: Arc<Mutex<Vec<LogEntry>>>,
    ) -> Self {
        Self {
            conversion,
            clock,
            limits,
            sessions: Mutex::new(HashMap::new()),
            logs,
        }
    }

    /// Open a session, first dropping idle ones and, at the cap, the least
    /// recently used one
    pub fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = ConversionSession::new(self.conversion.clone(), self.clock.clone());

        let mut sessions = lock(&self.sessions);
        let evicted = evict_sessions(&mut sessions, &self.limits, Instant::now());
        sessions.insert(
            id,
            SessionSlot {
                session: Arc::new(AsyncMutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        drop(sessions);

        if evicted > 0 {
            add_log(
                &self.logs,
                "INFO",
                "Session",
                &format!("Evicted {} stale session(s)", evicted),
            );
        }
        id
    }

    pub fn session(&self, id: &str) -> Result<SharedSession> {
        let key = parse_session_id(id)?;
        let mut sessions = lock(&self.sessions);
        let slot = sessions
            .get_mut(&key)
            .ok_or_else(|| AppError::NotFound(format!("session '{}'", id)))?;
        slot.last_seen = Instant::now();
        Ok(slot.session.clone())
    }

    pub fn remove_session(&self, id: &str) -> Result<()> {
        let key = parse_session_id(id)?;
        lock(&self.sessions)
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("session '{}'", id)))
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }
}

/// Make room for one more session. Returns how many were dropped.
fn evict_sessions(
    sessions: &mut HashMap<Uuid, SessionSlot>,
    limits: &SessionLimits,
    now: Instant,
) -> usize {
    let before = sessions.len();
    let idle = Duration::from_secs(limits.idle_timeout_secs);
    sessions.retain(|_, slot| now.saturating_duration_since(slot.last_seen) < idle);

    while !sessions.is_empty() && sessions.len() >= limits.max_sessions.max(1) {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, slot)| slot.last_seen)
            .map(|(id, _)| *id);
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }

    before - sessions.len()
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct UploadFileRequest {
    pub file_name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub content_base64: String,
}

#[derive(Serialize)]
pub struct FileLoadResponse {
    pub headers: Vec<String>,
    pub status: StatusMessage,
}

#[derive(Deserialize)]
pub struct TitlePatternRequest {
    pub pattern: String,
}

#[derive(Deserialize)]
pub struct SectionNameRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RestoreSectionsRequest {
    pub sections: Vec<Section>,
    #[serde(default)]
    pub column_map: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct AssignColumnRequest {
    pub section_id: String,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    #[serde(flatten)]
    pub summary: ConversionSummary,
    pub preview: Vec<Record>,
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub mode: PreviewMode,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub mode: PreviewMode,
    pub total: usize,
    pub records: Vec<Record>,
    pub json: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: StatusMessage,
    pub blocking: Option<BlockingError>,
}

#[post("/sessions")]
async fn create_session(data: web::Data<HttpState>) -> impl Responder {
    let id = data.create_session();
    add_log(&data.logs, "INFO", "Session", &format!("Created session {}", id));
    HttpResponse::Created().json(CreateSessionResponse {
        session_id: id.to_string(),
    })
}

#[get("/sessions/{id}")]
async fn get_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    match data.session(&path) {
        Ok(session) => HttpResponse::Ok().json(session.lock().await.snapshot()),
        Err(e) => error_response(&data, "Session", &e),
    }
}

#[delete("/sessions/{id}")]
async fn delete_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    match data.remove_session(&path) {
        Ok(()) => {
            add_log(&data.logs, "INFO", "Session", &format!("Discarded session {}", path));
            HttpResponse::NoContent().finish()
        }
        Err(e) => error_response(&data, "Session", &e),
    }
}

#[post("/sessions/{id}/reset")]
async fn reset_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    match data.session(&path) {
        Ok(session) => {
            let mut session = session.lock().await;
            session.reset();
            HttpResponse::Ok().json(session.snapshot())
        }
        Err(e) => error_response(&data, "Session", &e),
    }
}

#[post("/sessions/{id}/file")]
async fn upload_file(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<UploadFileRequest>,
) -> impl Responder {
    let req = req.into_inner();
    add_log(
        &data.logs,
        "INFO",
        "File",
        &format!("Loading {} (mime={:?})", req.file_name, req.mime_type),
    );

    let result = async {
        let session = data.session(&path)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(req.content_base64.trim())
            .map_err(|e| AppError::ValidationError(format!("File content is not valid base64: {}", e)))?;
        let source: Arc<dyn FileSource> =
            Arc::new(InMemoryFile::new(req.file_name, req.mime_type, bytes));
        let headers = session.lock().await.load_file(source).await?;
        Ok::<_, AppError>(headers)
    }
    .await;

    match result {
        Ok(headers) => {
            let status = if headers.is_empty() {
                AppError::EmptyInput("No columns detected in the selected file".to_string())
                    .status_message()
            } else {
                StatusMessage::success(format!("Detected {} columns", headers.len()))
            };
            HttpResponse::Ok().json(FileLoadResponse { headers, status })
        }
        Err(e) => error_response(&data, "File", &e),
    }
}

#[put("/sessions/{id}/pattern")]
async fn set_title_pattern(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<TitlePatternRequest>,
) -> impl Responder {
    match data.session(&path) {
        Ok(session) => {
            let mut session = session.lock().await;
            session.set_title_pattern(&req.pattern);
            HttpResponse::Ok().json(session.snapshot())
        }
        Err(e) => error_response(&data, "Pattern", &e),
    }
}

#[post("/sessions/{id}/sections")]
async fn add_section(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<SectionNameRequest>,
) -> impl Responder {
    match data.session(&path) {
        Ok(session) => {
            let mut session = session.lock().await;
            session.add_section(&req.name);
            HttpResponse::Ok().json(session.snapshot())
        }
        Err(e) => error_response(&data, "Sections", &e),
    }
}

#[put("/sessions/{id}/sections")]
async fn restore_sections(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<RestoreSectionsRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let result = async {
        let session = data.session(&path)?;
        let mut session = session.lock().await;
        session.restore_sections(req.sections, req.column_map)?;
        Ok::<_, AppError>(session.snapshot())
    }
    .await;

    match result {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => error_response(&data, "Sections", &e),
    }
}

#[put("/sessions/{id}/sections/{section_id}")]
async fn rename_section(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    req: web::Json<SectionNameRequest>,
) -> impl Responder {
    let (id, section_id) = path.into_inner();
    let result = async {
        let session = data.session(&id)?;
        let mut session = session.lock().await;
        session.rename_section(&section_id, &req.name)?;
        Ok::<_, AppError>(session.snapshot())
    }
    .await;

    match result {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => error_response(&data, "Sections", &e),
    }
}

#[delete("/sessions/{id}/sections/{section_id}")]
async fn remove_section(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (id, section_id) = path.into_inner();
    let result = async {
        let session = data.session(&id)?;
        let mut session = session.lock().await;
        session.remove_section(&section_id)?;
        Ok::<_, AppError>(session.snapshot())
    }
    .await;

    match result {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => error_response(&data, "Sections", &e),
    }
}

#[put("/sessions/{id}/columns/{header}")]
async fn assign_column(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    req: web::Json<AssignColumnRequest>,
) -> impl Responder {
    let (id, header) = path.into_inner();
    let result = async {
        let session = data.session(&id)?;
        let mut session = session.lock().await;
        session.assign_column(&header, &req.section_id)?;
        Ok::<_, AppError>(session.snapshot())
    }
    .await;

    match result {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => error_response(&data, "Columns", &e),
    }
}

#[post("/sessions/{id}/convert")]
async fn convert(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    add_log(&data.logs, "INFO", "Convert", &format!("Converting session {}", path));

    let result = async {
        let session = data.session(&path)?;
        let mut session = session.lock().await;
        let summary = session.convert().await?;
        let preview_records = session.preview(PreviewMode::Table).to_vec();
        Ok::<_, AppError>(ConvertResponse {
            summary,
            preview: preview_records,
        })
    }
    .await;

    match result {
        Ok(response) => {
            add_log(
                &data.logs,
                "INFO",
                "Convert",
                &format!(
                    "Converted {} records in {} ms",
                    response.summary.record_count, response.summary.processing_time_ms
                ),
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => error_response(&data, "Convert", &e),
    }
}

#[get("/sessions/{id}/preview")]
async fn preview(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<PreviewQuery>,
) -> impl Responder {
    let mode = query.mode;
    let result = async {
        let session = data.session(&path)?;
        let session = session.lock().await;
        let records = session.preview(mode).to_vec();
        let json = match mode {
            PreviewMode::Json => Some(serde_json::to_string_pretty(&records)?),
            PreviewMode::Table => None,
        };
        Ok::<_, AppError>(PreviewResponse {
            mode,
            total: session.records().len(),
            records,
            json,
        })
    }
    .await;

    match result {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response(&data, "Preview", &e),
    }
}

#[get("/sessions/{id}/export/{format}")]
async fn export(data: web::Data<HttpState>, path: web::Path<(String, String)>) -> impl Responder {
    let (id, format) = path.into_inner();
    let result = async {
        let session = data.session(&id)?;
        let session = session.lock().await;
        match format.as_str() {
            "json" => session.export_json(),
            "csv" => session.export_csv(),
            other => Err(AppError::NotFound(format!("export format '{}'", other))),
        }
    }
    .await;

    match result {
        Ok(artifact) => {
            add_log(
                &data.logs,
                "INFO",
                "Export",
                &format!("Exported {}", artifact.file_name),
            );
            HttpResponse::Ok()
                .content_type(artifact.mime_type.clone())
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ))
                .body(artifact.body)
        }
        Err(e) => error_response(&data, "Export", &e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = lock(&data.logs);
    HttpResponse::Ok().json(&*logs)
}

fn error_response(data: &HttpState, source: &str, err: &AppError) -> HttpResponse {
    let level = match err {
        AppError::UnexpectedParse(_) | AppError::Internal(_) | AppError::IoError(_) => "ERROR",
        _ => "WARN",
    };
    add_log(&data.logs, level, source, &err.to_string());

    let status = match err {
        AppError::ValidationError(_) | AppError::EmptyInput(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::ExportPrecondition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    HttpResponse::build(status).json(ErrorResponse {
        status: err.status_message(),
        blocking: err.blocking(),
    })
}

fn parse_session_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| AppError::NotFound(format!("session '{}'", id)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = lock(logs);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn api_scope() -> Scope {
    web::scope("/api")
        .service(create_session)
        .service(get_session)
        .service(delete_session)
        .service(reset_session)
        .service(upload_file)
        .service(set_title_pattern)
        .service(add_section)
        .service(restore_sections)
        .service(rename_section)
        .service(remove_section)
        .service(assign_column)
        .service(convert)
        .service(preview)
        .service(export)
        .service(get_logs)
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(api_scope())
    })
    .bind((host, port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use actix_web::test as actix_test;
    use serde_json::{json, Value};

    fn state() -> web::Data<HttpState> {
        state_with_limits(SessionLimits::default())
    }

    fn state_with_limits(limits: SessionLimits) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            ConversionConfig::default(),
            Arc::new(SystemClock),
            limits,
            Arc::new(Mutex::new(Vec::new())),
        ))
    }

    fn upload_body(name: &str, content: &str) -> Value {
        json!({
            "file_name": name,
            "content_base64": base64::engine::general_purpose::STANDARD.encode(content),
        })
    }

    #[actix_web::test]
    async fn test_convert_and_export_flow() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;

        let req = actix_test::TestRequest::post().uri("/api/sessions").to_request();
        let created: Value = actix_test::call_and_read_body_json(&app, req).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/file", id))
            .set_json(upload_body("people.csv", "Name,Age\nAlice,30\nBob,25\n"))
            .to_request();
        let loaded: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(loaded["headers"], json!(["name", "age"]));
        assert_eq!(loaded["status"]["kind"], "success");

        let req = actix_test::TestRequest::put()
            .uri(&format!("/api/sessions/{}/pattern", id))
            .set_json(json!({ "pattern": "{column:name}-{index}" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/convert", id))
            .to_request();
        let converted: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(converted["record_count"], 2);
        assert_eq!(converted["preview"][0]["title"], "Alice-1");
        assert_eq!(converted["preview"][1]["title"], "Bob-2");
        assert_eq!(converted["preview"][1]["data"]["main"]["age"], "25");

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/sessions/{}/export/json", id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get("Content-Disposition")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(disposition.contains("exported-data-"));
        assert!(disposition.contains(".json"));
        let body = actix_test::read_body(resp).await;
        let records: Vec<Record> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[actix_web::test]
    async fn test_non_csv_upload_is_rejected() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;
        let id = data.create_session();

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/file", id))
            .set_json(upload_body("notes.txt", "a,b\n"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"]["kind"], "error");
        assert!(body["blocking"].is_null());
    }

    #[actix_web::test]
    async fn test_export_without_records_returns_blocking_error() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;
        let id = data.create_session();

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/sessions/{}/export/csv", id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["blocking"]["title"], "Nothing to export");
    }

    #[actix_web::test]
    async fn test_section_edits_and_reassignment() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;
        let id = data.create_session();

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/sections", id))
            .set_json(json!({ "name": "Meta" }))
            .to_request();
        let snapshot: Value = actix_test::call_and_read_body_json(&app, req).await;
        let meta_id = snapshot["sections"][1]["id"].as_str().unwrap().to_string();

        let req = actix_test::TestRequest::put()
            .uri(&format!("/api/sessions/{}/columns/Age", id))
            .set_json(json!({ "section_id": meta_id }))
            .to_request();
        let snapshot: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot["column_map"]["age"], meta_id.as_str());

        let req = actix_test::TestRequest::delete()
            .uri(&format!("/api/sessions/{}/sections/{}", id, meta_id))
            .to_request();
        let snapshot: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot["sections"].as_array().unwrap().len(), 1);
        assert_eq!(snapshot["column_map"]["age"], "main");

        let req = actix_test::TestRequest::delete()
            .uri(&format!("/api/sessions/{}/sections/main", id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_session() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;

        let req = actix_test::TestRequest::get()
            .uri("/api/sessions/not-a-uuid")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/sessions/{}", Uuid::new_v4()))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_errors_are_logged() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;
        let id = data.create_session();

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/convert", id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::get().uri("/api/logs").to_request();
        let logs: Vec<LogEntry> = actix_test::call_and_read_body_json(&app, req).await;
        assert!(logs
            .iter()
            .any(|entry| entry.level == "WARN" && entry.source == "Convert"));
    }

    #[actix_web::test]
    async fn test_restore_rejects_duplicate_section_ids() {
        let data = state();
        let app = actix_test::init_service(App::new().app_data(data.clone()).service(api_scope())).await;
        let id = data.create_session();

        let section = json!({ "id": "dup", "name": "Dup", "removable": true });
        let req = actix_test::TestRequest::put()
            .uri(&format!("/api/sessions/{}/sections", id))
            .set_json(json!({ "sections": [section.clone(), section], "column_map": {} }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/sessions/{}", id))
            .to_request();
        let snapshot: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot["sections"], json!([{ "id": "main", "name": "main", "removable": false }]));
    }

    fn slot(last_seen: Instant) -> SessionSlot {
        let session = ConversionSession::new(ConversionConfig::default(), Arc::new(SystemClock));
        SessionSlot {
            session: Arc::new(AsyncMutex::new(session)),
            last_seen,
        }
    }

    #[test]
    fn test_session_cap_evicts_least_recently_used() {
        let limits = SessionLimits {
            max_sessions: 2,
            idle_timeout_secs: 3600,
        };
        let now = Instant::now();
        let (recent, stale) = (Uuid::new_v4(), Uuid::new_v4());
        let mut sessions = HashMap::from([
            (recent, slot(now - Duration::from_secs(5))),
            (stale, slot(now - Duration::from_secs(50))),
        ]);

        assert_eq!(evict_sessions(&mut sessions, &limits, now), 1);
        assert!(sessions.contains_key(&recent));
        assert!(!sessions.contains_key(&stale));
    }

    #[test]
    fn test_create_session_respects_cap() {
        let data = state_with_limits(SessionLimits {
            max_sessions: 2,
            idle_timeout_secs: 3600,
        });
        for _ in 0..5 {
            data.create_session();
        }
        assert_eq!(data.session_count(), 2);
    }

    #[test]
    fn test_idle_sessions_are_dropped() {
        let limits = SessionLimits {
            max_sessions: 10,
            idle_timeout_secs: 60,
        };
        let data = state_with_limits(limits.clone());
        data.create_session();
        data.create_session();

        let mut sessions = lock(&data.sessions);
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(evict_sessions(&mut sessions, &limits, later), 2);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_log_buffer_is_bounded() {
        let logs = Mutex::new(Vec::new());
        for i in 0..150 {
            add_log(&logs, "INFO", "Test", &format!("message {}", i));
        }
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs[0].message, "message 50");
    }
}
