use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MIN_FACE_IMAGES: usize = 5;
pub const MAX_FACE_IMAGES: usize = 10;

pub const ADMIN_EMAIL: &str = "admin@example.edu";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const STUDENT_EMAIL: &str = "student@example.edu";
pub const STUDENT_PASSWORD: &str = "student123";

#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

impl User {
    fn is_admin(&self) -> bool {
        self.role == "ADMIN"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceEncoding {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub captured_at: String,
    pub quality_score: f64,
    pub face_confidence: f64,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub time: Option<String>,
    pub status: String,
    pub confidence: Option<f64>,
    pub location: Option<String>,
    pub source: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct MarkAttendance {
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyEncoding {
    pub status: Option<String>,
}

/// In-memory backend state.
#[derive(Debug)]
pub struct Backend {
    users: Vec<User>,
    /// bearer token -> user id
    sessions: HashMap<String, String>,
    encodings: Vec<FaceEncoding>,
    /// user id -> today's record
    attendance: HashMap<String, AttendanceRecord>,
}

impl Default for Backend {
    fn default() -> Self {
        let users = vec![
            User {
                id: "U_ADMIN".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                name: "Admin".to_string(),
                role: "ADMIN".to_string(),
            },
            User {
                id: "U_STUDENT".to_string(),
                email: STUDENT_EMAIL.to_string(),
                password: STUDENT_PASSWORD.to_string(),
                name: "Student".to_string(),
                role: "STUDENT".to_string(),
            },
        ];
        Self {
            users,
            sessions: HashMap::new(),
            encodings: Vec::new(),
            attendance: HashMap::new(),
        }
    }
}

impl Backend {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

pub type Db = Arc<RwLock<Backend>>;

/// Error responses in the backend's shapes: auth failures use `msg`,
/// everything else uses `error`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    NotFound(&'static str),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "msg": msg }))).into_response()
            }
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/verify-token", get(verify_token))
        .route("/api/face/enroll", post(enroll_face))
        .route("/api/face/user/{user_id}/encodings", get(user_encodings))
        .route("/api/face/encodings/{id}/verify", put(verify_encoding))
        .route("/api/face/encodings/{id}", delete(delete_encoding))
        .route("/api/face/status/{user_id}", get(enrollment_status))
        .route("/api/attendance/mark", post(mark_attendance))
        .route("/api/attendance/today", get(today_attendance))
        .route("/api/health", get(health))
        .route("/api/health/welcome", get(welcome))
        .route("/api/debug/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the calling user from the bearer token.
fn authenticate(db: &Backend, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer(headers).ok_or(ApiError::Unauthorized("Missing Authorization Header"))?;
    db.sessions
        .get(token)
        .and_then(|id| db.user(id))
        .cloned()
        .ok_or(ApiError::Unauthorized("Invalid token"))
}

fn now() -> chrono::DateTime<chrono::Local> {
    chrono::Local::now()
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(ApiError::BadRequest("Email and password required".into()));
    };
    let email = email.trim().to_lowercase();

    let mut db = db.write().await;
    let user = db
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned()
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let token = Uuid::new_v4().to_string();
    db.sessions.insert(token.clone(), user.id.clone());
    log::info!("user logged in: {} ({email})", user.id);

    let cookie = format!("session={}; Path=/; HttpOnly", Uuid::new_v4().simple());
    let body = Json(json!({
        "token": token,
        "user_id": user.id,
        "name": user.name,
        "role": user.role,
    }));
    Ok(([(header::SET_COOKIE, cookie)], body).into_response())
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let mut db = db.write().await;
    let user = authenticate(&db, &headers)?;
    if let Some(token) = bearer(&headers) {
        db.sessions.remove(token);
    }
    log::info!("user logged out: {}", user.id);
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

async fn verify_token(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let db = db.read().await;
    let user = authenticate(&db, &headers)?;
    Ok(Json(json!({
        "valid": true,
        "user_id": user.id,
        "name": user.name,
        "role": user.role,
    })))
}

async fn enroll_face(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&*db.read().await, &headers)?;

    let mut image: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("image").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            image = Some((filename, data));
        }
    }
    let (filename, data) = image.ok_or(ApiError::BadRequest("No image provided".into()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("No face detected in image".into()));
    }

    let mut db = db.write().await;
    let verified = db
        .encodings
        .iter()
        .filter(|e| e.user_id == user.id && e.status == "verified")
        .count();
    if verified >= MAX_FACE_IMAGES {
        return Err(ApiError::BadRequest(
            "Maximum face images already enrolled".into(),
        ));
    }

    let captured = now();
    let id = format!("FACE_ENC_{}_{}", user.id, Uuid::new_v4().simple());
    db.encodings.push(FaceEncoding {
        id: id.clone(),
        user_id: user.id.clone(),
        image_url: format!("uploads/faces/{}_{filename}", user.id),
        captured_at: captured.to_rfc3339(),
        quality_score: 1.0,
        face_confidence: 1.0,
        status: "pending".to_string(),
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Face enrolled successfully. Awaiting verification.",
            "face_encoding_id": id,
            "status": "pending",
        })),
    ))
}

async fn user_encodings(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db = db.read().await;
    let caller = authenticate(&db, &headers)?;
    if !caller.is_admin() && caller.id != user_id {
        return Err(ApiError::Forbidden("Access denied"));
    }
    let encodings: Vec<&FaceEncoding> =
        db.encodings.iter().filter(|e| e.user_id == user_id).collect();
    Ok(Json(json!({ "encodings": encodings })))
}

async fn verify_encoding(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<VerifyEncoding>,
) -> Result<Json<Value>, ApiError> {
    let mut db = db.write().await;
    let caller = authenticate(&db, &headers)?;
    if !caller.is_admin() {
        return Err(ApiError::Forbidden("Admin access required"));
    }
    let encoding = db
        .encodings
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(ApiError::NotFound("Face encoding not found"))?;
    encoding.status = input.status.unwrap_or_else(|| "verified".to_string());
    Ok(Json(json!({
        "message": "Face encoding updated successfully",
        "encoding": encoding,
    })))
}

async fn delete_encoding(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut db = db.write().await;
    let caller = authenticate(&db, &headers)?;
    let index = db
        .encodings
        .iter()
        .position(|e| e.id == id)
        .ok_or(ApiError::NotFound("Face encoding not found"))?;
    if !caller.is_admin() && db.encodings[index].user_id != caller.id {
        return Err(ApiError::Forbidden("Access denied"));
    }
    db.encodings.remove(index);
    Ok(Json(json!({ "message": "Face encoding deleted successfully" })))
}

async fn enrollment_status(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db = db.read().await;
    let caller = authenticate(&db, &headers)?;
    if !caller.is_admin() && caller.id != user_id {
        return Err(ApiError::Forbidden("Access denied"));
    }
    let total = db.encodings.iter().filter(|e| e.user_id == user_id).count();
    let verified = db
        .encodings
        .iter()
        .filter(|e| e.user_id == user_id && e.status == "verified")
        .count();
    Ok(Json(json!({
        "user_id": user_id,
        "total_encodings": total,
        "verified_encodings": verified,
        "is_enrolled": verified >= MIN_FACE_IMAGES,
        "min_required": MIN_FACE_IMAGES,
        "max_allowed": MAX_FACE_IMAGES,
    })))
}

/// Body is optional; anything that is not a JSON object counts as `{}`.
async fn mark_attendance(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input: MarkAttendance = serde_json::from_slice(&body).unwrap_or_default();

    let mut db = db.write().await;
    let user = authenticate(&db, &headers)?;

    if let Some(existing) = db.attendance.get(&user.id) {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "message": "Attendance already marked for today",
                "record": existing,
            })),
        ));
    }

    let at = now();
    let late_cutoff = chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
    let status = if at.time() > late_cutoff { "late" } else { "present" };
    let record = AttendanceRecord {
        id: format!("ATT_{}", Uuid::new_v4().simple()),
        user_id: user.id.clone(),
        date: at.date_naive().to_string(),
        time: Some(at.format("%H:%M:%S").to_string()),
        status: status.to_string(),
        confidence: None,
        location: Some(input.location.unwrap_or_else(|| "Main Gate".to_string())),
        source: "api".to_string(),
    };
    db.attendance.insert(user.id.clone(), record.clone());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Attendance marked successfully", "record": record })),
    ))
}

async fn today_attendance(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let db = db.read().await;
    let user = authenticate(&db, &headers)?;

    if !user.is_admin() {
        return Ok(Json(json!({ "record": db.attendance.get(&user.id) })));
    }

    let count = |status: &str| db.attendance.values().filter(|r| r.status == status).count();
    let total = db.users.len();
    Ok(Json(json!({
        "summary": {
            "date": now().date_naive().to_string(),
            "total_users": total,
            "present": count("present"),
            "late": count("late"),
            "absent": total - db.attendance.len(),
        }
    })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now().to_rfc3339(),
        "service": "face-attendance-api",
    }))
}

async fn welcome() -> &'static str {
    "Welcome to the Face Recognition Attendance API"
}

/// Reflects what the server received, for client header tests.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "authorization": value(header::AUTHORIZATION),
        "content_type": value(header::CONTENT_TYPE),
        "cookie": value(header::COOKIE),
        "body_length": body.len(),
    }))
}
