//! DTOs for the attendance backend's JSON API.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently, so
//! the integration tests catch drift between the two. Fields the backend may
//! omit or send as `null` are `Option` with `#[serde(default)]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub valid: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Result of one face-image upload. New encodings start out `pending` until
/// an admin verifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub message: String,
    pub face_encoding_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    pub status: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkAttendance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkAttendanceResponse {
    pub message: String,
    pub record: AttendanceRecord,
}

/// Today's attendance: regular users get their own `record` (possibly
/// `null`), admins get a `summary` across all users.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TodayAttendance {
    #[serde(default)]
    pub record: Option<AttendanceRecord>,
    #[serde(default)]
    pub summary: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub captured_at: Option<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub face_confidence: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncodingList {
    pub encodings: Vec<FaceEncoding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyEncoding {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyEncodingResponse {
    pub message: String,
    pub encoding: FaceEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStatus {
    pub user_id: String,
    pub total_encodings: u32,
    pub verified_encodings: u32,
    pub is_enrolled: bool,
    pub min_required: u32,
    pub max_allowed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}
