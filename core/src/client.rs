//! Typed operations against the attendance backend.
//!
//! # Design
//! `AttendanceClient` is a thin layer over `Gateway`: each method picks a
//! route and an options value, sends it, and decodes the envelope. It also
//! owns the session lifecycle. `login` writes the token into storage and
//! `logout` clears it; the gateway only ever reads it back.

use std::path::Path;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::form::FormData;
use crate::gateway::{Gateway, RequestOptions};
use crate::storage::{Storage, StorageTokenSource, AUTH_TOKEN_KEY};
use crate::types::{
    EnrollResponse, EnrollmentStatus, FaceEncoding, FaceEncodingList, Health, LoginRequest,
    LoginResponse, MarkAttendance, MarkAttendanceResponse, TodayAttendance, TokenStatus,
    VerifyEncoding, VerifyEncodingResponse,
};

/// Images required before an enrollment batch is submitted.
pub const MIN_ENROLLMENT_IMAGES: usize = 5;

/// Form field the backend reads the uploaded image from.
pub const ENROLL_IMAGE_FIELD: &str = "image";

/// An image file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FaceImage {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read an image from disk, guessing its content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = content_type_for(path);
        Ok(Self::new(filename, content_type, data))
    }

    fn to_form(&self) -> FormData {
        FormData::new().file(
            ENROLL_IMAGE_FIELD,
            self.filename.clone(),
            self.content_type.clone(),
            self.data.clone(),
        )
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// One image that failed to upload.
#[derive(Debug)]
pub struct EnrollmentFailure {
    pub filename: String,
    pub error: GatewayError,
}

/// Outcome of `enroll_faces`: every image is attempted independently.
#[derive(Debug, Default)]
pub struct EnrollmentSummary {
    pub uploaded: Vec<EnrollResponse>,
    pub failed: Vec<EnrollmentFailure>,
}

/// Client for the attendance backend.
#[derive(Clone)]
pub struct AttendanceClient {
    gateway: Gateway,
    storage: Arc<dyn Storage>,
}

impl AttendanceClient {
    /// Wire `gateway` to read its token from `storage`.
    pub fn new(gateway: Gateway, storage: Arc<dyn Storage>) -> Self {
        let gateway =
            gateway.with_token_source(Arc::new(StorageTokenSource::new(storage.clone())));
        Self { gateway, storage }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn is_logged_in(&self) -> Result<bool, GatewayError> {
        Ok(self
            .storage
            .get(AUTH_TOKEN_KEY)?
            .is_some_and(|t| !t.is_empty()))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, GatewayError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .gateway
            .post_json("/api/auth/login", &request)?
            .decode()?;
        self.storage.set(AUTH_TOKEN_KEY, &response.token)?;
        log::info!("logged in as {} ({})", response.user_id, response.role);
        Ok(response)
    }

    /// Revoke the session server-side and forget the token locally. The
    /// local token is cleared even when the server rejects the call.
    pub fn logout(&self) -> Result<(), GatewayError> {
        let result = self
            .gateway
            .send("/api/auth/logout", RequestOptions::post());
        self.storage.remove(AUTH_TOKEN_KEY)?;
        result.map(|_| ())
    }

    pub fn verify_token(&self) -> Result<TokenStatus, GatewayError> {
        self.gateway.get("/api/auth/verify-token")?.decode()
    }

    pub fn enroll_face(&self, image: &FaceImage) -> Result<EnrollResponse, GatewayError> {
        self.gateway
            .send(
                "/api/face/enroll",
                RequestOptions::post().body(image.to_form()),
            )?
            .decode()
    }

    /// Upload each image as its own enrollment request.
    ///
    /// Fewer than `MIN_ENROLLMENT_IMAGES` images is rejected before any
    /// request is made. A failed upload does not stop the rest; the call only
    /// fails when no image was accepted, returning the last upload error.
    pub fn enroll_faces(&self, images: &[FaceImage]) -> Result<EnrollmentSummary, GatewayError> {
        if images.len() < MIN_ENROLLMENT_IMAGES {
            return Err(GatewayError::InvalidInput(format!(
                "at least {MIN_ENROLLMENT_IMAGES} images are required, got {}",
                images.len()
            )));
        }

        let mut summary = EnrollmentSummary::default();
        for image in images {
            match self.enroll_face(image) {
                Ok(response) => summary.uploaded.push(response),
                Err(error) => {
                    log::warn!("upload of {} failed: {error}", image.filename);
                    summary.failed.push(EnrollmentFailure {
                        filename: image.filename.clone(),
                        error,
                    });
                }
            }
        }

        if summary.uploaded.is_empty() {
            if let Some(last) = summary.failed.pop() {
                return Err(last.error);
            }
        }
        Ok(summary)
    }

    pub fn mark_attendance(
        &self,
        location: Option<&str>,
    ) -> Result<MarkAttendanceResponse, GatewayError> {
        let body = MarkAttendance {
            location: location.map(str::to_string),
        };
        self.gateway
            .post_json("/api/attendance/mark", &body)?
            .decode()
    }

    pub fn today_attendance(&self) -> Result<TodayAttendance, GatewayError> {
        self.gateway.get("/api/attendance/today")?.decode()
    }

    pub fn face_encodings(&self, user_id: &str) -> Result<Vec<FaceEncoding>, GatewayError> {
        let list: FaceEncodingList = self
            .gateway
            .get(&format!("/api/face/user/{user_id}/encodings"))?
            .decode()?;
        Ok(list.encodings)
    }

    pub fn enrollment_status(&self, user_id: &str) -> Result<EnrollmentStatus, GatewayError> {
        self.gateway
            .get(&format!("/api/face/status/{user_id}"))?
            .decode()
    }

    pub fn verify_encoding(
        &self,
        encoding_id: &str,
        status: &str,
        notes: Option<&str>,
    ) -> Result<FaceEncoding, GatewayError> {
        let body = VerifyEncoding {
            status: status.to_string(),
            notes: notes.map(str::to_string),
        };
        let response: VerifyEncodingResponse = self
            .gateway
            .send(
                &format!("/api/face/encodings/{encoding_id}/verify"),
                RequestOptions::put().json(&body)?,
            )?
            .decode()?;
        Ok(response.encoding)
    }

    pub fn delete_encoding(&self, encoding_id: &str) -> Result<(), GatewayError> {
        self.gateway.send(
            &format!("/api/face/encodings/{encoding_id}"),
            RequestOptions::delete(),
        )?;
        Ok(())
    }

    pub fn health(&self) -> Result<Health, GatewayError> {
        self.gateway.get("/api/health")?.decode()
    }
}
