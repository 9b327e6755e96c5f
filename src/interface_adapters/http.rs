// JSON error body shared by the lobby routes and the ws handler's rejections.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
