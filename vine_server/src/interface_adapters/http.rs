// JSON error body shared by every HTTP route.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable reason; the status code carries the category.
    pub error: String,
}
