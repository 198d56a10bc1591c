use serde::{Deserialize, Serialize};

/// Body returned by `POST /predict`. `id` is what `/feedback` refers to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub id: i64,
    pub predicted_disease: String,
    pub confidence: f32,
    pub treatment: String,
}

/// Body accepted by `POST /feedback`. Both fields are optional on the wire so
/// the server can answer a missing field with a 400 instead of a parse error.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FeedbackRequest {
    pub id: Option<i64>,
    pub feedback: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// A stored prediction as exposed by `GET /predictions/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionRecord {
    pub id: i64,
    pub filename: String,
    pub disease: String,
    pub confidence: f32,
    pub feedback: Option<String>,
}
