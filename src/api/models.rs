use crate::ledger::models::*;
use crate::reconcile::ReconcileReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========== REQUEST MODELS ==========

/// A release transaction has been submitted to the ledger
#[derive(Debug, Deserialize)]
pub struct SubmitReleaseRequest {
    pub title: String,
    pub artist_address: String,
    pub tx: String,
}

/// A new profile's publication transaction has been submitted
#[derive(Debug, Deserialize)]
pub struct SubmitProfileRequest {
    pub display_name: String,
    pub invited_by: Option<Uuid>,
    pub tx: String,
}

/// An existing profile's update transaction has been submitted
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub tx: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub pending_releases: i64,
    pub pending_profiles: i64,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub releases: Vec<Release>,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub releases: ReconcileReport,
    pub profiles: ReconcileReport,
}
