use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub username: Option<String>,
}

/// Partial draft update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct DraftRequest {
    pub recipient: Option<String>,
    pub amount: Option<String>,
}

