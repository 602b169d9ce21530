use chrono::{DateTime, Utc};
use common::{DeliveryAttempt, Message, TimeWindow};
use serde::{Deserialize, Serialize};

/// Query parameters for the attempts and messages proxies.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamParams {
    #[param(example = "abc123")]
    pub project_id: Option<String>,
    #[param(example = "hook-xyz")]
    pub webhook_id: Option<String>,
    /// Offset of the first page.
    #[param(example = 0)]
    pub offset: Option<u32>,
    /// Page size, at most 50.
    #[param(example = 50)]
    pub limit: Option<u32>,
    /// Anchor the time window end here instead of now.
    #[param(example = "2025-09-01T08:00:00Z")]
    pub before: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptsResponse {
    pub attempts: Vec<DeliveryAttempt>,
    /// Conservative: set whenever every configured page was requested.
    pub has_more: bool,
    pub window: TimeWindow,
}

/// Time span covered by a messages response.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub older_data_available: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    pub window: MessageWindow,
}
