use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for diagnostics information
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub n_rooms: u32,
    pub n_members: u32,
    pub n_retained_rooms: u32,
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_total: u64,
}
