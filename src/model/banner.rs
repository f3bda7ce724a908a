use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const BANNERS_COLLECTION: &str = "banners";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Number, numeric string, or missing
    #[serde(default)]
    pub order: Value,
    /// `true` or the sheet-exported `"TRUE"`
    #[serde(default)]
    pub is_active: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub link: String,
    pub order: f64,
}
