use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::serialized::{VoteContext, VoteKind};

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePartySchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    #[validate(length(max = 64))]
    pub mood: Option<String>,
    pub kid_friendly: Option<bool>,
    pub allow_suggestions: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinPartySchema {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
}

/// The body of any host-only action that needs nothing else
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostActionSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeartbeatSchema {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoteSchema {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 256))]
    pub track_id: String,
    pub vote: VoteKind,
    pub context: VoteContext,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SuggestSchema {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 256))]
    pub track_id: String,
    #[validate(length(max = 512))]
    pub title: Option<String>,
    #[validate(length(max = 512))]
    pub artist: Option<String>,
    #[validate(length(max = 2048))]
    pub album_art_url: Option<String>,
    pub explicit: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMoodSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    #[validate(length(max = 64))]
    pub mood: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateKidFriendlySchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    pub kid_friendly: bool,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAllowSuggestionsSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    pub allow_suggestions: bool,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedTrackSchema {
    #[validate(length(min = 1, max = 256))]
    pub track_id: String,
    #[validate(length(max = 512))]
    pub title: Option<String>,
    #[validate(length(max = 512))]
    pub artist: Option<String>,
    #[validate(length(max = 2048))]
    pub album_art_url: Option<String>,
    pub explicit: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedQueueSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    #[validate(nested)]
    pub tracks: Vec<SeedTrackSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NowPlayingSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_id: String,
    #[validate(length(min = 1, max = 256))]
    pub track_id: String,
    pub started_at: Option<u64>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
