use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json,
};
use partyjam_core::{NewParty, PartySetting, TrackMetadata};
use serde::Deserialize;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        CreatePartySchema, HeartbeatSchema, HostActionSchema, JoinPartySchema, NowPlayingSchema,
        SeedQueueSchema, SeedTrackSchema, SuggestSchema, UpdateAllowSuggestionsSchema,
        UpdateKidFriendlySchema, UpdateMoodSchema, ValidatedJson, VoteSchema,
    },
    serialized::{
        CreatedParty, Heartbeat, JoinedParty, Party, PartyState, ResolvedParty, SeededQueue, Song,
        SuggestedTrack, ToSerialized, VoteOutcome,
    },
    sse, Router,
};

#[utoipa::path(
    post,
    path = "/v1/parties",
    tag = "parties",
    request_body = CreatePartySchema,
    responses(
        (status = 200, body = CreatedParty)
    )
)]
async fn create_party(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<CreatePartySchema>,
) -> ServerResult<Json<CreatedParty>> {
    let session = context.partyjam.parties.create_party(NewParty {
        host_id: body.host_id,
        mood: body.mood,
        kid_friendly: body.kid_friendly,
        allow_suggestions: body.allow_suggestions,
    })?;

    Ok(Json(CreatedParty {
        party_id: session.id(),
        join_code: session.join_code().to_string(),
        party: session.data().to_serialized(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveQuery {
    join_code: String,
}

#[utoipa::path(
    get,
    path = "/v1/parties/resolve",
    tag = "parties",
    responses(
        (status = 200, body = ResolvedParty)
    )
)]
async fn resolve_join_code(
    State(context): State<ServerContext>,
    Query(query): Query<ResolveQuery>,
) -> ServerResult<Json<ResolvedParty>> {
    let session = context.partyjam.parties.resolve_join_code(&query.join_code)?;

    Ok(Json(ResolvedParty {
        party_id: session.id(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/join",
    tag = "parties",
    request_body = JoinPartySchema,
    responses(
        (status = 200, body = JoinedParty)
    )
)]
async fn join_party(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<JoinPartySchema>,
) -> ServerResult<Json<JoinedParty>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let member = session.join(&body.user_id)?;

    Ok(Json(JoinedParty {
        party_id: session.id(),
        member: member.to_serialized(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateQuery {
    user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/parties/{id}/state",
    tag = "parties",
    responses(
        (status = 200, body = PartyState)
    )
)]
async fn party_state(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    Query(query): Query<StateQuery>,
) -> ServerResult<Json<PartyState>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let snapshot = session.snapshot(query.user_id.as_deref());

    Ok(Json(snapshot.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/start",
    tag = "parties",
    request_body = HostActionSchema,
    responses(
        (status = 200, body = Party)
    )
)]
async fn start_party(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<HostActionSchema>,
) -> ServerResult<Json<Party>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    session.start(&body.host_id)?;

    Ok(Json(session.data().to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/end",
    tag = "parties",
    request_body = HostActionSchema,
    responses(
        (status = 200, body = Party)
    )
)]
async fn end_party(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<HostActionSchema>,
) -> ServerResult<Json<Party>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    session.end(&body.host_id)?;

    Ok(Json(session.data().to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/heartbeat",
    tag = "parties",
    request_body = HeartbeatSchema,
    responses(
        (status = 200, body = Heartbeat)
    )
)]
async fn heartbeat(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<HeartbeatSchema>,
) -> ServerResult<Json<Heartbeat>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let active = session.heartbeat(&body.user_id)?;

    Ok(Json(Heartbeat { active }))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/vote",
    tag = "parties",
    request_body = VoteSchema,
    responses(
        (status = 200, body = VoteOutcome)
    )
)]
async fn vote(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<VoteSchema>,
) -> ServerResult<Json<VoteOutcome>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;

    let result = session.vote(
        &body.user_id,
        &body.track_id,
        body.vote.into(),
        body.context.into(),
    )?;

    Ok(Json(result.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/suggest",
    tag = "parties",
    request_body = SuggestSchema,
    responses(
        (status = 200, body = SuggestedTrack)
    )
)]
async fn suggest(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<SuggestSchema>,
) -> ServerResult<Json<SuggestedTrack>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;

    let suggestion = session.suggest(
        &body.user_id,
        TrackMetadata {
            track_id: body.track_id,
            title: body.title.unwrap_or_default(),
            artist: body.artist.unwrap_or_default(),
            album_art_url: body.album_art_url.unwrap_or_default(),
            explicit: body.explicit.unwrap_or(false),
        },
    )?;

    let expire_after_ms = context.partyjam.config().suggest_expire_at_ms;

    Ok(Json(SuggestedTrack::from_suggestion(
        &suggestion,
        expire_after_ms,
    )))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/settings/mood",
    tag = "settings",
    request_body = UpdateMoodSchema,
    responses(
        (status = 200, body = Party)
    )
)]
async fn update_mood(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateMoodSchema>,
) -> ServerResult<Json<Party>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let party = session.update_setting(&body.host_id, PartySetting::Mood(body.mood))?;

    Ok(Json(party.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/settings/kidFriendly",
    tag = "settings",
    request_body = UpdateKidFriendlySchema,
    responses(
        (status = 200, body = Party)
    )
)]
async fn update_kid_friendly(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateKidFriendlySchema>,
) -> ServerResult<Json<Party>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let party =
        session.update_setting(&body.host_id, PartySetting::KidFriendly(body.kid_friendly))?;

    Ok(Json(party.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/settings/allowSuggestions",
    tag = "settings",
    request_body = UpdateAllowSuggestionsSchema,
    responses(
        (status = 200, body = Party)
    )
)]
async fn update_allow_suggestions(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateAllowSuggestionsSchema>,
) -> ServerResult<Json<Party>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let party = session.update_setting(
        &body.host_id,
        PartySetting::AllowSuggestions(body.allow_suggestions),
    )?;

    Ok(Json(party.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/seed",
    tag = "parties",
    request_body = SeedQueueSchema,
    responses(
        (status = 200, body = SeededQueue)
    )
)]
async fn seed_queue(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<SeedQueueSchema>,
) -> ServerResult<Json<SeededQueue>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;

    let tracks = body.tracks.into_iter().map(into_metadata).collect();
    let added = session.seed_queue(&body.host_id, tracks)?;

    Ok(Json(SeededQueue {
        added_count: added.len(),
        queue: session.snapshot(None).queue.to_serialized(),
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/parties/{id}/queue/{trackId}",
    tag = "parties",
    request_body = HostActionSchema,
    responses(
        (status = 200, description = "The track is no longer in the queue")
    )
)]
async fn remove_from_queue(
    State(context): State<ServerContext>,
    Path((party_id, track_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<HostActionSchema>,
) -> ServerResult<Json<Vec<Song>>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    session.remove_from_queue(&body.host_id, &track_id)?;

    Ok(Json(session.snapshot(None).queue.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/parties/{id}/nowPlaying",
    tag = "parties",
    request_body = NowPlayingSchema,
    responses(
        (status = 200, body = Song)
    )
)]
async fn set_now_playing(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    ValidatedJson(body): ValidatedJson<NowPlayingSchema>,
) -> ServerResult<Json<Song>> {
    let session = context.partyjam.parties.party_by_id(&party_id)?;
    let song = session.set_now_playing(&body.host_id, &body.track_id, body.started_at)?;

    Ok(Json(song.to_serialized()))
}

fn into_metadata(track: SeedTrackSchema) -> TrackMetadata {
    TrackMetadata {
        track_id: track.track_id,
        title: track.title.unwrap_or_default(),
        artist: track.artist.unwrap_or_default(),
        album_art_url: track.album_art_url.unwrap_or_default(),
        explicit: track.explicit.unwrap_or(false),
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_party))
        .route("/resolve", get(resolve_join_code))
        .route("/:id/join", post(join_party))
        .route("/:id/state", get(party_state))
        .route("/:id/start", post(start_party))
        .route("/:id/end", post(end_party))
        .route("/:id/heartbeat", post(heartbeat))
        .route("/:id/vote", post(vote))
        .route("/:id/suggest", post(suggest))
        .route("/:id/settings/mood", post(update_mood))
        .route("/:id/settings/kidFriendly", post(update_kid_friendly))
        .route(
            "/:id/settings/allowSuggestions",
            post(update_allow_suggestions),
        )
        .route("/:id/seed", post(seed_queue))
        .route("/:id/queue/:trackId", delete(remove_from_queue))
        .route("/:id/nowPlaying", post(set_now_playing))
        .route("/:id/events", get(sse::event_stream))
}
