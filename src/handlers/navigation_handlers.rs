use axum::{
    extract::Query,
    http::StatusCode,
    response::Redirect,
    Json,
};

use crate::{handlers::landing_dtos::VerifyQuery, landing::navigation::verification_path};

/// Certificate search box: `/verify?certificate=<id>` redirects to the
/// verification page for that identifier.
pub async fn go_to_verification(
    Query(query): Query<VerifyQuery>,
) -> Result<Redirect, (StatusCode, Json<serde_json::Value>)> {
    let path = verification_path(&query.certificate)?;
    tracing::debug!("Redirecting certificate search to {}", path);
    Ok(Redirect::to(&path))
}
