//! Stored submission files

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// `GET /media/submissions/{name}`
pub async fn get_submission_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state
        .files
        .load(&name)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a1b2.PDF"), "application/pdf");
        assert_eq!(content_type_for("a1b2"), "application/octet-stream");
    }
}
