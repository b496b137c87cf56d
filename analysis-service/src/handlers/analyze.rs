use crate::dtos::analysis::INVALID_PERCENTAGES_MESSAGE;
use crate::dtos::{AnalyzeRequest, AnalyzeResponse};
use crate::services::{build_analysis_prompt, metrics, GenerationParams, DIMENSION_LABELS};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;
use std::time::Instant;

fn invalid_input() -> AppError {
    metrics::record_analysis("invalid_input");
    AppError::BadRequest(anyhow::anyhow!(INVALID_PERCENTAGES_MESSAGE))
}

/// `POST /api/analyze`
///
/// The body is parsed by hand so that every malformed payload, including a
/// missing or non-JSON body, gets the same 400 instead of an extractor rejection.
pub async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected analysis payload");
        invalid_input()
    })?;

    let has_answers = request.answers.is_some();
    let percentages = request.into_percentages().map_err(|e| {
        tracing::debug!(error = %e, "Rejected analysis payload");
        invalid_input()
    })?;

    let prompt = build_analysis_prompt(&percentages, &DIMENSION_LABELS);
    let model = state.provider.model().to_string();

    tracing::info!(
        model = %model,
        prompt_len = prompt.len(),
        has_answers,
        "Requesting analysis"
    );

    let start = Instant::now();
    let result = state
        .provider
        .generate(&prompt, &GenerationParams::default())
        .await;
    metrics::record_provider_latency(&model, start.elapsed().as_secs_f64());

    match result {
        Ok(response) => {
            metrics::record_analysis("success");
            metrics::record_tokens(&model, response.input_tokens, response.output_tokens);
            Ok(Json(AnalyzeResponse::new(response.text)))
        }
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "Analysis failed");
            metrics::record_analysis(e.kind());
            Err(AppError::server_error("Analysis failed", e))
        }
    }
}
