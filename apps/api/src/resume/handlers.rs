//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeAnalysisRow;
use crate::resume::analysis::{
    analyze_resume, check_file_owner, choose_source, ensure_owned, list_analyses, mark_failed,
    optimize_resume, resolve_resume_text, save_analysis, save_optimization, store_upload,
    AtsAnalysis, FileKind, OptimizationResult, ResumeSource, SaveAnalysis, MAX_UPLOAD_BYTES,
};
use crate::resume::parser::{parse_resume_content, ParsedResume};
use crate::resume::templates::{generate_template_html, TemplateStyle};
use crate::routes::UserIdQuery;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub resume_text: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub template: TemplateStyle,
    /// Already-parsed (possibly user-edited) resume. Takes precedence over `resume_text`.
    pub resume: Option<ParsedResume>,
    pub resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateInfo {
    pub id: TemplateStyle,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_path: String,
    pub size_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub resume_text: Option<String>,
    pub file_path: Option<String>,
    pub job_description: String,
    pub analysis_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub ats_score: u8,
    pub analysis_result: AtsAnalysis,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub analysis_id: Option<Uuid>,
    #[serde(flatten)]
    pub optimization: OptimizationResult,
    pub parsed: ParsedResume,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/parse
pub async fn handle_parse(
    Json(request): Json<ParseRequest>,
) -> Result<Json<ParsedResume>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    Ok(Json(parse_resume_content(&request.resume_text)))
}

/// POST /api/v1/resume/render
///
/// Returns the resume as a downloadable HTML document.
pub async fn handle_render(Json(request): Json<RenderRequest>) -> Result<Response, AppError> {
    let resume = match (request.resume, request.resume_text) {
        (Some(resume), _) if !resume.is_empty() => resume,
        (_, Some(text)) if !text.trim().is_empty() => parse_resume_content(&text),
        _ => {
            return Err(AppError::Validation(
                "Either resume or resume_text is required".to_string(),
            ))
        }
    };

    let html = generate_template_html(&resume, request.template);
    let disposition = format!("attachment; filename=\"resume-{}.html\"", request.template);

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        html,
    )
        .into_response())
}

/// GET /api/v1/resume/templates
pub async fn handle_list_templates() -> Json<Vec<TemplateInfo>> {
    Json(
        TemplateStyle::ALL
            .into_iter()
            .map(|style| TemplateInfo {
                id: style,
                name: style.display_name(),
            })
            .collect(),
    )
}

/// POST /api/v1/resume/upload?user_id=
///
/// Multipart upload with a single `file` field.
pub async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field must carry a filename".to_string()))?;
        let kind = FileKind::from_path(&filename)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(format!(
                "Resume files are limited to {} MiB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let size_bytes = data.len();
        let file_path =
            store_upload(&state.s3, &state.config.s3_bucket, params.user_id, kind, data).await?;
        return Ok(Json(UploadResponse {
            file_path,
            size_bytes,
        }));
    }

    Err(AppError::Validation("Missing 'file' field".to_string()))
}

/// POST /api/v1/resume/analyze
///
/// Resolves resume text, scores it with Gemini and persists the result.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    let source = choose_source(request.resume_text.as_deref(), request.file_path.as_deref())?;
    let stored_path = match source {
        ResumeSource::File(path) => {
            check_file_owner(path, request.user_id)?;
            Some(path)
        }
        ResumeSource::Text(_) => None,
    };

    if let Some(analysis_id) = request.analysis_id {
        ensure_owned(&state.db, analysis_id, request.user_id).await?;
    }

    let resume_text = resolve_resume_text(&state.s3, &state.config.s3_bucket, source).await?;

    let analysis = match analyze_resume(&state.llm, &resume_text, &request.job_description).await {
        Ok(analysis) => analysis,
        Err(e) => {
            if let Some(analysis_id) = request.analysis_id {
                mark_failed(&state.db, analysis_id, request.user_id, &e.to_string()).await?;
            }
            return Err(e);
        }
    };

    let analysis_id = save_analysis(
        &state.db,
        SaveAnalysis {
            user_id: request.user_id,
            analysis_id: request.analysis_id,
            job_description: &request.job_description,
            file_path: stored_path,
            analysis: &analysis,
        },
    )
    .await?;

    Ok(Json(AnalyzeResponse {
        analysis_id,
        ats_score: analysis.ats_score,
        analysis_result: analysis,
    }))
}

/// POST /api/v1/resume/optimize
///
/// Rewrites the resume for the job description and returns it with a parsed preview.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    let source = choose_source(request.resume_text.as_deref(), request.file_path.as_deref())?;
    if let ResumeSource::File(path) = source {
        check_file_owner(path, request.user_id)?;
    }

    if let Some(analysis_id) = request.analysis_id {
        ensure_owned(&state.db, analysis_id, request.user_id).await?;
    }

    let resume_text = resolve_resume_text(&state.s3, &state.config.s3_bucket, source).await?;
    let optimization = optimize_resume(&state.llm, &resume_text, &request.job_description).await?;

    if let Some(analysis_id) = request.analysis_id {
        save_optimization(
            &state.db,
            analysis_id,
            request.user_id,
            &optimization.optimized_resume,
        )
        .await?;
    }

    let parsed = parse_resume_content(&optimization.optimized_resume);
    Ok(Json(OptimizeResponse {
        analysis_id: request.analysis_id,
        optimization,
        parsed,
    }))
}

/// GET /api/v1/resume/analyses?user_id=
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeAnalysisRow>>, AppError> {
    Ok(Json(list_analyses(&state.db, params.user_id).await?))
}
