//! ATS analysis and optimization: resume text resolution, the Gemini round trip,
//! and persistence of results into `resume_analyses`.

use std::collections::BTreeMap;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::resume::ResumeAnalysisRow;
use crate::resume::prompts::{
    ATS_ANALYSIS_PROMPT_TEMPLATE, ATS_ANALYSIS_SYSTEM, OPTIMIZE_PROMPT_TEMPLATE, OPTIMIZE_SYSTEM,
};

/// Resume text beyond this is dropped before prompting.
pub const MAX_RESUME_CHARS: usize = 30_000;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Result models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeywordMatch {
    #[serde(default)]
    pub matched: Vec<String>,
    #[serde(default)]
    pub missing: Vec<String>,
}

/// ATS report as stored and returned. Scores are whole numbers in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtsAnalysis {
    pub ats_score: u8,
    pub summary: String,
    pub keyword_match: KeywordMatch,
    pub section_scores: BTreeMap<String, u8>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// Shape the model actually returns; scores may be fractional or out of range.
#[derive(Debug, Deserialize)]
struct RawAtsAnalysis {
    ats_score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    keyword_match: KeywordMatch,
    #[serde(default)]
    section_scores: BTreeMap<String, f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

impl From<RawAtsAnalysis> for AtsAnalysis {
    fn from(raw: RawAtsAnalysis) -> Self {
        AtsAnalysis {
            ats_score: clamp_score(raw.ats_score),
            summary: raw.summary,
            keyword_match: raw.keyword_match,
            section_scores: raw
                .section_scores
                .into_iter()
                .map(|(section, score)| (section, clamp_score(score)))
                .collect(),
            strengths: raw.strengths,
            improvements: raw.improvements,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationResult {
    pub optimized_resume: String,
    pub changes: Vec<String>,
    pub predicted_score: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawOptimization {
    #[serde(default)]
    optimized_resume: String,
    #[serde(default)]
    changes: Vec<String>,
    predicted_score: Option<f64>,
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Resume text resolution
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResumeSource<'a> {
    Text(&'a str),
    File(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileKind {
    Pdf,
    PlainText,
}

impl FileKind {
    pub fn from_path(path: &str) -> Result<Self, AppError> {
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" | "md" => Ok(FileKind::PlainText),
            _ => Err(AppError::UnprocessableEntity(format!(
                "Unsupported resume file type '{path}'. Use .pdf, .txt or .md"
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::PlainText => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::PlainText => "text/plain; charset=utf-8",
        }
    }
}

/// Picks the resume source. Non-blank inline text wins over a stored file.
pub fn choose_source<'a>(
    resume_text: Option<&'a str>,
    file_path: Option<&'a str>,
) -> Result<ResumeSource<'a>, AppError> {
    if let Some(text) = resume_text.filter(|t| !t.trim().is_empty()) {
        return Ok(ResumeSource::Text(text));
    }
    if let Some(path) = file_path.filter(|p| !p.trim().is_empty()) {
        return Ok(ResumeSource::File(path.trim()));
    }
    Err(AppError::Validation(
        "Either resume_text or file_path is required".to_string(),
    ))
}

/// Storage key prefix for a user's uploaded resumes.
pub fn upload_prefix(user_id: Uuid) -> String {
    format!("resumes/{user_id}/")
}

/// Stored files may only be read by the user who uploaded them.
pub fn check_file_owner(path: &str, user_id: Uuid) -> Result<(), AppError> {
    if path.starts_with(&upload_prefix(user_id)) && !path.contains("..") {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "File '{path}' does not belong to this user"
        )))
    }
}

/// Loads resume text for a source, downloading and extracting stored files.
pub async fn resolve_resume_text(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    source: ResumeSource<'_>,
) -> Result<String, AppError> {
    let text = match source {
        ResumeSource::Text(text) => text.to_string(),
        ResumeSource::File(path) => {
            let kind = FileKind::from_path(path)?;
            let data = download(s3, bucket, path).await?;
            extract_text(kind, data).await?
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Resume contains no readable text".to_string(),
        ));
    }
    Ok(truncate_chars(&text, MAX_RESUME_CHARS).to_string())
}

async fn download(s3: &aws_sdk_s3::Client, bucket: &str, path: &str) -> Result<Bytes, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(path)
        .send()
        .await
        .map_err(|e| {
            let service_error = e.into_service_error();
            if service_error.is_no_such_key() {
                AppError::NotFound(format!("Resume file '{path}' not found"))
            } else {
                AppError::S3(service_error.to_string())
            }
        })?;

    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::S3(format!("Failed to read '{path}': {e}")))?
        .into_bytes();

    info!("Downloaded s3://{}/{} ({} bytes)", bucket, path, data.len());
    Ok(data)
}

async fn extract_text(kind: FileKind, data: Bytes) -> Result<String, AppError> {
    match kind {
        FileKind::PlainText => String::from_utf8(data.to_vec())
            .map_err(|_| AppError::UnprocessableEntity("Resume file is not valid UTF-8".into())),
        // pdf-extract is CPU-bound and synchronous
        FileKind::Pdf => {
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await
                .map_err(|e| AppError::Internal(e.into()))?
                .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))
        }
    }
}

/// Stores an uploaded resume and returns its storage key.
pub async fn store_upload(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    user_id: Uuid,
    kind: FileKind,
    data: Bytes,
) -> Result<String, AppError> {
    let key = format!("{}{}.{}", upload_prefix(user_id), Uuid::new_v4(), kind.extension());
    let size = data.len();

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(data))
        .content_type(kind.content_type())
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Upload failed: {e}")))?;

    info!("Stored resume upload s3://{}/{} ({} bytes)", bucket, key, size);
    Ok(key)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM calls
// ────────────────────────────────────────────────────────────────────────────

fn fill_prompt(template: &str, resume_text: &str, job_description: &str) -> String {
    template
        .replace("{job_description}", job_description)
        .replace("{resume_text}", resume_text)
}

fn system_prompt(role: &str) -> String {
    format!("{role} {NO_FABRICATION_INSTRUCTION} {JSON_ONLY_SYSTEM}")
}

/// Scores a resume against a job description.
pub async fn analyze_resume(
    llm: &LlmClient,
    resume_text: &str,
    job_description: &str,
) -> Result<AtsAnalysis, AppError> {
    let prompt = fill_prompt(ATS_ANALYSIS_PROMPT_TEMPLATE, resume_text, job_description);
    let raw: RawAtsAnalysis = llm
        .call_json(&prompt, &system_prompt(ATS_ANALYSIS_SYSTEM))
        .await
        .map_err(|e| AppError::Llm(format!("ATS analysis failed: {e}")))?;
    Ok(raw.into())
}

/// Rewrites a resume for a job description.
pub async fn optimize_resume(
    llm: &LlmClient,
    resume_text: &str,
    job_description: &str,
) -> Result<OptimizationResult, AppError> {
    let prompt = fill_prompt(OPTIMIZE_PROMPT_TEMPLATE, resume_text, job_description);
    let raw: RawOptimization = llm
        .call_json(&prompt, &system_prompt(OPTIMIZE_SYSTEM))
        .await
        .map_err(|e| AppError::Llm(format!("Resume optimization failed: {e}")))?;

    if raw.optimized_resume.trim().is_empty() {
        return Err(AppError::Llm(
            "Resume optimization returned an empty resume".to_string(),
        ));
    }

    Ok(OptimizationResult {
        optimized_resume: raw.optimized_resume,
        changes: raw.changes,
        predicted_score: raw.predicted_score.map(clamp_score),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence
// ────────────────────────────────────────────────────────────────────────────

/// 404 unless the analysis exists and belongs to the user.
pub async fn ensure_owned(pool: &PgPool, analysis_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let exists: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM resume_analyses WHERE id = $1 AND user_id = $2")
            .bind(analysis_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))
}

pub struct SaveAnalysis<'a> {
    pub user_id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub job_description: &'a str,
    pub file_path: Option<&'a str>,
    pub analysis: &'a AtsAnalysis,
}

/// Updates the given analysis row, or inserts a new one. Returns the row id.
pub async fn save_analysis(pool: &PgPool, params: SaveAnalysis<'_>) -> Result<Uuid, AppError> {
    let result = serde_json::to_value(params.analysis).map_err(|e| AppError::Internal(e.into()))?;
    let score = i32::from(params.analysis.ats_score);

    let id: Uuid = match params.analysis_id {
        Some(analysis_id) => sqlx::query_scalar(
            r#"
            UPDATE resume_analyses
            SET status = 'completed', ats_score = $1, analysis_result = $2,
                error_message = NULL, updated_at = NOW()
            WHERE id = $3 AND user_id = $4
            RETURNING id
            "#,
        )
        .bind(score)
        .bind(&result)
        .bind(analysis_id)
        .bind(params.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?,
        None => sqlx::query_scalar(
            r#"
            INSERT INTO resume_analyses
                (user_id, job_description, file_path, status, ats_score, analysis_result)
            VALUES ($1, $2, $3, 'completed', $4, $5)
            RETURNING id
            "#,
        )
        .bind(params.user_id)
        .bind(params.job_description)
        .bind(params.file_path)
        .bind(score)
        .bind(&result)
        .fetch_one(pool)
        .await?,
    };

    info!(
        "Saved ATS analysis {} for user {} (score {})",
        id, params.user_id, score
    );
    Ok(id)
}

/// Records a failed analysis so the client stops waiting on it.
pub async fn mark_failed(
    pool: &PgPool,
    analysis_id: Uuid,
    user_id: Uuid,
    message: &str,
) -> Result<(), AppError> {
    warn!("Analysis {analysis_id} failed: {message}");
    sqlx::query(
        r#"
        UPDATE resume_analyses
        SET status = 'failed', error_message = $1, updated_at = NOW()
        WHERE id = $2 AND user_id = $3
        "#,
    )
    .bind(message)
    .bind(analysis_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn save_optimization(
    pool: &PgPool,
    analysis_id: Uuid,
    user_id: Uuid,
    optimized_resume: &str,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE resume_analyses
        SET optimized_resume = $1, updated_at = NOW()
        WHERE id = $2 AND user_id = $3
        "#,
    )
    .bind(optimized_resume)
    .bind(analysis_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Analysis {analysis_id} not found")));
    }
    Ok(())
}

pub async fn list_analyses(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ResumeAnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeAnalysisRow>(
        "SELECT * FROM resume_analyses WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_analysis_is_clamped_and_defaulted() {
        let raw: RawAtsAnalysis = serde_json::from_str(
            r#"{"ats_score": 104.6, "section_scores": {"skills": 71.4, "formatting": -3}}"#,
        )
        .unwrap();
        let analysis = AtsAnalysis::from(raw);
        assert_eq!(analysis.ats_score, 100);
        assert_eq!(analysis.section_scores["skills"], 71);
        assert_eq!(analysis.section_scores["formatting"], 0);
        assert!(analysis.strengths.is_empty());
        assert!(analysis.keyword_match.missing.is_empty());
    }

    #[test]
    fn test_full_analysis_deserializes() {
        let raw: RawAtsAnalysis = serde_json::from_str(
            r#"{
                "ats_score": 68,
                "summary": "Good backend fit, thin on cloud.",
                "keyword_match": {"matched": ["Rust", "Postgres"], "missing": ["AWS"]},
                "section_scores": {"experience": 75},
                "strengths": ["Quantified impact"],
                "improvements": ["Mention AWS services used"]
            }"#,
        )
        .unwrap();
        let analysis = AtsAnalysis::from(raw);
        assert_eq!(analysis.ats_score, 68);
        assert_eq!(analysis.keyword_match.matched, vec!["Rust", "Postgres"]);
        assert_eq!(analysis.improvements.len(), 1);
    }

    #[test]
    fn test_missing_score_is_a_parse_error() {
        assert!(serde_json::from_str::<RawAtsAnalysis>(r#"{"summary": "x"}"#).is_err());
    }

    #[test]
    fn test_clamp_score_handles_nan() {
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(49.5), 50);
    }

    #[test]
    fn test_choose_source_prefers_text() {
        assert_eq!(
            choose_source(Some("resume"), Some("resumes/x.pdf")).unwrap(),
            ResumeSource::Text("resume")
        );
        assert_eq!(
            choose_source(Some("   "), Some("resumes/x.pdf")).unwrap(),
            ResumeSource::File("resumes/x.pdf")
        );
        assert!(matches!(
            choose_source(None, Some("")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_path("a/b/CV.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_path("cv.md").unwrap(), FileKind::PlainText);
        assert!(matches!(
            FileKind::from_path("cv.docx"),
            Err(AppError::UnprocessableEntity(_))
        ));
        assert!(FileKind::from_path("noextension").is_err());
    }

    #[test]
    fn test_file_owner_check() {
        let user = Uuid::new_v4();
        let own = format!("resumes/{user}/abc.pdf");
        assert!(check_file_owner(&own, user).is_ok());
        assert!(check_file_owner(&format!("resumes/{user}/../other/x.pdf"), user).is_err());
        assert!(check_file_owner(&format!("resumes/{}/abc.pdf", Uuid::new_v4()), user).is_err());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_fill_prompt_substitutes_both_placeholders() {
        let prompt = fill_prompt(ATS_ANALYSIS_PROMPT_TEMPLATE, "MY RESUME", "MY JD");
        assert!(prompt.contains("MY RESUME"));
        assert!(prompt.contains("MY JD"));
        assert!(!prompt.contains("{resume_text}"));
        assert!(!prompt.contains("{job_description}"));
    }
}
