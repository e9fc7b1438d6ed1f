// LLM prompt constants for ATS analysis and resume optimization.
// Placeholders: {resume_text}, {job_description}.

pub const ATS_ANALYSIS_SYSTEM: &str = "\
You are an Applicant Tracking System (ATS) evaluator and senior technical recruiter. \
You score how well a resume would pass automated screening for a specific job description \
and explain the score in concrete, actionable terms.";

pub const ATS_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Evaluate the resume below against the job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "ats_score": 0-100,
  "summary": "two or three sentences on overall fit",
  "keyword_match": {
    "matched": ["keywords from the job description found in the resume"],
    "missing": ["important job description keywords absent from the resume"]
  },
  "section_scores": {
    "summary": 0-100,
    "experience": 0-100,
    "education": 0-100,
    "skills": 0-100,
    "formatting": 0-100
  },
  "strengths": ["specific strengths"],
  "improvements": ["specific, actionable improvements"]
}

Scoring guidance:
- 85-100: nearly every hard requirement is evidenced with matching terminology.
- 60-84: core requirements present, some keywords or evidence missing.
- 30-59: partial overlap, major requirements missing.
- 0-29: different role or field.
Judge formatting on ATS parseability: standard section headings, no tables of skills as images,
consistent dates.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}
"#;

pub const OPTIMIZE_SYSTEM: &str = "\
You are an expert resume writer who tailors resumes to job descriptions \
so they pass Applicant Tracking Systems while staying truthful.";

pub const OPTIMIZE_PROMPT_TEMPLATE: &str = r#"Rewrite the resume below so it scores higher against the job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "optimized_resume": "the full rewritten resume as plain text",
  "changes": ["one line per meaningful change you made"],
  "predicted_score": 0-100
}

Formatting rules for "optimized_resume":
- First line: the candidate's name. Next lines: email and phone.
- Use these section headings on their own lines, in this order when present:
  SUMMARY, EXPERIENCE, EDUCATION, SKILLS, PROJECTS
- Under EXPERIENCE: one short line per role ("Title, Company"), then one line per achievement
  starting with "• ".
- Under SKILLS: comma-separated on one or more lines.
- Mirror the job description's terminology where the resume already supports it.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}
"#;
