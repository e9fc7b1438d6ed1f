//! Resume text parser: turns free-text resumes into a display structure.
//!
//! One forward pass, no backtracking. Section detection is a fixed table of
//! header spellings; everything else is line-shape heuristics. Any input,
//! including an empty string, produces a `ParsedResume`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Only the first few lines are searched for contact details.
const HEADER_SCAN_LINES: usize = 5;
/// Non-bullet lines shorter than this inside EXPERIENCE are job titles.
const TITLE_MAX_CHARS: usize = 50;
const MIN_PHONE_DIGITS: usize = 10;
const BULLETS: &[char] = &['•', '-', '*', '▪', '●', '◦', '‣'];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{8,}\d").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSection {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
}

const SECTION_HEADERS: &[(ResumeSection, &[&str])] = &[
    (
        ResumeSection::Summary,
        &[
            "SUMMARY",
            "PROFESSIONAL SUMMARY",
            "PROFILE",
            "OBJECTIVE",
            "CAREER OBJECTIVE",
            "ABOUT ME",
        ],
    ),
    (
        ResumeSection::Experience,
        &[
            "EXPERIENCE",
            "WORK EXPERIENCE",
            "PROFESSIONAL EXPERIENCE",
            "EMPLOYMENT HISTORY",
            "WORK HISTORY",
            "EMPLOYMENT",
        ],
    ),
    (
        ResumeSection::Education,
        &[
            "EDUCATION",
            "ACADEMIC BACKGROUND",
            "EDUCATIONAL BACKGROUND",
            "QUALIFICATIONS",
        ],
    ),
    (
        ResumeSection::Skills,
        &[
            "SKILLS",
            "TECHNICAL SKILLS",
            "KEY SKILLS",
            "CORE COMPETENCIES",
            "TECHNOLOGIES",
        ],
    ),
    (
        ResumeSection::Projects,
        &[
            "PROJECTS",
            "PERSONAL PROJECTS",
            "KEY PROJECTS",
            "ACADEMIC PROJECTS",
        ],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeHeader {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    pub header: ResumeHeader,
    pub summary: String,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
    pub projects: Vec<String>,
}

impl ParsedResume {
    pub fn is_empty(&self) -> bool {
        *self == ParsedResume::default()
    }
}

/// Parses free-text resume content into a `ParsedResume`.
pub fn parse_resume_content(text: &str) -> ParsedResume {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut resume = ParsedResume::default();
    let consumed = scan_header(&lines, &mut resume.header);

    let mut active: Option<ResumeSection> = None;
    let mut summary_lines: Vec<&str> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        if let Some(section) = section_for(line) {
            active = Some(section);
            continue;
        }

        match active {
            None | Some(ResumeSection::Summary) => summary_lines.push(*line),
            Some(ResumeSection::Experience) => push_experience_line(&mut resume.experience, line),
            Some(ResumeSection::Education) => push_plain(&mut resume.education, line),
            Some(ResumeSection::Projects) => push_plain(&mut resume.projects, line),
            Some(ResumeSection::Skills) => push_skills(&mut resume.skills, line),
        }
    }

    resume.summary = summary_lines.join(" ");
    resume
}

/// Fills the header from the first lines and returns which lines were used.
fn scan_header(lines: &[&str], header: &mut ResumeHeader) -> Vec<bool> {
    let mut consumed = vec![false; lines.len()];

    for (i, line) in lines.iter().take(HEADER_SCAN_LINES).enumerate() {
        if section_for(line).is_some() {
            break;
        }

        let email = EMAIL_RE.find(line).map(|m| m.as_str().to_string());
        let phone = find_phone(line);

        if email.is_none() && phone.is_none() {
            if header.name.is_empty() {
                header.name = line.to_string();
                consumed[i] = true;
            }
            continue;
        }

        if let Some(email) = email {
            if header.email.is_empty() {
                header.email = email;
            }
        }
        if let Some(phone) = phone {
            if header.phone.is_empty() {
                header.phone = phone;
            }
        }
        consumed[i] = true;
    }

    consumed
}

fn find_phone(line: &str) -> Option<String> {
    PHONE_RE
        .find_iter(line)
        .map(|m| m.as_str().trim())
        .find(|candidate| {
            candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
        })
        .map(str::to_string)
}

/// Returns the section a header line opens, if the line is a header.
pub fn section_for(line: &str) -> Option<ResumeSection> {
    let normalized = line
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    SECTION_HEADERS
        .iter()
        .find(|(_, spellings)| spellings.contains(&normalized.as_str()))
        .map(|(section, _)| *section)
}

fn strip_bullet(line: &str) -> Option<&str> {
    let first = line.chars().next()?;
    if BULLETS.contains(&first) {
        Some(line[first.len_utf8()..].trim_start())
    } else {
        None
    }
}

fn push_experience_line(entries: &mut Vec<ExperienceEntry>, line: &str) {
    let detail = match strip_bullet(line) {
        Some(detail) => detail,
        None if line.chars().count() < TITLE_MAX_CHARS => {
            entries.push(ExperienceEntry {
                title: line.to_string(),
                details: Vec::new(),
            });
            return;
        }
        None => line,
    };

    if detail.is_empty() {
        return;
    }
    match entries.last_mut() {
        Some(entry) => entry.details.push(detail.to_string()),
        None => entries.push(ExperienceEntry {
            title: String::new(),
            details: vec![detail.to_string()],
        }),
    }
}

fn push_plain(items: &mut Vec<String>, line: &str) {
    let text = strip_bullet(line).unwrap_or(line);
    if !text.is_empty() {
        items.push(text.to_string());
    }
}

fn push_skills(skills: &mut Vec<String>, line: &str) {
    let line = strip_bullet(line).unwrap_or(line);
    let items = match line.split_once(':') {
        Some((_, rest)) => rest,
        None => line,
    };

    for item in items.split([',', '|', ';', '•']) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if !skills.iter().any(|s| s.to_lowercase() == item.to_lowercase()) {
            skills.push(item.to_string());
        }
    }
}
