//! Downloadable HTML resumes: a parsed resume poured into one of six fixed styles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resume::parser::ParsedResume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStyle {
    Modern,
    Classic,
    Minimal,
    Professional,
    Creative,
    Executive,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 6] = [
        TemplateStyle::Modern,
        TemplateStyle::Classic,
        TemplateStyle::Minimal,
        TemplateStyle::Professional,
        TemplateStyle::Creative,
        TemplateStyle::Executive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStyle::Modern => "modern",
            TemplateStyle::Classic => "classic",
            TemplateStyle::Minimal => "minimal",
            TemplateStyle::Professional => "professional",
            TemplateStyle::Creative => "creative",
            TemplateStyle::Executive => "executive",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TemplateStyle::Modern => "Modern",
            TemplateStyle::Classic => "Classic",
            TemplateStyle::Minimal => "Minimal",
            TemplateStyle::Professional => "Professional",
            TemplateStyle::Creative => "Creative",
            TemplateStyle::Executive => "Executive",
        }
    }

    pub fn css(&self) -> &'static str {
        match self {
            TemplateStyle::Modern => MODERN_CSS,
            TemplateStyle::Classic => CLASSIC_CSS,
            TemplateStyle::Minimal => MINIMAL_CSS,
            TemplateStyle::Professional => PROFESSIONAL_CSS,
            TemplateStyle::Creative => CREATIVE_CSS,
            TemplateStyle::Executive => EXECUTIVE_CSS,
        }
    }
}

impl fmt::Display for TemplateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TemplateStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| format!("Unknown template '{s}'"))
    }
}

const MODERN_CSS: &str = "\
body { font-family: 'Segoe UI', Roboto, Arial, sans-serif; color: #1f2937; max-width: 820px; margin: 0 auto; padding: 40px; line-height: 1.5; }
header { border-bottom: 3px solid #2563eb; padding-bottom: 12px; margin-bottom: 20px; }
h1 { margin: 0; font-size: 32px; color: #111827; }
.contact { color: #4b5563; margin-top: 4px; }
h2 { color: #2563eb; font-size: 16px; text-transform: uppercase; letter-spacing: 1px; margin: 24px 0 8px; }
h3 { margin: 12px 0 4px; font-size: 15px; }
ul { margin: 4px 0 8px 20px; padding: 0; }
.skills span { display: inline-block; background: #eff6ff; color: #1d4ed8; border-radius: 4px; padding: 2px 8px; margin: 2px; font-size: 13px; }";

const CLASSIC_CSS: &str = "\
body { font-family: Georgia, 'Times New Roman', serif; color: #000; max-width: 800px; margin: 0 auto; padding: 48px; line-height: 1.45; }
header { text-align: center; margin-bottom: 18px; }
h1 { margin: 0; font-size: 28px; font-variant: small-caps; }
.contact { font-size: 14px; margin-top: 6px; }
h2 { font-size: 16px; border-bottom: 1px solid #000; padding-bottom: 2px; margin: 22px 0 8px; text-transform: uppercase; }
h3 { margin: 10px 0 2px; font-size: 15px; font-style: italic; }
ul { margin: 4px 0 8px 22px; padding: 0; }
.skills span::after { content: ', '; }
.skills span:last-child::after { content: ''; }";

const MINIMAL_CSS: &str = "\
body { font-family: Helvetica, Arial, sans-serif; color: #222; max-width: 760px; margin: 0 auto; padding: 36px; line-height: 1.6; font-size: 14px; }
header { margin-bottom: 24px; }
h1 { margin: 0; font-size: 26px; font-weight: 300; }
.contact { color: #777; }
h2 { font-size: 13px; font-weight: 600; color: #555; margin: 26px 0 6px; letter-spacing: 2px; text-transform: uppercase; }
h3 { margin: 10px 0 2px; font-size: 14px; font-weight: 600; }
ul { margin: 2px 0 8px 18px; padding: 0; }
.skills span { margin-right: 12px; }";

const PROFESSIONAL_CSS: &str = "\
body { font-family: Calibri, 'Helvetica Neue', Arial, sans-serif; color: #222; max-width: 820px; margin: 0 auto; padding: 40px; line-height: 1.45; }
header { background: #1e3a5f; color: #fff; padding: 20px 24px; margin: -40px -40px 24px; }
h1 { margin: 0; font-size: 30px; }
.contact { color: #dbe4f0; margin-top: 4px; }
h2 { color: #1e3a5f; font-size: 17px; border-left: 4px solid #1e3a5f; padding-left: 8px; margin: 22px 0 8px; }
h3 { margin: 10px 0 4px; font-size: 15px; color: #111; }
ul { margin: 4px 0 8px 20px; padding: 0; }
.skills span { display: inline-block; border: 1px solid #1e3a5f; border-radius: 3px; padding: 1px 6px; margin: 2px; font-size: 13px; }";

const CREATIVE_CSS: &str = "\
body { font-family: 'Trebuchet MS', Verdana, sans-serif; color: #2d2d2d; max-width: 840px; margin: 0 auto; padding: 40px; line-height: 1.55; background: #fffdf8; }
header { border-left: 8px solid #f97316; padding-left: 16px; margin-bottom: 24px; }
h1 { margin: 0; font-size: 36px; color: #c2410c; }
.contact { color: #6b7280; }
h2 { color: #7c3aed; font-size: 18px; margin: 26px 0 8px; }
h2::before { content: '▍'; color: #f97316; }
h3 { margin: 12px 0 4px; font-size: 15px; color: #4c1d95; }
ul { margin: 4px 0 8px 20px; padding: 0; }
.skills span { display: inline-block; background: #f5f3ff; color: #6d28d9; border-radius: 999px; padding: 3px 10px; margin: 3px; font-size: 13px; }";

const EXECUTIVE_CSS: &str = "\
body { font-family: Garamond, 'Palatino Linotype', serif; color: #1a1a1a; max-width: 820px; margin: 0 auto; padding: 52px; line-height: 1.5; }
header { border-top: 4px double #1a1a1a; border-bottom: 4px double #1a1a1a; padding: 14px 0; text-align: center; margin-bottom: 24px; }
h1 { margin: 0; font-size: 34px; letter-spacing: 3px; text-transform: uppercase; }
.contact { margin-top: 6px; font-size: 14px; letter-spacing: 1px; }
h2 { font-size: 15px; letter-spacing: 3px; text-transform: uppercase; text-align: center; margin: 26px 0 10px; }
h3 { margin: 12px 0 4px; font-size: 16px; }
ul { margin: 4px 0 8px 22px; padding: 0; }
.skills { text-align: center; }
.skills span { margin: 0 8px; }";

/// Escapes text for safe interpolation into HTML element content and attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders a complete standalone HTML document for the resume.
pub fn generate_template_html(resume: &ParsedResume, style: TemplateStyle) -> String {
    let header = &resume.header;
    let title = if header.name.trim().is_empty() {
        "Resume".to_string()
    } else {
        escape_html(&header.name)
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!("<style>\n{}\n</style>\n", style.css()));
    html.push_str(&format!(
        "</head>\n<body class=\"template-{}\">\n<header>\n",
        style.as_str()
    ));

    if !header.name.trim().is_empty() {
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&header.name)));
    }
    let contact: Vec<String> = [&header.email, &header.phone]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| escape_html(part))
        .collect();
    if !contact.is_empty() {
        html.push_str(&format!("<div class=\"contact\">{}</div>\n", contact.join(" | ")));
    }
    html.push_str("</header>\n");

    if !resume.summary.trim().is_empty() {
        html.push_str("<section class=\"summary\">\n<h2>Summary</h2>\n");
        html.push_str(&format!("<p>{}</p>\n</section>\n", escape_html(&resume.summary)));
    }

    if !resume.experience.is_empty() {
        html.push_str("<section class=\"experience\">\n<h2>Experience</h2>\n");
        for entry in &resume.experience {
            html.push_str("<div class=\"job\">\n");
            if !entry.title.is_empty() {
                html.push_str(&format!("<h3>{}</h3>\n", escape_html(&entry.title)));
            }
            push_list(&mut html, &entry.details);
            html.push_str("</div>\n");
        }
        html.push_str("</section>\n");
    }

    if !resume.education.is_empty() {
        html.push_str("<section class=\"education\">\n<h2>Education</h2>\n");
        push_list(&mut html, &resume.education);
        html.push_str("</section>\n");
    }

    if !resume.skills.is_empty() {
        html.push_str("<section class=\"skills\">\n<h2>Skills</h2>\n<div>");
        for skill in &resume.skills {
            html.push_str(&format!("<span>{}</span>", escape_html(skill)));
        }
        html.push_str("</div>\n</section>\n");
    }

    if !resume.projects.is_empty() {
        html.push_str("<section class=\"projects\">\n<h2>Projects</h2>\n");
        push_list(&mut html, &resume.projects);
        html.push_str("</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_list(html: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    html.push_str("<ul>\n");
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", escape_html(item)));
    }
    html.push_str("</ul>\n");
}
