//! Outreach email composition: `{{ placeholder }}` interpolation and the plain-text
//! to HTML conversion applied to message bodies.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::recruiter::RecruiterRow;
use crate::resume::templates::escape_html;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid regex"));

/// The account an outreach email is sent from.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub name: String,
    pub email: String,
}

/// Replaces `{{ key }}` placeholders. Unknown keys are left as written.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

pub fn recipient_vars(
    recruiter: &RecruiterRow,
    sender: &SenderIdentity,
) -> HashMap<&'static str, String> {
    let first_name = recruiter
        .name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    HashMap::from([
        ("recruiter_name", recruiter.name.clone()),
        ("first_name", first_name),
        ("company", recruiter.company.clone().unwrap_or_default()),
        ("title", recruiter.title.clone().unwrap_or_default()),
        ("sender_name", sender.name.clone()),
        ("sender_email", sender.email.clone()),
    ])
}

/// Escapes a plain-text body and keeps its line breaks.
pub fn text_to_html(body: &str) -> String {
    escape_html(body).replace("\r\n", "\n").replace('\n', "<br>\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn recruiter() -> RecruiterRow {
        RecruiterRow {
            id: Uuid::new_v4(),
            name: "Priya Sharma".to_string(),
            email: "priya@example.com".to_string(),
            company: Some("Globex".to_string()),
            title: None,
            linkedin_url: None,
            tier: "PRO".to_string(),
            domain_id: None,
            subdomain_id: None,
            created_at: Utc::now(),
        }
    }

    fn sender() -> SenderIdentity {
        SenderIdentity {
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    #[test]
    fn test_render_replaces_known_placeholders() {
        let vars = recipient_vars(&recruiter(), &sender());
        let out = render_template("Hi {{first_name}}, about {{ company }} — {{sender_name}}", &vars);
        assert_eq!(out, "Hi Priya, about Globex — Sam");
    }

    #[test]
    fn test_unknown_placeholders_are_left_verbatim() {
        let vars = recipient_vars(&recruiter(), &sender());
        assert_eq!(render_template("{{ salary }}", &vars), "{{ salary }}");
    }

    #[test]
    fn test_missing_optional_fields_render_empty() {
        let vars = recipient_vars(&recruiter(), &sender());
        assert_eq!(render_template("[{{title}}]", &vars), "[]");
    }

    #[test]
    fn test_text_to_html_escapes_and_breaks_lines() {
        assert_eq!(text_to_html("a < b\r\nthanks"), "a &lt; b<br>\nthanks");
    }
}
