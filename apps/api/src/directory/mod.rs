//! Recruiter directory: listings annotated for the viewing user's tier and cooldowns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::recruiter::{DomainRow, RecruiterRow, SubdomainRow};
use crate::tiers::{can_access_recruiter, Tier};

pub mod handlers;

#[derive(Debug, Clone, Serialize)]
pub struct RecruiterListing {
    pub id: Uuid,
    pub name: String,
    /// Withheld while the recruiter is above the viewer's tier.
    pub email: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub tier: String,
    pub domain_id: Option<Uuid>,
    pub subdomain_id: Option<Uuid>,
    pub locked: bool,
    pub blocked_until: Option<DateTime<Utc>>,
}

pub fn annotate(
    recruiters: Vec<RecruiterRow>,
    user_tier: Tier,
    blocks: &HashMap<Uuid, DateTime<Utc>>,
) -> Vec<RecruiterListing> {
    recruiters
        .into_iter()
        .map(|r| {
            let locked = !can_access_recruiter(user_tier.as_str(), &r.tier);
            RecruiterListing {
                id: r.id,
                name: r.name,
                email: (!locked).then_some(r.email),
                company: r.company,
                title: r.title,
                linkedin_url: if locked { None } else { r.linkedin_url },
                tier: r.tier,
                domain_id: r.domain_id,
                subdomain_id: r.subdomain_id,
                locked,
                blocked_until: blocks.get(&r.id).copied(),
            }
        })
        .collect()
}

/// Escapes `%`, `_` and `\` so user input matches literally inside an ILIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Serialize)]
pub struct DomainWithSubdomains {
    pub id: Uuid,
    pub name: String,
    pub subdomains: Vec<SubdomainRow>,
}

pub fn group_domains(
    domains: Vec<DomainRow>,
    subdomains: Vec<SubdomainRow>,
) -> Vec<DomainWithSubdomains> {
    let mut by_domain: HashMap<Uuid, Vec<SubdomainRow>> = HashMap::new();
    for sub in subdomains {
        by_domain.entry(sub.domain_id).or_default().push(sub);
    }
    domains
        .into_iter()
        .map(|d| DomainWithSubdomains {
            subdomains: by_domain.remove(&d.id).unwrap_or_default(),
            id: d.id,
            name: d.name,
        })
        .collect()
}
