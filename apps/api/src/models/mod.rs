pub mod outreach;
pub mod payment;
pub mod profile;
pub mod recruiter;
pub mod resume;
pub mod tracking;
