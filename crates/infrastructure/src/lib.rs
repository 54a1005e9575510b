//! Warden DNS Infrastructure Layer
pub mod dns;
pub mod filters;
pub mod jobs;
