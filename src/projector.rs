//! Manages projectors
pub mod rsvp;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::error::ProjectionError;
use crate::source::events::RawEvent;

/// Flat row persisted for every accepted event
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    /// calendar date, `YYYYMMDD`
    pub date: String,
    pub event_id: String,
    pub group_id: String,
    pub member_id: String,
}

/// Projector reduces a decoded stream event into a [`Record`]
pub trait Projector {
    fn get_name(&self) -> String;
    fn project(&self, event: &RawEvent) -> Result<Record, ProjectionError>;
}

/// Creates projector of specified name.
/// If you add your own projectors, register them here
pub fn get_projector(
    name: &str,
    projector_settings: Option<toml::Value>,
) -> Result<Arc<dyn Projector + Send + Sync>> {
    match name {
        "rsvp" => match projector_settings {
            Some(s) => Ok(Arc::new(rsvp::new(s.try_into()?)?)),
            None => Ok(Arc::new(rsvp::new(rsvp::Settings::default())?)),
        },
        _ => Err(anyhow!("unknown projector {}", name)),
    }
}
