//! Data Preloader
//!
//! Warms the cache with what a user is about to need, keyed by role at
//! sign-in and by route before navigation. Every preload is fire-and-forget.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::services::Services;

/// Who is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Responder,
    Admin,
}

impl FromStr for UserRole {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(UserRole::Patient),
            "responder" => Ok(UserRole::Responder),
            "admin" => Ok(UserRole::Admin),
            other => Err(CacheError::InvalidRequest(format!("unknown role '{}'", other))),
        }
    }
}

/// A preloadable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Hospitals,
    Blockades,
    Conversations,
    ActiveIncidents,
    AllIncidents,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Hospitals => "hospitals",
            Resource::Blockades => "blockades",
            Resource::Conversations => "conversations",
            Resource::ActiveIncidents => "active_incidents",
            Resource::AllIncidents => "all_incidents",
        };
        f.write_str(name)
    }
}

/// What a preload pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadSummary {
    /// Resources a fetch was started for
    pub started: Vec<Resource>,
    /// Resources already fresh or being fetched
    pub skipped: Vec<Resource>,
}

/// Resources every session of `role` needs. Hospitals are always included.
pub fn resources_for_role(role: Option<UserRole>) -> Vec<Resource> {
    let mut resources = vec![Resource::Hospitals];
    if matches!(role, Some(UserRole::Responder | UserRole::Admin)) {
        resources.push(Resource::AllIncidents);
        resources.push(Resource::Blockades);
    }
    if matches!(role, Some(UserRole::Patient | UserRole::Responder)) {
        resources.push(Resource::Conversations);
    }
    resources
}

/// Resources the page at `route` renders first.
pub fn resources_for_route(route: &str) -> Vec<Resource> {
    let mut resources = Vec::new();
    let mut add = |resource: Resource| {
        if !resources.contains(&resource) {
            resources.push(resource);
        }
    };

    if route.contains("/responder/map") || route.contains("/pathfinding") {
        add(Resource::ActiveIncidents);
        add(Resource::Blockades);
        add(Resource::Hospitals);
    }
    if route.contains("/responder/messages") || route.contains("/patient/messages") {
        add(Resource::Conversations);
    }
    if route.contains("/response-mode") {
        add(Resource::Hospitals);
    }
    if route.contains("/admin/dashboard") {
        add(Resource::AllIncidents);
        add(Resource::Hospitals);
    }
    resources
}

// == Preloader ==
pub struct Preloader {
    services: Services,
    /// Summary of the sign-in preload; `Some` once it has run
    critical: Mutex<Option<PreloadSummary>>,
}

impl Preloader {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            critical: Mutex::new(None),
        }
    }

    /// Preloads what `role` needs. Runs once; later calls return the first
    /// run's summary unless `force` is set.
    pub fn preload_critical_data(&self, role: Option<UserRole>, force: bool) -> PreloadSummary {
        let mut critical = self.critical.lock();
        if !force {
            if let Some(summary) = critical.as_ref() {
                debug!("Critical data preload already ran");
                return summary.clone();
            }
        }

        let started_at = Instant::now();
        let summary = self.run(&resources_for_role(role));
        info!(
            role = ?role,
            started = summary.started.len(),
            skipped = summary.skipped.len(),
            elapsed_us = started_at.elapsed().as_micros() as u64,
            "Initiated critical data preload"
        );

        *critical = Some(summary.clone());
        summary
    }

    pub fn preload_for_route(&self, route: &str) -> PreloadSummary {
        let summary = self.run(&resources_for_route(route));
        debug!(route, started = summary.started.len(), "Route preload");
        summary
    }

    /// Forgets the sign-in preload, e.g. on logout.
    pub fn reset(&self) {
        *self.critical.lock() = None;
    }

    pub fn has_run(&self) -> bool {
        self.critical.lock().is_some()
    }

    fn run(&self, resources: &[Resource]) -> PreloadSummary {
        let mut summary = PreloadSummary::default();
        for &resource in resources {
            if self.preload(resource) {
                summary.started.push(resource);
            } else {
                summary.skipped.push(resource);
            }
        }
        summary
    }

    fn preload(&self, resource: Resource) -> bool {
        let services = &self.services;
        match resource {
            Resource::Hospitals => services.hospitals.preload(),
            Resource::Blockades => services.blockades.preload(),
            Resource::Conversations => services.chat.preload_conversations(),
            Resource::ActiveIncidents => services.incidents.preload(false),
            Resource::AllIncidents => services.incidents.preload(true),
        }
    }
}
