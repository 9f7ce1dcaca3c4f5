//! Locating or creating the running and walking clips for a rigged model.
//!
//! Resolution runs in three steps and stops as soon as one yields anything:
//!
//! 1. Typed decode of the `basic_animations` block the rigging job may
//!    attach, preferring skeleton-only (armature) variants.
//! 2. A recursive scan of the whole payload for asset URLs whose key
//!    names a locomotion clip (see [`classify_candidate`]).
//! 3. Two new animation jobs against the rig, polled concurrently.
//!
//! An empty [`AnimationUrls`] is a valid result.

use std::sync::Arc;

use rigforge_core::artifact::{AnimationKind, AnimationUrls, ASSET_EXTENSION};
use rigforge_core::stage::TaskHandle;
use rigforge_core::submission::StageInput;
use rigforge_meshy::messages::{BasicAnimations, RiggingResult};
use rigforge_meshy::GenerationService;
use serde::Deserialize;
use serde_json::Value;

use crate::observer::StageObserver;
use crate::polling::{poll_task, PollConfig, PollOutcome};

/// Action library id of the running clip.
pub const RUNNING_ACTION_ID: u32 = 14;
/// Action library id of the walking clip.
pub const WALKING_ACTION_ID: u32 = 30;

/// Settings for step 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationJobConfig {
    pub running_action_id: u32,
    pub walking_action_id: u32,
    pub poll: PollConfig,
}

impl Default for AnimationJobConfig {
    fn default() -> Self {
        Self {
            running_action_id: RUNNING_ACTION_ID,
            walking_action_id: WALKING_ACTION_ID,
            poll: PollConfig::default(),
        }
    }
}

impl AnimationJobConfig {
    fn action_id(&self, kind: AnimationKind) -> u32 {
        match kind {
            AnimationKind::Running => self.running_action_id,
            AnimationKind::Walking => self.walking_action_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Step 1: typed decode
// ---------------------------------------------------------------------------

/// Clips attached directly to a rigging payload, either under `result` or
/// at the top level.
pub fn embedded_animations(payload: &Value) -> AnimationUrls {
    let from_result = payload
        .get("result")
        .and_then(|r| RiggingResult::deserialize(r).ok())
        .and_then(|r| r.basic_animations);
    let from_top = || {
        payload
            .get("basic_animations")
            .and_then(|b| BasicAnimations::deserialize(b).ok())
    };

    let Some(basic) = from_result.or_else(from_top) else {
        return AnimationUrls::default();
    };

    let pick = |armature: Option<String>, full: Option<String>| {
        armature
            .filter(|u| !u.trim().is_empty())
            .or(full.filter(|u| !u.trim().is_empty()))
    };

    AnimationUrls {
        running: pick(basic.running_armature_glb_url, basic.running_glb_url),
        walking: pick(basic.walking_armature_glb_url, basic.walking_glb_url),
    }
}

// ---------------------------------------------------------------------------
// Step 2: heuristic scan
// ---------------------------------------------------------------------------

/// Decide whether `value`, found under `key`, is a locomotion clip URL.
///
/// The URL path (ignoring any query string or fragment) must end in the
/// asset extension. A key naming exactly one of run/walk decides the
/// category; a key naming both is ambiguous. A key that only mentions
/// "anim" is classified by the file name instead.
pub fn classify_candidate(key: &str, value: &str) -> Option<AnimationKind> {
    let path = value.split(['?', '#']).next().unwrap_or_default().trim();
    if !path.to_ascii_lowercase().ends_with(ASSET_EXTENSION) {
        return None;
    }

    let key = key.to_ascii_lowercase();
    if let Some(kind) = run_or_walk(&key) {
        return Some(kind);
    }
    if key.contains("run") || key.contains("walk") || !key.contains("anim") {
        return None;
    }

    let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    run_or_walk(&file_name)
}

fn run_or_walk(text: &str) -> Option<AnimationKind> {
    match (text.contains("run"), text.contains("walk")) {
        (true, false) => Some(AnimationKind::Running),
        (false, true) => Some(AnimationKind::Walking),
        _ => None,
    }
}

/// Walk the whole payload and collect the first match per category.
pub fn scan_for_animation_urls(payload: &Value) -> AnimationUrls {
    let mut found = AnimationUrls::default();
    scan_value("", payload, &mut found);
    found
}

fn scan_value(key: &str, value: &Value, found: &mut AnimationUrls) {
    if found.is_complete() {
        return;
    }
    match value {
        Value::String(s) => {
            if let Some(kind) = classify_candidate(key, s) {
                found.fill(kind, s.clone());
            }
        }
        // Array elements are judged by the key that holds the array.
        Value::Array(items) => {
            for item in items {
                scan_value(key, item, found);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                scan_value(k, v, found);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Produces the animation set for a rigged model.
pub struct AnimationResolver {
    service: Arc<dyn GenerationService>,
    config: AnimationJobConfig,
}

impl AnimationResolver {
    pub fn new(service: Arc<dyn GenerationService>, config: AnimationJobConfig) -> Self {
        Self { service, config }
    }

    /// Resolve clips for the rig produced by `rig_task_id`, whose final
    /// status payload is `payload`.
    pub async fn resolve(
        &self,
        rig_task_id: &str,
        payload: &Value,
        observer: &dyn StageObserver,
    ) -> AnimationUrls {
        let embedded = embedded_animations(payload);
        if !embedded.is_empty() {
            tracing::debug!(rig_task_id, "Using animations attached to the rig");
            return embedded;
        }

        let scanned = scan_for_animation_urls(payload);
        if !scanned.is_empty() {
            tracing::debug!(rig_task_id, "Found animations by scanning the rig payload");
            return scanned;
        }

        tracing::info!(rig_task_id, "No animations on the rig, requesting new clips");
        let (running, walking) = tokio::join!(
            self.create_clip(rig_task_id, AnimationKind::Running, observer),
            self.create_clip(rig_task_id, AnimationKind::Walking, observer),
        );

        AnimationUrls { running, walking }
    }

    /// Submit and poll one animation job. Any failure yields `None`.
    async fn create_clip(
        &self,
        rig_task_id: &str,
        kind: AnimationKind,
        observer: &dyn StageObserver,
    ) -> Option<String> {
        let input = StageInput::Animation {
            rig_task_id: rig_task_id.to_string(),
            action_id: self.config.action_id(kind),
        };

        let handle: TaskHandle = match self.service.submit(&input).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    rig_task_id,
                    clip = kind.as_str(),
                    error = %e,
                    "Animation job rejected",
                );
                return None;
            }
        };
        observer.submitted(&handle);

        match poll_task(self.service.as_ref(), &handle, &self.config.poll, observer).await {
            PollOutcome::Succeeded { result_url, .. } => Some(result_url),
            outcome => {
                tracing::warn!(
                    rig_task_id,
                    clip = kind.as_str(),
                    task_id = %handle.remote_task_id,
                    reason = %outcome.failure_reason().unwrap_or_default(),
                    "Animation job did not produce a clip",
                );
                None
            }
        }
    }
}
