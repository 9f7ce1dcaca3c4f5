//! End-to-end chain runs against a scripted service and in-memory gallery.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use rigforge_core::gallery::{GalleryStore, MemoryGalleryStore};
use rigforge_core::stage::{SessionState, Stage};
use rigforge_core::submission::StageInput;
use rigforge_events::{EventBus, GenerationEvent, GenerationEventKind};
use rigforge_pipeline::{
    AnimationJobConfig, GenerationSession, Orchestrator, OrchestratorConfig, PollConfig,
};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const MESH_URL: &str = "https://assets/mesh.glb";
const TEX_URL: &str = "https://assets/tex.glb";
const RIG_URL: &str = "https://assets/rig.glb";
const RUN_URL: &str = "https://assets/run_armature.glb";

struct Harness {
    service: Arc<ScriptedService>,
    gallery: Arc<MemoryGalleryStore>,
    orchestrator: Orchestrator,
    events: broadcast::Receiver<GenerationEvent>,
}

fn harness(service: ScriptedService) -> Harness {
    let service = Arc::new(service);
    let gallery = Arc::new(MemoryGalleryStore::new());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();

    let poll = PollConfig {
        initial_delay: Duration::from_secs(2),
        interval: Duration::from_secs(5),
        max_attempts: 5,
    };
    let orchestrator = Orchestrator::new(
        service.clone(),
        gallery.clone(),
        bus,
        OrchestratorConfig {
            poll,
            rig_height_meters: 1.7,
            animation: AnimationJobConfig {
                poll,
                ..AnimationJobConfig::default()
            },
            gallery_capacity: 20,
        },
    );

    Harness {
        service,
        gallery,
        orchestrator,
        events,
    }
}

/// Standard task ids for the three chain stages.
fn chain_service() -> ScriptedService {
    let service = ScriptedService::new();
    service
        .on_submit("mesh", "mesh-1")
        .on_submit("retexture", "tex-1")
        .on_submit("rigging", "rig-1");
    service
}

fn rig_payload_with_running_clip() -> serde_json::Value {
    json!({
        "id": "rig-1",
        "status": "SUCCEEDED",
        "result": {
            "rigged_character_glb_url": RIG_URL,
            "basic_animations": {"running_armature_glb_url": RUN_URL}
        }
    })
}

async fn run(h: &Harness) -> GenerationSession {
    let session = h.orchestrator.new_session(params("a knight in armor"));
    h.orchestrator
        .run(session, CancellationToken::new())
        .await
        .expect("session should not hit an invalid transition")
}

fn drain(rx: &mut broadcast::Receiver<GenerationEvent>) -> Vec<GenerationEventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind);
    }
    kinds
}

// ---------------------------------------------------------------------------
// Test: a fully successful chain ends on the rig artifact
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn successful_chain_finishes_on_rig_with_animations() {
    let service = chain_service();
    service
        .script("mesh-1", vec![in_progress(), succeeded(MESH_URL)])
        .script("tex-1", vec![succeeded(TEX_URL)])
        .script(
            "rig-1",
            vec![succeeded_with_payload(RIG_URL, rig_payload_with_running_clip())],
        );
    let mut h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.state, SessionState::Done);
    assert_eq!(session.final_model_url.as_deref(), Some(RIG_URL));
    assert_eq!(session.animation_urls.running.as_deref(), Some(RUN_URL));
    assert!(!session.is_degraded());

    // Strictly sequential, no animation jobs since the rig carried a clip.
    assert_eq!(h.service.submission_keys(), vec!["mesh", "retexture", "rigging"]);
    assert!(matches!(
        &h.service.submissions()[1],
        StageInput::Retexture { input_task_id, style_prompt }
            if input_task_id == "mesh-1" && style_prompt == "a knight in armor"
    ));

    let interim: Vec<(Stage, String)> = drain(&mut h.events)
        .into_iter()
        .filter_map(|kind| match kind {
            GenerationEventKind::InterimArtifact { stage, model_url } => Some((stage, model_url)),
            _ => None,
        })
        .collect();
    assert_eq!(
        interim,
        vec![
            (Stage::MeshGeneration, MESH_URL.to_string()),
            (Stage::Retexture, TEX_URL.to_string()),
            (Stage::Rigging, RIG_URL.to_string()),
        ]
    );

    let gallery = h.gallery.list().await.unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery[0].model_url, RIG_URL);
    assert_eq!(gallery[0].prompt, "a knight in armor");
    assert_eq!(gallery[0].animation_urls.running.as_deref(), Some(RUN_URL));
}

// ---------------------------------------------------------------------------
// Test: retexture failure falls back to the mesh
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn retexture_failure_keeps_mesh_as_final_when_rig_also_fails() {
    let service = chain_service();
    service
        .script("mesh-1", vec![succeeded(MESH_URL)])
        .script("tex-1", vec![failed("texture backend error")])
        .script("rig-1", vec![failed("unriggable mesh")]);
    let h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.state, SessionState::Done);
    assert_eq!(session.final_model_url.as_deref(), Some(MESH_URL));
    assert!(session.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn retexture_timeout_rigs_the_mesh_instead() {
    let service = chain_service();
    service
        .script("mesh-1", vec![succeeded(MESH_URL)])
        .script("tex-1", vec![in_progress()])
        .script(
            "rig-1",
            vec![succeeded_with_payload(RIG_URL, rig_payload_with_running_clip())],
        );
    let h = harness(service);

    let session = run(&h).await;

    assert!(matches!(
        &h.service.submissions()[2],
        StageInput::Rigging { input_task_id, .. } if input_task_id == "mesh-1"
    ));
    assert_eq!(h.service.check_count("tex-1"), 5);
    assert_eq!(session.final_model_url.as_deref(), Some(RIG_URL));
    assert!(session.is_degraded());
}

// ---------------------------------------------------------------------------
// Test: rigging failure finishes on the texture without animations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rig_failure_finishes_on_texture_without_animations() {
    let service = chain_service();
    service
        .script("mesh-1", vec![succeeded(MESH_URL)])
        .script("tex-1", vec![succeeded(TEX_URL)])
        .script("rig-1", vec![failed("rigging failed")]);
    let mut h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.state, SessionState::Done);
    assert_eq!(session.final_model_url.as_deref(), Some(TEX_URL));
    assert!(session.animation_urls.is_empty());
    assert_eq!(h.service.submission_keys(), vec!["mesh", "retexture", "rigging"]);

    let completed = drain(&mut h.events)
        .into_iter()
        .find(|k| matches!(k, GenerationEventKind::Completed { .. }));
    match completed {
        Some(GenerationEventKind::Completed {
            model_url,
            degraded,
            message,
            ..
        }) => {
            assert_eq!(model_url, TEX_URL);
            assert!(degraded);
            assert!(message.contains("rigging failed"));
            assert!(message.contains("retexture result"));
        }
        other => panic!("expected a Completed event, got {other:?}"),
    }

    assert_eq!(h.gallery.list().await.unwrap()[0].model_url, TEX_URL);
}

// ---------------------------------------------------------------------------
// Test: mesh failure aborts without a gallery entry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn mesh_failure_fails_session() {
    let service = chain_service();
    service.script("mesh-1", vec![failed("prompt rejected")]);
    let mut h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.state, SessionState::Failed);
    assert!(session.final_model_url.is_none());
    assert_eq!(h.service.submission_keys(), vec!["mesh"]);
    assert!(h.gallery.list().await.unwrap().is_empty());

    let events = drain(&mut h.events);
    assert!(matches!(
        events.last(),
        Some(GenerationEventKind::Failed { message }) if message.contains("mesh generation failed")
    ));
}

#[tokio::test(start_paused = true)]
async fn mesh_submission_rejection_fails_session() {
    let service = ScriptedService::new();
    service.reject_submit("mesh", 402);
    let h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.state, SessionState::Failed);
    assert!(h.gallery.list().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: animation jobs are created when the rig carries none
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn bare_rig_triggers_animation_jobs() {
    let service = chain_service();
    service
        .on_submit("animation:14", "run-job")
        .on_submit("animation:30", "walk-job")
        .script("mesh-1", vec![succeeded(MESH_URL)])
        .script("tex-1", vec![succeeded(TEX_URL)])
        .script("rig-1", vec![succeeded(RIG_URL)])
        .script("run-job", vec![succeeded("https://assets/run.glb")])
        .script("walk-job", vec![succeeded("https://assets/walk.glb")]);
    let h = harness(service);

    let session = run(&h).await;

    assert_eq!(session.final_model_url.as_deref(), Some(RIG_URL));
    assert!(session.animation_urls.is_complete());
    assert_eq!(h.service.submissions().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: an abandoned session starts no new jobs and records nothing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abandoned_session_submits_nothing() {
    let h = harness(chain_service());
    let abandon = CancellationToken::new();
    abandon.cancel();

    let session = h
        .orchestrator
        .run(h.orchestrator.new_session(params("a dragon")), abandon)
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::MeshPending);
    assert!(h.service.submissions().is_empty());
    assert!(h.gallery.list().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: abandoning during a poll lets the poll finish but starts nothing after it
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abandoned_during_retexture_poll_stops_before_rigging() {
    let service = chain_service();
    service
        .script("mesh-1", vec![succeeded(MESH_URL)])
        .script(
            "tex-1",
            vec![in_progress(), in_progress(), succeeded(TEX_URL)],
        )
        .script(
            "rig-1",
            vec![succeeded_with_payload(RIG_URL, rig_payload_with_running_clip())],
        );
    let mut h = harness(service);

    let abandon = CancellationToken::new();
    let cancel_mid_poll = {
        let service = Arc::clone(&h.service);
        let abandon = abandon.clone();
        async move {
            while service.check_count("tex-1") == 0 {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            abandon.cancel();
        }
    };

    let session = h.orchestrator.new_session(params("a wizard"));
    let (result, ()) = tokio::join!(h.orchestrator.run(session, abandon), cancel_mid_poll);
    let session = result.unwrap();

    assert_eq!(h.service.check_count("tex-1"), 3);
    assert_eq!(h.service.submission_keys(), vec!["mesh", "retexture"]);
    assert_eq!(session.state, SessionState::RigPending);

    let kinds = drain(&mut h.events);
    assert!(!kinds
        .iter()
        .any(|k| matches!(k, GenerationEventKind::Completed { .. })));
    assert!(!kinds
        .iter()
        .any(|k| matches!(k, GenerationEventKind::Failed { .. })));
    assert!(h.gallery.list().await.unwrap().is_empty());
}
