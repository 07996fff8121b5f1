//! Integration tests for the segue engine.
//!
//! Scenes carry a `SetPort` stamp writing their scene id into the event's
//! output port, so tests can observe which patch handled each event. The
//! loopback backend drives cycles deterministically without hardware.

use std::sync::Arc;
use std::time::Duration;

use segue::units::{GenerateCtrl, Pass, SetChannel, SetPort, Transpose};
use segue::{
    EventKind, LoopbackBackend, MidiEvent, Patch, Scene, SegueEngine, SegueEngineBuilder,
};

const NUM_PORTS: usize = 16;

/// A scene whose patch stamps its id into the output port.
fn stamped(id: i32) -> Scene {
    Scene::new(Patch::unit(SetPort::new(id)))
}

fn engine_with_scenes(ids: &[i32]) -> (SegueEngine, Arc<LoopbackBackend>) {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let mut builder = SegueEngine::builder().backend(backend.clone());
    for &id in ids {
        builder = builder.scene(id, stamped(id));
    }
    let engine = builder.build().unwrap();
    (engine, backend)
}

/// Queue one event, run one cycle, return what came out.
fn feed(backend: &LoopbackBackend, ev: MidiEvent) -> Vec<MidiEvent> {
    backend.push_input(ev);
    backend.drive_cycle();
    backend.take_outputs()
}

// ---------------------------------------------------------------------------
// 1. Pinning
// ---------------------------------------------------------------------------

/// A note off routes through the patch that handled its note on, even after
/// the active scene changed in between.
#[test]
fn test_note_off_pinned_across_scene_switch() {
    let (engine, backend) = engine_with_scenes(&[1, 2]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 1);

    engine.switch_scene(2, -1);

    let out = feed(&backend, MidiEvent::note_off(0, 0, 60, 0));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 1, "note off must follow its note on's patch");

    // The pin is consumed: the same note off again uses the current scene.
    let out = feed(&backend, MidiEvent::note_off(0, 0, 60, 0));
    assert_eq!(out[0].port, 2);
}

/// An unmatched note off falls through to the current scene's patch.
#[test]
fn test_unmatched_note_off_uses_current_scene() {
    let (engine, backend) = engine_with_scenes(&[1, 2]);
    engine.start(2, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::note_off(0, 0, 60, 0));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 2);
}

/// Sustain press/release pairs pin by (channel, port), like notes do.
#[test]
fn test_sustain_release_pinned_across_scene_switch() {
    let (engine, backend) = engine_with_scenes(&[1, 2]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::ctrl(0, 0, 64, 127));
    assert_eq!(out[0].port, 1);

    engine.switch_scene(2, -1);

    // Release on the pressed (channel, port) follows scene 1.
    let out = feed(&backend, MidiEvent::ctrl(0, 0, 64, 0));
    assert_eq!(out[0].port, 1);

    // A release on a different channel was never pinned.
    let out = feed(&backend, MidiEvent::ctrl(0, 3, 64, 0));
    assert_eq!(out[0].port, 2);
}

// ---------------------------------------------------------------------------
// 2. Scene switching
// ---------------------------------------------------------------------------

/// Exit rite of the old subscene, then init rite of the new one, then the
/// input's own output.
#[test]
fn test_exit_then_init_then_passthrough() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(
            1,
            Scene::new(Patch::unit(Pass)).with_exit(Patch::unit(GenerateCtrl::new(0, 120, 0))),
        )
        .scene(
            2,
            Scene::new(Patch::unit(Pass)).with_init(Patch::unit(GenerateCtrl::new(0, 121, 0))),
        )
        .build()
        .unwrap();

    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(2, -1);
    let out = feed(&backend, MidiEvent::note_on(0, 0, 60, 100));

    assert_eq!(out.len(), 3);
    assert_eq!(
        out[0].kind,
        EventKind::Ctrl {
            param: 120,
            value: 0
        }
    );
    assert_eq!(
        out[1].kind,
        EventKind::Ctrl {
            param: 121,
            value: 0
        }
    );
    assert!(out[2].is_note_on());
}

/// A requested switch is visible by the end of the first subsequent cycle.
#[test]
fn test_switch_observed_on_next_cycle() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let mut builder = SegueEngine::builder().backend(backend.clone());
    for id in [1, 2] {
        builder = builder.scene(id, stamped(id));
        builder = builder.scene(id, stamped(id + 10));
    }
    let engine = builder.build().unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(2, 1);
    feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(engine.current_scene(), 2);
    assert_eq!(engine.current_subscene(), 1);

    // Subscene-only switch keeps the scene axis.
    engine.switch_scene(-1, 0);
    feed(&backend, MidiEvent::note_on(0, 0, 61, 100));
    assert_eq!(engine.current_scene(), 2);
    assert_eq!(engine.current_subscene(), 0);
}

/// Switching to an unknown (scene, subscene) changes nothing and clears
/// the pending request.
#[test]
fn test_invalid_switch_is_a_noop() {
    let (engine, backend) = engine_with_scenes(&[1, 2]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(7, -1);
    let out = feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(engine.current_scene(), 1);
    assert_eq!(out[0].port, 1);

    engine.switch_scene(1, 5);
    feed(&backend, MidiEvent::note_on(0, 0, 61, 100));
    assert_eq!(engine.current_scene(), 1);
    assert_eq!(engine.current_subscene(), 0);
}

/// `initial_scene == -1` starts in the smallest registered scene id.
#[test]
fn test_initial_scene_defaults_to_smallest_id() {
    let (engine, _backend) = engine_with_scenes(&[5, 2, 9]);
    engine.start(-1, -1).unwrap();
    assert_eq!(engine.current_scene(), 2);
    assert_eq!(engine.current_subscene(), 0);
}

/// Starting without scenes is programmer error.
#[test]
#[should_panic(expected = "no scenes registered")]
fn test_start_without_scenes_panics() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngineBuilder::default()
        .backend(backend)
        .build()
        .unwrap();
    let _ = engine.start(-1, -1);
}

/// `run_async` applies a pending switch immediately, without waiting for
/// the next cycle, and emits the rite output.
#[test]
fn test_run_async_applies_pending_switch() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, stamped(1))
        .scene(
            2,
            Scene::new(Patch::unit(SetPort::new(2)))
                .with_init(Patch::unit(GenerateCtrl::new(0, 121, 0))),
        )
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(2, -1);
    engine.run_async();

    assert_eq!(engine.current_scene(), 2);
    let out = backend.take_outputs();
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].kind,
        EventKind::Ctrl {
            param: 121,
            value: 0
        }
    );
}

/// Deferred work runs on the worker thread and applies its switch.
#[test]
fn test_request_async_switches_scene() {
    let (engine, backend) = engine_with_scenes(&[1, 2]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    assert!(engine.request_async(|handle| {
        handle.switch_scene(2, -1);
    }));

    let mut switched = false;
    for _ in 0..200 {
        if engine.current_scene() == 2 {
            switched = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(switched, "deferred switch never took effect");
}

// ---------------------------------------------------------------------------
// 3. Scene-switch hook
// ---------------------------------------------------------------------------

/// The hook may remap a pending request before it is applied.
#[test]
fn test_hook_remaps_switch_target() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, stamped(1))
        .scene(2, stamped(2))
        .scene(3, stamped(3))
        .hook(|scene: i32, subscene: i32| {
            // Requests for scene 2 land in scene 3.
            if scene == 2 {
                (3, subscene)
            } else {
                (scene, subscene)
            }
        })
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(2, -1);
    feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(engine.current_scene(), 3);
}

/// The hook may veto a switch by returning `(-1, -1)`.
#[test]
fn test_hook_vetoes_switch() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, stamped(1))
        .scene(2, stamped(2))
        .hook(|_scene: i32, _subscene: i32| (-1, -1))
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    engine.switch_scene(2, -1);
    let out = feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(engine.current_scene(), 1);
    assert_eq!(out[0].port, 1);
}

// ---------------------------------------------------------------------------
// 4. Sanitize
// ---------------------------------------------------------------------------

/// Out-of-range pitch bend values are clamped, not dropped.
#[test]
fn test_sanitize_clamps_pitch_bend() {
    let (engine, backend) = engine_with_scenes(&[1]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::pitch_bend(0, 0, 20000));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, EventKind::PitchBend { value: 8191 });
}

/// Events with an invalid output port vanish silently.
#[test]
fn test_sanitize_drops_invalid_port() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, Scene::new(Patch::unit(Pass)))
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::note_on(-1, 0, 60, 100));
    assert!(out.is_empty());
}

/// Every event the engine emits has passed sanitize's predicates.
#[test]
fn test_all_output_is_sanitized() {
    let (engine, backend) = engine_with_scenes(&[1]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let inputs = vec![
        MidiEvent::note_on(0, 0, 60, 300),
        MidiEvent::note_on(0, 0, 200, 100),
        MidiEvent::ctrl(0, 0, 64, 127),
        MidiEvent::ctrl(0, 0, 200, 5),
        MidiEvent::pitch_bend(0, 0, -20000),
        MidiEvent::program(0, 0, 200),
        MidiEvent::note_on(0, 22, 60, 100),
    ];
    for ev in inputs {
        backend.push_input(ev);
    }
    backend.drive_cycle();

    for ev in backend.take_outputs() {
        assert!((0..16).contains(&ev.channel));
        match ev.kind {
            EventKind::NoteOn { note, velocity } | EventKind::NoteOff { note, velocity } => {
                assert!((0..=127).contains(&note));
                assert!((0..=127).contains(&velocity));
            }
            EventKind::Ctrl { param, value } => {
                assert!((0..=127).contains(&param));
                assert!((0..=127).contains(&value));
            }
            EventKind::PitchBend { value } => {
                assert!((-8192..=8191).contains(&value));
            }
            EventKind::Program { value } => assert!((0..=127).contains(&value)),
            EventKind::Dummy => panic!("dummy event leaked to output"),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// 5. Processing wrappers
// ---------------------------------------------------------------------------

/// The ctrl patch observes every event; pre and post wrap the matched
/// patch; rites get post but not ctrl/pre.
#[test]
fn test_ctrl_pre_post_wrappers() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, Scene::new(Patch::unit(Pass)))
        .scene(
            2,
            Scene::new(Patch::unit(Pass)).with_init(Patch::unit(GenerateCtrl::new(0, 121, 0))),
        )
        .processing(
            Some(Patch::unit(GenerateCtrl::new(0, 99, 1))),
            Some(Patch::unit(Transpose::new(12))),
            Some(Patch::unit(SetChannel::new(5))),
        )
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    let out = feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(out.len(), 2);
    // Ctrl output travels ahead of the main copy and skips pre/post.
    assert_eq!(out[0].kind, EventKind::Ctrl { param: 99, value: 1 });
    assert_eq!(out[0].channel, 0);
    // Main copy: pre transposed, post re-channeled.
    assert_eq!(out[1].note(), Some(72));
    assert_eq!(out[1].channel, 5);

    // An init rite is wrapped by post but not by ctrl/pre.
    engine.switch_scene(2, -1);
    let out = feed(&backend, MidiEvent::note_off(0, 0, 60, 0));
    assert_eq!(
        out[0].kind,
        EventKind::Ctrl {
            param: 121,
            value: 0
        }
    );
    assert_eq!(out[0].channel, 5, "post patch applies to rites");
}

// ---------------------------------------------------------------------------
// 6. Synchronous operations
// ---------------------------------------------------------------------------

/// `process_event` evaluates offline and adopts scene 0's first subscene
/// when nothing is active yet.
#[test]
fn test_process_event_standalone() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(0, stamped(3))
        .build()
        .unwrap();

    // No start() call; the engine adopts scene 0 on demand.
    let out = engine.process_event(&MidiEvent::note_on(0, 0, 60, 100));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 3);

    // Nothing was emitted through the backend.
    assert!(backend.take_outputs().is_empty());
}

/// `process_event` output passes sanitize.
#[test]
fn test_process_event_sanitizes() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend)
        .scene(0, Scene::new(Patch::unit(Pass)))
        .build()
        .unwrap();

    let out = engine.process_event(&MidiEvent::note_on(0, 0, 60, 200));
    assert_eq!(out[0].velocity(), Some(127));

    let out = engine.process_event(&MidiEvent::note_on(-1, 0, 60, 100));
    assert!(out.is_empty());
}

/// `output_event` bypasses the pipeline entirely.
#[test]
fn test_output_event_bypasses_pipeline() {
    let (engine, backend) = engine_with_scenes(&[1]);
    engine.start(1, -1).unwrap();
    backend.take_outputs();

    // Port 9 would be stamped away by the scene patch; the bypass keeps it.
    engine.output_event(&MidiEvent::note_on(9, 0, 60, 100));
    let out = backend.take_outputs();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 9);
}

// ---------------------------------------------------------------------------
// 7. Instrumentation and time
// ---------------------------------------------------------------------------

#[test]
fn test_cycle_stats_opt_in() {
    let backend = Arc::new(LoopbackBackend::new(NUM_PORTS));
    let engine = SegueEngine::builder()
        .backend(backend.clone())
        .scene(1, stamped(1))
        .instrumentation()
        .build()
        .unwrap();
    engine.start(1, -1).unwrap();

    feed(&backend, MidiEvent::note_on(0, 0, 60, 100));
    feed(&backend, MidiEvent::note_off(0, 0, 60, 0));

    let metrics = engine.stats().metrics();
    assert_eq!(metrics.cycles, 2);
    assert!(metrics.max >= metrics.average);
}

#[test]
fn test_time_is_monotonic() {
    let (engine, _backend) = engine_with_scenes(&[1]);
    let t1 = engine.time();
    let t2 = engine.time();
    assert!(t1 >= 0.0);
    assert!(t2 >= t1);
}
