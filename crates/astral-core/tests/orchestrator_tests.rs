// Host-side tests for the motion orchestrator: registration, broadcast
// isolation, sections, scene events and the blessing wave.

use astral_core::*;
use std::cell::RefCell;
use std::rc::Rc;

fn state_at(time: f32) -> MotionState {
    MotionState {
        time,
        ..MotionState::default()
    }
}

fn spy() -> Rc<RefCell<Vec<MotionState>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn recording(log: &Rc<RefCell<Vec<MotionState>>>) -> impl FnMut(&MotionState) -> anyhow::Result<()> {
    let log = log.clone();
    move |s: &MotionState| {
        log.borrow_mut().push(*s);
        Ok(())
    }
}

#[test]
fn both_engines_receive_then_only_b_after_unregister() {
    let orch = create_orchestrator();
    let a = spy();
    let b = spy();
    orch.register_engine("a", recording(&a));
    orch.register_engine("b", recording(&b));

    let first = MotionState {
        time: 1.0,
        scroll_progress: 0.5,
        ..MotionState::default()
    };
    let report = orch.broadcast(first);
    assert_eq!(report.delivered, 2);
    assert_eq!(a.borrow().as_slice(), &[first]);
    assert_eq!(b.borrow().as_slice(), &[first]);

    assert!(orch.unregister_engine("a"));
    let second = MotionState {
        time: 2.0,
        ..first
    };
    orch.broadcast(second);
    assert_eq!(a.borrow().len(), 1);
    assert_eq!(b.borrow().len(), 2);
    assert_eq!(b.borrow()[1], second);
}

#[test]
fn unregistered_callback_is_never_invoked() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    orch.register_engine("gate", recording(&calls));
    orch.unregister_engine("gate");
    for i in 0..10 {
        orch.broadcast(state_at(i as f32));
    }
    assert!(calls.borrow().is_empty());
    assert_eq!(orch.engine_count(), 0);
}

#[test]
fn unregister_missing_key_is_noop() {
    let orch = MotionOrchestrator::new();
    assert!(!orch.unregister_engine("nothing"));
    assert!(!orch.unregister_engine("nothing"));
}

#[test]
fn reregistering_same_key_fires_once_last_writer_wins() {
    let orch = MotionOrchestrator::new();
    let old = spy();
    let new = spy();
    orch.register_engine("lotus", recording(&old));
    orch.register_engine("lotus", recording(&new));
    assert_eq!(orch.engine_count(), 1);

    let report = orch.broadcast(state_at(0.5));
    assert_eq!(report.delivered, 1);
    assert!(old.borrow().is_empty());
    assert_eq!(new.borrow().len(), 1);
}

#[test]
fn stale_handle_does_not_remove_newer_registration() {
    let orch = MotionOrchestrator::new();
    let first = orch.register_engine("ring", |_: &MotionState| Ok(()));
    let calls = spy();
    let second = orch.register_engine("ring", recording(&calls));

    assert!(!first.is_registered());
    assert!(second.is_registered());
    assert!(!first.unregister());
    assert!(orch.is_engine_registered("ring"));

    orch.broadcast(state_at(1.0));
    assert_eq!(calls.borrow().len(), 1);

    assert!(second.unregister());
    assert!(!orch.is_engine_registered("ring"));
}

#[test]
fn handle_unregister_stops_delivery() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    let handle = orch.register_engine("trail", recording(&calls));
    assert_eq!(handle.key(), "trail");
    orch.broadcast(state_at(0.0));
    assert!(handle.unregister());
    orch.broadcast(state_at(1.0));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn failing_callbacks_are_isolated() {
    let orch = MotionOrchestrator::new();
    let good = spy();
    orch.register_engine("err", |_: &MotionState| Err(anyhow::anyhow!("shader lost")));
    orch.register_engine("good", recording(&good));

    let report = orch.broadcast(state_at(1.0));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(good.borrow().len(), 1);

    // failures do not unregister; the next frame still runs everything
    let report = orch.broadcast(state_at(2.0));
    assert_eq!(report.failed, 1);
    assert_eq!(good.borrow().len(), 2);
    assert_eq!(orch.engine_count(), 2);
}

// wasm32 aborts on panic, so this only holds where panics unwind
#[cfg(panic = "unwind")]
#[test]
fn panicking_callbacks_are_isolated_when_unwinding() {
    let orch = MotionOrchestrator::new();
    let good = spy();
    orch.register_engine("panic", |_: &MotionState| -> anyhow::Result<()> {
        panic!("engine bug")
    });
    orch.register_engine("good", recording(&good));

    let report = orch.broadcast(state_at(1.0));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(good.borrow().len(), 1);
    assert_eq!(orch.engine_count(), 2);
}

#[test]
fn unregistering_during_broadcast_is_tolerated() {
    let orch = MotionOrchestrator::new();
    let b_calls = spy();
    let a_calls = spy();
    let orch_in_cb = orch.clone();
    let a_log = a_calls.clone();
    orch.register_engine("a", move |s: &MotionState| {
        a_log.borrow_mut().push(*s);
        orch_in_cb.unregister_engine("b");
        orch_in_cb.unregister_engine("a");
        Ok(())
    });
    orch.register_engine("b", recording(&b_calls));

    orch.broadcast(state_at(1.0));
    assert_eq!(a_calls.borrow().len(), 1);
    assert!(b_calls.borrow().len() <= 1);
    let b_after_first = b_calls.borrow().len();

    orch.broadcast(state_at(2.0));
    assert_eq!(a_calls.borrow().len(), 1);
    assert_eq!(b_calls.borrow().len(), b_after_first);
    assert_eq!(orch.engine_count(), 0);
}

#[test]
fn registration_during_broadcast_starts_next_frame() {
    let orch = MotionOrchestrator::new();
    let late = spy();
    let orch_in_cb = orch.clone();
    let late_in_cb = late.clone();
    orch.register_engine("spawner", move |_: &MotionState| {
        if !orch_in_cb.is_engine_registered("late") {
            orch_in_cb.register_engine("late", recording(&late_in_cb));
        }
        Ok(())
    });

    orch.broadcast(state_at(0.0));
    assert!(late.borrow().is_empty());
    orch.broadcast(state_at(1.0));
    assert_eq!(late.borrow().len(), 1);
}

#[test]
fn time_never_goes_backwards() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    orch.register_engine("t", recording(&calls));
    for t in [0.0, 1.0, 0.5, 2.0, f32::NAN, 1.5, 3.0] {
        orch.broadcast(state_at(t));
    }
    let times: Vec<f32> = calls.borrow().iter().map(|s| s.time).collect();
    assert_eq!(times, vec![0.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0]);
}

#[test]
fn nan_first_frame_starts_at_zero() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    orch.register_engine("t", recording(&calls));
    orch.broadcast(state_at(f32::NAN));
    orch.broadcast(state_at(0.25));
    let times: Vec<f32> = calls.borrow().iter().map(|s| s.time).collect();
    assert_eq!(times, vec![0.0, 0.25]);
}

#[test]
fn section_gated_engine_only_runs_while_active() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    orch.register_engine_in_section("chakra", "hero", recording(&calls));

    let report = orch.broadcast(state_at(0.0));
    assert_eq!(report.skipped, 1);
    assert!(calls.borrow().is_empty());

    assert!(orch.on_section_enter("hero"));
    assert!(!orch.on_section_enter("hero"));
    assert!(orch.is_section_active("hero"));
    orch.broadcast(state_at(1.0));
    assert_eq!(calls.borrow().len(), 1);

    assert!(orch.on_section_exit("hero"));
    assert!(!orch.on_section_exit("hero"));
    orch.broadcast(state_at(2.0));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn section_listeners_see_only_real_transitions() {
    let orch = MotionOrchestrator::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let handle = orch.subscribe_sections("layout", move |e: &SectionEvent| {
        sink.borrow_mut().push(e.clone());
    });

    orch.on_section_enter("gate");
    orch.on_section_enter("gate");
    orch.on_section_exit("gate");
    orch.on_section_exit("lotus");
    assert_eq!(
        events.borrow().as_slice(),
        &[
            SectionEvent::Enter("gate".into()),
            SectionEvent::Exit("gate".into())
        ]
    );
    assert_eq!(events.borrow()[0].section(), "gate");

    assert!(handle.unregister());
    orch.on_section_enter("gate");
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn scene_events_reach_every_handler_with_payload() {
    let orch = MotionOrchestrator::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    orch.register_scene_handler("lotus", move |e: &SceneEvent| {
        sink.borrow_mut().push(e.clone());
        Ok(())
    });
    orch.register_scene_handler("broken", |_: &SceneEvent| Err(anyhow::anyhow!("nope")));

    let delivered = orch.emit_scene_event("hover", EventData::Point([0.25, 0.75]));
    assert_eq!(delivered, 1);
    assert_eq!(
        seen.borrow().as_slice(),
        &[SceneEvent {
            trigger: "hover".into(),
            data: EventData::Point([0.25, 0.75]),
        }]
    );

    assert!(orch.unregister_scene_handler("lotus"));
    assert!(!orch.unregister_scene_handler("lotus"));
    orch.emit_scene_event("hover", EventData::None);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn scene_handler_handles_are_generation_checked() {
    let orch = MotionOrchestrator::new();
    let old = orch.register_scene_handler("h", |_: &SceneEvent| Ok(()));
    let new = orch.register_scene_handler("h", |_: &SceneEvent| Ok(()));
    assert!(!old.unregister());
    assert!(new.is_registered());
    assert_eq!(orch.emit_scene_event("tap", EventData::Scalar(1.0)), 1);
}

#[test]
fn blessing_wave_rises_and_returns_to_zero() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    orch.register_engine("gate", recording(&calls));
    orch.trigger_blessing_wave(1.0);
    assert!(orch.is_blessing_wave_active());

    let d = BlessingConfig::default().duration_sec;
    orch.broadcast(state_at(0.0));
    let at_start = orch.blessing_wave_progress();
    orch.broadcast(state_at(d * 0.25));
    let rising = orch.blessing_wave_progress();
    orch.broadcast(state_at(d * 0.5));
    let peak = orch.blessing_wave_progress();
    orch.broadcast(state_at(d));
    let after = orch.blessing_wave_progress();

    assert_eq!(at_start, 0.0);
    assert!(rising > 0.5 && rising < peak);
    assert!((peak - 1.0).abs() < 1e-4);
    assert_eq!(after, 0.0);
    assert!(!orch.is_blessing_wave_active());

    let delivered: Vec<f32> = calls.borrow().iter().map(|s| s.blessing_wave_progress).collect();
    assert_eq!(delivered, vec![at_start, rising, peak, after]);

    orch.broadcast(state_at(d * 2.0));
    assert_eq!(orch.blessing_wave_progress(), 0.0);
}

#[test]
fn blessing_wave_retrigger_restarts_from_now() {
    let orch = MotionOrchestrator::new();
    let d = BlessingConfig::default().duration_sec;
    orch.trigger_blessing_wave(1.0);
    orch.broadcast(state_at(0.0));
    orch.broadcast(state_at(d * 0.5));
    assert!(orch.blessing_wave_progress() > 0.99);

    orch.trigger_blessing_wave(0.5);
    orch.broadcast(state_at(d * 0.5));
    assert_eq!(orch.blessing_wave_progress(), 0.0);
    orch.broadcast(state_at(d));
    assert!((orch.blessing_wave_progress() - 0.5).abs() < 1e-4);
    // the first wave would have finished here; the restarted one is still running
    assert!(orch.is_blessing_wave_active());
    orch.broadcast(state_at(d * 2.0));
    assert_eq!(orch.blessing_wave_progress(), 0.0);
    assert!(!orch.is_blessing_wave_active());
}

#[test]
fn blessing_wave_strength_is_clamped() {
    let orch = MotionOrchestrator::with_blessing_config(BlessingConfig { duration_sec: 1.0 });
    orch.trigger_blessing_wave(7.0);
    orch.broadcast(state_at(0.0));
    orch.broadcast(state_at(0.5));
    assert!(orch.blessing_wave_progress() <= 1.0);
}

#[test]
fn dispose_clears_everything_and_later_use_is_inert() {
    let orch = MotionOrchestrator::new();
    let calls = spy();
    let handle = orch.register_engine("gate", recording(&calls));
    orch.register_scene_handler("gate", |_: &SceneEvent| Ok(()));
    orch.on_section_enter("hero");

    orch.dispose();
    orch.dispose();
    assert!(orch.is_disposed());
    assert!(!handle.is_registered());
    assert_eq!(orch.engine_count(), 0);
    assert!(!orch.is_section_active("hero"));

    let late = orch.register_engine("late", recording(&calls));
    assert!(!late.is_registered());
    assert_eq!(orch.broadcast(state_at(1.0)), BroadcastReport::default());
    assert_eq!(orch.emit_scene_event("hover", EventData::None), 0);
    assert!(!orch.on_section_enter("hero"));
    assert!(calls.borrow().is_empty());
}

#[test]
fn independent_orchestrators_do_not_share_state() {
    let a = create_orchestrator();
    let b = create_orchestrator();
    a.register_engine("x", |_: &MotionState| Ok(()));
    assert_eq!(a.engine_count(), 1);
    assert_eq!(b.engine_count(), 0);
    a.dispose();
    assert!(!b.is_disposed());
}

#[test]
fn clones_share_one_registry() {
    let a = MotionOrchestrator::new();
    let b = a.clone();
    a.register_engine("x", |_: &MotionState| Ok(()));
    assert!(b.is_engine_registered("x"));
    assert_eq!(b.broadcast(state_at(0.0)).delivered, 1);
}
