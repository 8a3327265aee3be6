use crate::events::{key_action, InputState, KeyAction};
use astral_core::MotionOrchestrator;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys as web;

pub fn handle_global_keydown(
    ev: &web::KeyboardEvent,
    orchestrator: &MotionOrchestrator,
    input: &Rc<RefCell<InputState>>,
) {
    if ev.repeat() {
        return;
    }
    match key_action(&ev.key()) {
        Some(KeyAction::Blessing) => {
            orchestrator.trigger_blessing_wave(1.0);
            log::info!("[keys] blessing wave");
        }
        Some(KeyAction::TogglePause) => {
            if let Ok(mut input) = input.try_borrow_mut() {
                input.paused = !input.paused;
                log::info!("[keys] paused={}", input.paused);
            }
            ev.prevent_default();
        }
        None => {}
    }
}

pub fn wire_global_keydown(orchestrator: MotionOrchestrator, input: Rc<RefCell<InputState>>) {
    if let Some(window) = web::window() {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
                handle_global_keydown(&ev, &orchestrator, &input);
            }) as Box<dyn FnMut(_)>);
        _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
