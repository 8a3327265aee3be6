use crate::dom;
use crate::events::{viewport_uv, InputState};
use astral_core::{EventData, MotionOrchestrator};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys as web;

#[derive(Clone)]
pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub orchestrator: MotionOrchestrator,
    pub input: Rc<RefCell<InputState>>,
}

pub fn wire_input_handlers(w: InputWiring) {
    wire_pointermove(&w);
    wire_pointerdown(&w);
    wire_section_hover(&w);
}

/// Pointer position relative to the viewport, clamped to \[0, 1\]².
#[inline]
pub fn pointer_viewport_uv(ev: &web::MouseEvent) -> Option<[f32; 2]> {
    let window = web::window()?;
    let (w, h) = dom::viewport_size(&window);
    viewport_uv(ev.client_x() as f64, ev.client_y() as f64, w, h)
}

fn wire_pointermove(w: &InputWiring) {
    let w = w.clone();
    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
        if let Some(uv) = pointer_viewport_uv(&ev) {
            if let Ok(mut input) = w.input.try_borrow_mut() {
                input.pointer_uv = Some(uv);
            }
        }
    }) as Box<dyn FnMut(_)>);

    if let Some(wnd) = web::window() {
        _ = wnd.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}

fn wire_pointerdown(w: &InputWiring) {
    let w = w.clone();
    let canvas_for_listener = w.canvas.clone();
    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
        w.orchestrator.trigger_blessing_wave(1.0);
        if let Some(uv) = pointer_viewport_uv(&ev) {
            let handled = w.orchestrator.emit_scene_event("tap", EventData::Point(uv));
            log::debug!("[pointer] tap at ({:.2},{:.2}) -> {} handlers", uv[0], uv[1], handled);
        }
    }) as Box<dyn FnMut(_)>);

    _ = canvas_for_listener
        .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
    closure.forget();
}

/// Entering a `[data-section]` element emits a `hover` scene event carrying
/// the section id.
fn wire_section_hover(w: &InputWiring) {
    let Some(document) = dom::window_document() else {
        return;
    };
    let Ok(nodes) = document.query_selector_all("[data-section]") else {
        return;
    };
    for i in 0..nodes.length() {
        let Some(el) = nodes.get(i).and_then(|n| n.dyn_into::<web::Element>().ok()) else {
            continue;
        };
        let Some(id) = el.get_attribute("data-section") else {
            continue;
        };
        let orchestrator = w.orchestrator.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            orchestrator.emit_scene_event("hover", EventData::Text(id.clone()));
        }) as Box<dyn FnMut()>);
        _ = el.add_event_listener_with_callback("pointerenter", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
