use astral_core::{MotionAggregator, MotionOrchestrator};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

#[inline]
pub fn add_click_listener(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) {
    if let Some(el) = document.get_element_by_id(element_id) {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) {
    if let Some(w) = web::window() {
        let dpr = w.device_pixel_ratio();
        let rect = canvas.get_bounding_client_rect();
        let w_px = (rect.width() * dpr) as u32;
        let h_px = (rect.height() * dpr) as u32;
        canvas.set_width(w_px.max(1));
        canvas.set_height(h_px.max(1));
    }
}

pub fn wire_canvas_resize(canvas: &web::HtmlCanvasElement) {
    let Some(window) = web::window() else {
        return;
    };
    let canvas = canvas.clone();
    let closure = wasm_bindgen::closure::Closure::wrap(
        Box::new(move || sync_canvas_backing_size(&canvas)) as Box<dyn FnMut()>,
    );
    _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
    closure.forget();
}

#[inline]
pub fn viewport_size(window: &web::Window) -> (f64, f64) {
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    (w, h)
}

/// Page sections marked up with `data-section="<id>"`.
pub struct SectionTracker {
    sections: Vec<(String, web::Element)>,
}

impl SectionTracker {
    pub fn collect(document: &web::Document) -> Self {
        let mut sections = Vec::new();
        if let Ok(nodes) = document.query_selector_all("[data-section]") {
            for i in 0..nodes.length() {
                let Some(el) = nodes.get(i).and_then(|n| n.dyn_into::<web::Element>().ok()) else {
                    continue;
                };
                if let Some(id) = el.get_attribute("data-section") {
                    sections.push((id, el));
                }
            }
        }
        log::info!("[dom] {} page sections", sections.len());
        Self { sections }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sections.iter().any(|(s, _)| s == id)
    }

    /// Enter every section that overlaps the viewport and exit the rest. The
    /// orchestrator ignores repeated enters/exits.
    pub fn update(&self, orchestrator: &MotionOrchestrator, viewport_height: f64) {
        for (id, el) in &self.sections {
            let rect = el.get_bounding_client_rect();
            if rect.bottom() > 0.0 && rect.top() < viewport_height {
                orchestrator.on_section_enter(id);
            } else {
                orchestrator.on_section_exit(id);
            }
        }
    }
}

/// Feed page scroll into the aggregator and keep section visibility current.
pub fn wire_scroll(
    aggregator: Rc<RefCell<MotionAggregator>>,
    orchestrator: MotionOrchestrator,
    sections: Rc<SectionTracker>,
) {
    let Some(window) = web::window() else {
        return;
    };
    let on_scroll = move || {
        let Some(w) = web::window() else {
            return;
        };
        let (_, viewport_h) = viewport_size(&w);
        let scroll_top = w.scroll_y().unwrap_or(0.0);
        let scroll_height = w
            .document()
            .and_then(|d| d.document_element())
            .map(|el| el.scroll_height() as f64)
            .unwrap_or(0.0);
        if let Ok(mut agg) = aggregator.try_borrow_mut() {
            agg.set_scroll_position(scroll_top as f32, scroll_height as f32, viewport_h as f32);
        }
        sections.update(&orchestrator, viewport_h);
    };
    // initial state before the first scroll event
    on_scroll();
    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(on_scroll) as Box<dyn FnMut()>);
    _ = window.add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref());
    _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
    closure.forget();
}
