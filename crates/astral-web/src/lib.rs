#![cfg(target_arch = "wasm32")]
mod audio;
mod dom;
mod events;
mod frame;
mod render;

use astral_core::{
    create_orchestrator, Camera, EngineLifecycle, EventData, FrameClock, Motif,
    MotionAggregator, MotionOrchestrator, PostFxKind, PostFxPass, Quality, SceneEvent,
    VisualEngine,
};
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use events::InputState;

// Spacing between motifs that are not tied to a page section
const ROW_SPACING: f32 = 2.4;
const ROW_SCALE: f32 = 0.55;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("astral-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;

    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id("app-canvas")
        .ok_or_else(|| anyhow::anyhow!("missing #app-canvas"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;

    // canvas pixel size tracks CSS size * devicePixelRatio
    dom::sync_canvas_backing_size(&canvas);
    dom::wire_canvas_resize(&canvas);

    let orchestrator = create_orchestrator();
    let aggregator = Rc::new(RefCell::new(MotionAggregator::default()));
    let input = Rc::new(RefCell::new(InputState::default()));
    let sections = Rc::new(dom::SectionTracker::collect(&document));

    let (viewport_w, _) = dom::viewport_size(&window);
    let cores = window.navigator().hardware_concurrency() as u32;
    let quality = Quality::from_device(viewport_w as f32, cores);
    log::info!("[init] quality {:?} ({}px, {} cores)", quality, viewport_w, cores);

    let engines = build_engines(&orchestrator, &sections, quality)?;
    let passes = build_post_passes(&orchestrator)?;

    // hovering a section asks for a gentle blessing on the next frame
    let hover_input = input.clone();
    let _hover = orchestrator.register_scene_handler("hover", move |ev: &SceneEvent| {
        if ev.trigger != "hover" {
            return Ok(());
        }
        if let EventData::Text(section) = &ev.data {
            log::debug!("[scene] hover {}", section);
        }
        hover_input
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("input state busy"))?
            .request_blessing(0.35);
        Ok(())
    });

    dom::wire_scroll(aggregator.clone(), orchestrator.clone(), sections.clone());
    events::wire_input_handlers(events::InputWiring {
        canvas: canvas.clone(),
        orchestrator: orchestrator.clone(),
        input: input.clone(),
    });
    events::wire_global_keydown(orchestrator.clone(), input.clone());

    let audio: Rc<RefCell<Option<audio::AudioTap>>> = Rc::new(RefCell::new(None));
    wire_audio_start(&document, audio.clone());

    let gpu = frame::init_gpu(&canvas).await;
    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        orchestrator,
        aggregator,
        clock: FrameClock::new(),
        camera: Camera::default(),
        engines,
        passes,
        canvas,
        audio,
        input,
        gpu,
        last_size: (0, 0),
    }));
    wire_teardown(frame_ctx.clone());
    frame::start_loop(frame_ctx);
    Ok(())
}

/// One engine per motif. Motifs with a matching `data-section` element are
/// gated by it and centered; the rest share a row and always run.
fn build_engines(
    orchestrator: &MotionOrchestrator,
    sections: &dom::SectionTracker,
    quality: Quality,
) -> anyhow::Result<Vec<EngineLifecycle<VisualEngine>>> {
    let ungated: Vec<Motif> = Motif::ALL
        .iter()
        .copied()
        .filter(|m| !sections.contains(m.name()))
        .collect();
    let mut engines = Vec::with_capacity(Motif::ALL.len());
    for motif in Motif::ALL {
        let mut config = motif.engine_config(motif.name(), quality);
        if sections.contains(motif.name()) {
            config = config.in_section(motif.name());
        }
        let mut engine = VisualEngine::construct(config)?;
        if let Some(slot) = ungated.iter().position(|m| *m == motif) {
            let offset = slot as f32 - (ungated.len() as f32 - 1.0) * 0.5;
            engine.set_position(Vec3::new(offset * ROW_SPACING, 0.0, 0.0));
            engine.set_scale(Vec3::splat(ROW_SCALE));
        }
        let mut lifecycle = engine.into_lifecycle();
        lifecycle.activate(orchestrator)?;
        engines.push(lifecycle);
    }
    Ok(engines)
}

fn build_post_passes(
    orchestrator: &MotionOrchestrator,
) -> anyhow::Result<Vec<EngineLifecycle<PostFxPass>>> {
    let kinds = [
        PostFxKind::BloomBoost {
            threshold: 0.7,
            boost: 0.6,
        },
        PostFxKind::Halation {
            radius: 6.0,
            tint: [1.0, 0.55, 0.3],
        },
        PostFxKind::ChromaticAberration { strength: 0.004 },
    ];
    let mut passes = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let mut lifecycle = PostFxPass::new(kind.label(), kind).into_lifecycle();
        lifecycle.activate(orchestrator)?;
        passes.push(lifecycle);
    }
    Ok(passes)
}

/// Audio needs a user gesture; the first click on `#audio-start` attaches the
/// analyser to `#ambient-audio` and starts playback.
fn wire_audio_start(document: &web::Document, audio: Rc<RefCell<Option<audio::AudioTap>>>) {
    let Some(media) = document
        .get_element_by_id("ambient-audio")
        .and_then(|el| el.dyn_into::<web::HtmlMediaElement>().ok())
    else {
        log::info!("[audio] no #ambient-audio element; audio bands stay at zero");
        return;
    };
    dom::add_click_listener(document, "audio-start", move || {
        let Ok(mut slot) = audio.try_borrow_mut() else {
            return;
        };
        if slot.is_some() {
            log::warn!("[gesture] audio already started; ignoring extra click");
            return;
        }
        match audio::AudioTap::attach(&media) {
            Ok(tap) => {
                _ = media.play();
                *slot = Some(tap);
            }
            Err(e) => log::error!("[audio] {:?}", e),
        }
    });
}

fn wire_teardown(frame_ctx: Rc<RefCell<frame::FrameContext<'static>>>) {
    let Some(window) = web::window() else {
        return;
    };
    let closure = Closure::wrap(Box::new(move || {
        if let Ok(mut ctx) = frame_ctx.try_borrow_mut() {
            ctx.teardown();
        }
    }) as Box<dyn FnMut()>);
    _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
    closure.forget();
}
