use crate::audio::AudioTap;
use crate::events::InputState;
use crate::render;
use astral_core::{
    Camera, EngineLifecycle, FrameClock, MotionAggregator, MotionOrchestrator, PostFxPass,
    VisualEngine,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct FrameContext<'a> {
    pub orchestrator: MotionOrchestrator,
    pub aggregator: Rc<RefCell<MotionAggregator>>,
    pub clock: FrameClock,
    pub camera: Camera,

    pub engines: Vec<EngineLifecycle<VisualEngine>>,
    pub passes: Vec<EngineLifecycle<PostFxPass>>,

    pub canvas: web::HtmlCanvasElement,
    pub audio: Rc<RefCell<Option<AudioTap>>>,
    pub input: Rc<RefCell<InputState>>,

    pub gpu: Option<render::GpuState<'a>>,
    pub last_size: (u32, u32),
}

impl<'a> FrameContext<'a> {
    /// One frame: sample inputs, broadcast once, render.
    pub fn frame(&mut self) {
        let (paused, pointer, blessing) = match self.input.try_borrow_mut() {
            Ok(mut input) => (input.paused, input.pointer_uv, input.pending_blessing.take()),
            Err(_) => (false, None, None),
        };
        if paused {
            return;
        }

        self.sync_size();

        if let Some(uv) = pointer {
            for lifecycle in self.engines.iter().filter(|e| e.is_active()) {
                if let Ok(mut engine) = lifecycle.receiver().try_borrow_mut() {
                    engine.set_pointer(uv);
                }
            }
        }
        if let Some(strength) = blessing {
            self.orchestrator.trigger_blessing_wave(strength);
        }

        let tick = self.clock.tick();
        let state = {
            let Ok(mut agg) = self.aggregator.try_borrow_mut() else {
                return;
            };
            if let Ok(mut tap) = self.audio.try_borrow_mut() {
                if let Some(tap) = tap.as_mut().filter(|t| t.is_running()) {
                    agg.push_byte_spectrum(tap.spectrum());
                }
            }
            agg.sample(tick)
        };

        let report = self.orchestrator.broadcast(state);
        if report.failed > 0 {
            log::debug!(
                "[frame {}] {} delivered, {} failed",
                tick.frame,
                report.delivered,
                report.failed
            );
        }
        self.camera.apply_motion(&self.orchestrator.current());

        if let Some(gpu) = self.gpu.as_mut() {
            let orchestrator = &self.orchestrator;
            let visible = |engine: &VisualEngine| {
                engine
                    .config()
                    .section()
                    .map_or(true, |s| orchestrator.is_section_active(s))
            };
            match gpu.render(&self.camera, &self.engines, &self.passes, visible) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu.reconfigure(),
                Err(e) => log::error!("render error: {:?}", e),
            }
        }
    }

    /// Propagate a canvas resize to the GPU targets, the camera and every
    /// post pass.
    fn sync_size(&mut self) {
        let size = (self.canvas.width(), self.canvas.height());
        if size == self.last_size {
            return;
        }
        self.last_size = size;
        let (w, h) = size;
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize_if_needed(w, h);
        }
        self.camera.set_viewport(w, h);
        for pass in &self.passes {
            if let Ok(mut p) = pass.receiver().try_borrow_mut() {
                p.set_resolution(w, h);
            }
        }
    }

    /// Dispose every engine and pass, then the orchestrator itself.
    pub fn teardown(&mut self) {
        let disposed = self
            .engines
            .iter_mut()
            .map(|e| e.dispose())
            .chain(self.passes.iter_mut().map(|p| p.dispose()))
            .filter(|d| *d)
            .count();
        self.orchestrator.dispose();
        log::info!("[frame] teardown: {} engines disposed", disposed);
    }
}

pub async fn init_gpu(canvas: &web::HtmlCanvasElement) -> Option<render::GpuState<'static>> {
    // leak a canvas clone to satisfy 'static lifetime for surface
    let leaked_canvas = Box::leak(Box::new(canvas.clone()));
    match render::GpuState::new(leaked_canvas).await {
        Ok(g) => Some(g),
        Err(e) => {
            log::error!("WebGPU init error: {:?}", e);
            None
        }
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext<'static>>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if let Ok(mut ctx) = frame_ctx.try_borrow_mut() {
            ctx.frame();
        }
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let (Some(w), Ok(slot)) = (web::window(), tick.try_borrow()) else {
        return;
    };
    if let Some(cb) = slot.as_ref() {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}
