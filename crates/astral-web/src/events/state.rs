/// Input collected between frames and consumed by the frame loop.
#[derive(Debug, Default)]
pub struct InputState {
    /// Pointer in viewport uv, origin top-left.
    pub pointer_uv: Option<[f32; 2]>,
    /// Strongest blessing requested since the last frame.
    pub pending_blessing: Option<f32>,
    pub paused: bool,
}

impl InputState {
    pub fn request_blessing(&mut self, strength: f32) {
        let prev = self.pending_blessing.unwrap_or(0.0);
        self.pending_blessing = Some(prev.max(strength));
    }
}

/// Client coordinates to viewport uv, clamped to \[0, 1\]². `None` while the
/// viewport has no area.
#[inline]
pub fn viewport_uv(client_x: f64, client_y: f64, width: f64, height: f64) -> Option<[f32; 2]> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    let u = (client_x / width).clamp(0.0, 1.0) as f32;
    let v = (client_y / height).clamp(0.0, 1.0) as f32;
    Some([u, v])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Blessing,
    TogglePause,
}

#[inline]
pub fn key_action(key: &str) -> Option<KeyAction> {
    match key {
        "b" | "B" => Some(KeyAction::Blessing),
        " " => Some(KeyAction::TogglePause),
        _ => None,
    }
}
