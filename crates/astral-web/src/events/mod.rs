pub mod keyboard;
pub mod pointer;
mod state;

pub use keyboard::wire_global_keydown;
pub use pointer::{wire_input_handlers, InputWiring};
pub use state::{key_action, viewport_uv, InputState, KeyAction};
