/// Where a post pass reads from or writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Scene,
    Ping,
    Pong,
}

/// Source and destination of pass `index` in a chain: the first pass reads
/// the scene, then passes alternate between ping and pong.
pub fn chain_slots(index: usize) -> (Slot, Slot) {
    let dst = if index % 2 == 0 { Slot::Ping } else { Slot::Pong };
    let src = match index {
        0 => Slot::Scene,
        i if i % 2 == 0 => Slot::Pong,
        _ => Slot::Ping,
    };
    (src, dst)
}

/// Slot holding the final image after `passes` post passes.
pub fn chain_output(passes: usize) -> Slot {
    match passes {
        0 => Slot::Scene,
        n => chain_slots(n - 1).1,
    }
}
