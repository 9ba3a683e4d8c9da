use crate::tia::FramePixels;

/// A key or switch change reported by the host. Directions and buttons carry
/// their pressed state so releases travel the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Up(bool),
    Down(bool),
    Left(bool),
    Right(bool),
    Fire(bool),
    Select(bool),
    Reset(bool),
    ColorToggle,
    Quit,
}

/// Everything the core asks of the outside world: showing finished frames
/// and collecting input. Diagnostics go through the `log` macros instead.
pub trait Host {
    fn present_frame(&mut self, _pixels: &FramePixels) {}
    fn poll_input(&mut self) -> Option<InputEvent> {
        None
    }
}

/// A host that renders nowhere and reports no input, for headless runs.
pub struct NullHost;

impl Host for NullHost {}
