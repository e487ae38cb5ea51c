//! Pointer and viewport events arriving between ticks.
//!
//! Event handlers only write plain pending state through an
//! [`InputSender`]; the engine drains it at the start of the next tick.
//! Senders hold a weak reference, so once the engine tears down every
//! outstanding sender silently becomes a no-op.

use glam::Vec2;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Viewport size in CSS-style pixels plus device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

/// Events written since the last tick (last write wins)
#[derive(Debug, Default)]
pub(crate) struct PendingInput {
    pointer: Option<Vec2>,
    resize: Option<ViewportSize>,
}

impl PendingInput {
    pub(crate) fn take_pointer(&mut self) -> Option<Vec2> {
        self.pointer.take()
    }

    pub(crate) fn take_resize(&mut self) -> Option<ViewportSize> {
        self.resize.take()
    }
}

pub(crate) type SharedInput = Arc<Mutex<PendingInput>>;

pub(crate) fn lock_input(input: &SharedInput) -> MutexGuard<'_, PendingInput> {
    input.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscription handle for pointer and resize events
#[derive(Debug, Clone)]
pub struct InputSender {
    pending: Weak<Mutex<PendingInput>>,
}

impl InputSender {
    pub(crate) fn new(pending: &SharedInput) -> Self {
        Self {
            pending: Arc::downgrade(pending),
        }
    }

    /// A sender with no engine behind it
    pub fn disconnected() -> Self {
        Self { pending: Weak::new() }
    }

    /// Record the pointer position in normalized device coordinates.
    /// Returns false once the engine is gone.
    pub fn pointer_moved(&self, x: f32, y: f32) -> bool {
        self.write(|pending| pending.pointer = Some(Vec2::new(x, y)))
    }

    /// Record a pointer position given in window pixels
    pub fn pointer_moved_px(&self, x: f64, y: f64, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let ndc = pixel_to_ndc(x, y, width, height);
        self.pointer_moved(ndc.x, ndc.y)
    }

    /// Record a viewport resize
    pub fn resized(&self, width: u32, height: u32, pixel_ratio: f32) -> bool {
        self.write(|pending| {
            pending.resize = Some(ViewportSize {
                width,
                height,
                pixel_ratio,
            })
        })
    }

    /// Whether the engine is still listening
    pub fn is_connected(&self) -> bool {
        self.pending.strong_count() > 0
    }

    fn write(&self, f: impl FnOnce(&mut PendingInput)) -> bool {
        match self.pending.upgrade() {
            Some(pending) => {
                f(&mut lock_input(&pending));
                true
            }
            None => false,
        }
    }
}

/// Window pixel coordinates to NDC (y up)
pub fn pixel_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x / width as f64 * 2.0 - 1.0) as f32,
        -(y / height as f64 * 2.0 - 1.0) as f32,
    )
}

/// Effective pointer, easing toward the latest reported position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    target: Vec2,
    current: Vec2,
    lag: f32,
}

impl PointerState {
    pub fn new(initial: Vec2, lag: f32) -> Self {
        Self {
            target: initial,
            current: initial,
            lag,
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// Advance one tick toward the target
    pub fn step(&mut self) -> Vec2 {
        self.current += (self.target - self.current) * self.lag;
        self.current
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_eases_toward_target() {
        let mut pointer = PointerState::new(Vec2::new(-10.0, -10.0), 0.05);
        pointer.set_target(Vec2::ZERO);
        let p = pointer.step();
        assert!((p.x - -9.5).abs() < 1e-5);
        assert!((p.y - -9.5).abs() < 1e-5);

        for _ in 0..500 {
            pointer.step();
        }
        assert!(pointer.current().length() < 1e-3);
    }

    #[test]
    fn test_sender_writes_until_dropped() {
        let pending: SharedInput = Arc::new(Mutex::new(PendingInput::default()));
        let sender = InputSender::new(&pending);

        assert!(sender.pointer_moved(0.5, -0.5));
        assert!(sender.resized(800, 600, 2.0));
        {
            let mut guard = lock_input(&pending);
            assert_eq!(guard.take_pointer(), Some(Vec2::new(0.5, -0.5)));
            assert_eq!(guard.take_pointer(), None);
            assert_eq!(guard.take_resize().map(|r| r.width), Some(800));
        }

        drop(pending);
        assert!(!sender.is_connected());
        assert!(!sender.pointer_moved(0.0, 0.0));
        assert!(!sender.resized(10, 10, 1.0));
    }

    #[test]
    fn test_pixel_to_ndc() {
        let centre = pixel_to_ndc(400.0, 300.0, 800, 600);
        assert!(centre.length() < 1e-6);
        let top_left = pixel_to_ndc(0.0, 0.0, 800, 600);
        assert_eq!(top_left, Vec2::new(-1.0, 1.0));
    }
}
