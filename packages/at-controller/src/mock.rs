//! An in-memory [`WindowSurface`] that replays prepared frames.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::trace;

use crate::{CaptureError, CaptureResult, FrameBuffer, Point, WindowRect, WindowSurface};

/// A mouse message posted to a [`ScriptedSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    LeftDown(Point),
    LeftUp(Point),
}

#[derive(Default)]
struct ScriptState {
    /// Frames not yet served
    pending: VecDeque<FrameBuffer>,
    /// The last frame served, repeated once `pending` runs dry
    current: Option<FrameBuffer>,
    events: Vec<InputEvent>,
    captures: usize,
    foreground_requests: usize,
}

/// A synthetic window.
///
/// Each [`WindowSurface::capture`] serves the next scripted frame. After the
/// script runs out the last frame is served again, so a single-frame script
/// behaves like a static window.
#[derive(Default)]
pub struct ScriptedSurface {
    state: Mutex<ScriptState>,
}

impl ScriptedSurface {
    pub fn new(frames: impl IntoIterator<Item = FrameBuffer>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                pending: frames.into_iter().collect(),
                ..Default::default()
            }),
        }
    }

    /// A window that always shows `frame`.
    pub fn still(frame: FrameBuffer) -> Self {
        Self::new([frame])
    }

    /// Every input message posted so far, oldest first.
    pub fn events(&self) -> Vec<InputEvent> {
        self.state.lock().events.clone()
    }

    /// Number of completed down/up pairs.
    pub fn clicks(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, InputEvent::LeftUp(_)))
            .count()
    }

    pub fn captures(&self) -> usize {
        self.state.lock().captures
    }

    pub fn foreground_requests(&self) -> usize {
        self.state.lock().foreground_requests
    }
}

impl WindowSurface for ScriptedSurface {
    fn restore_and_foreground(&self) -> CaptureResult<()> {
        self.state.lock().foreground_requests += 1;
        Ok(())
    }

    fn bounds(&self) -> CaptureResult<WindowRect> {
        let state = self.state.lock();
        let frame = state
            .current
            .as_ref()
            .or(state.pending.front())
            .ok_or(CaptureError::NoFrame)?;
        Ok(WindowRect {
            left: 0,
            top: 0,
            right: frame.width() as i32,
            bottom: frame.height() as i32,
        })
    }

    fn capture(&self) -> CaptureResult<FrameBuffer> {
        self.restore_and_foreground()?;
        let mut state = self.state.lock();
        if let Some(next) = state.pending.pop_front() {
            state.current = Some(next);
        }
        let frame = state.current.clone().ok_or(CaptureError::NoFrame)?;
        state.captures += 1;
        trace!("[ScriptedSurface] capture #{}: {:?}", state.captures, frame);
        Ok(frame)
    }

    fn post_left_down(&self, point: Point) -> CaptureResult<()> {
        self.state.lock().events.push(InputEvent::LeftDown(point));
        Ok(())
    }

    fn post_left_up(&self, point: Point) -> CaptureResult<()> {
        self.state.lock().events.push(InputEvent::LeftUp(point));
        Ok(())
    }
}
