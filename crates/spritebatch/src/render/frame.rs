//! Frame loop glue: pace, draw, flush.
//!
//! The batcher itself has no notion of a frame beyond "everything between two
//! flushes". [`FrameDriver`] adds the loop around it. Each
//! [`run_frame`](FrameDriver::run_frame) sleeps off the rest of the FPS cap,
//! lets a [`Drawer`] fill the batches, and flushes them to the backend.

use super::backend::RenderBackend;
use crate::render2d::{FlushStats, SpriteBatcher};
use crate::time::{FrameClock, FramePacer};

/// Fills one frame's batches.
pub trait Drawer {
    fn draw_frame(&mut self, batcher: &mut SpriteBatcher, clock: &FrameClock);
}

impl<F> Drawer for F
where
    F: FnMut(&mut SpriteBatcher, &FrameClock),
{
    fn draw_frame(&mut self, batcher: &mut SpriteBatcher, clock: &FrameClock) {
        self(batcher, clock)
    }
}

pub struct FrameDriver<B: RenderBackend> {
    batcher: SpriteBatcher,
    backend: B,
    pacer: FramePacer,
    clock: FrameClock,
}

impl<B: RenderBackend> FrameDriver<B> {
    /// Paced at the batcher config's `frame_cap`.
    pub fn new(batcher: SpriteBatcher, backend: B) -> Self {
        let pacer = FramePacer::new(batcher.config().frame_cap);
        Self {
            batcher,
            backend,
            pacer,
            clock: FrameClock::new(),
        }
    }

    pub fn run_frame(&mut self, drawer: &mut impl Drawer) -> FlushStats {
        let now = self.pacer.wait();
        self.clock.tick(now);
        drawer.draw_frame(&mut self.batcher, &self.clock);
        self.batcher.flush(&mut self.backend)
    }

    /// Run `frames` frames back to back and sum their statistics.
    pub fn run(&mut self, frames: u64, drawer: &mut impl Drawer) -> FlushStats {
        let mut total = FlushStats::default();
        for _ in 0..frames {
            let stats = self.run_frame(drawer);
            total.draw_calls += stats.draw_calls;
            total.quads += stats.quads;
        }
        log::debug!(
            "Ran {frames} frames: {} draw calls, {} quads",
            total.draw_calls,
            total.quads
        );
        total
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn batcher(&self) -> &SpriteBatcher {
        &self.batcher
    }

    pub fn batcher_mut(&mut self) -> &mut SpriteBatcher {
        &mut self.batcher
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Both halves at once, e.g. for [`SpriteBatcher::realize`].
    pub fn parts_mut(&mut self) -> (&mut SpriteBatcher, &mut B) {
        (&mut self.batcher, &mut self.backend)
    }

    pub fn into_parts(self) -> (SpriteBatcher, B) {
        (self.batcher, self.backend)
    }
}
