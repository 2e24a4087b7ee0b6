use crossbeam::channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::buffer::FrameQueue;
use crate::config::{ConfigInbox, Configuration};
use crate::error::{Result, VizError};
use crate::pipeline::FramePipeline;
use crate::render::{RenderFrame, Renderer};

pub const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Consecutive draw failures tolerated before the loop gives up.
pub const MAX_RENDER_FAILURES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rendered,
    Idle,
    Stopped,
}

/// The processing/render loop. Pulls frames from the hand-off queue one at
/// a time, runs the pipeline and draws the result.
pub struct FrameDriver<R: Renderer> {
    pipeline: FramePipeline,
    renderer: R,
    frames: Arc<FrameQueue>,
    inbox: ConfigInbox,
    capture_errors: Receiver<VizError>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
    render_failures: u32,
    notice: Option<String>,
}

impl<R: Renderer> FrameDriver<R> {
    pub fn new(
        cfg: Configuration,
        renderer: R,
        frames: Arc<FrameQueue>,
        inbox: ConfigInbox,
        capture_errors: Receiver<VizError>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pipeline: FramePipeline::new(cfg),
            renderer,
            frames,
            inbox,
            capture_errors,
            running,
            poll_interval: POLL_INTERVAL,
            render_failures: 0,
            notice: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &Configuration {
        self.pipeline.config()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn apply_pending(&mut self) {
        let pending = self.inbox.drain();
        if let Some(cfg) = pending.config {
            if cfg.bar_count != self.pipeline.config().bar_count {
                info!("bar count changed to {}", cfg.bar_count);
            }
            self.pipeline.apply_config(cfg);
            self.notice = None;
        }
        if let Some(msg) = pending.notice {
            warn!("{}", msg);
            self.notice = Some(msg);
        }
    }

    /// One loop iteration: take new settings, process at most one frame,
    /// draw it.
    pub fn step(&mut self) -> Result<Step> {
        if !self.running.load(Ordering::SeqCst) {
            return Ok(Step::Stopped);
        }

        match self.capture_errors.try_recv() {
            Ok(e) => {
                error!("{}", e);
                return Err(e);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        self.apply_pending();

        let Some(frame) = self.frames.pop() else {
            return Ok(Step::Idle);
        };

        let geom = self.renderer.geometry();
        let output = self.pipeline.process(&frame, geom.height);
        let cfg = self.pipeline.config();
        let render_frame = RenderFrame {
            displayed: &output.displayed,
            caps: &output.caps,
            scale: output.scale,
            color_mode: cfg.color_mode,
            min_bar_height: cfg.min_bar_height,
            max_bar_height_fraction: cfg.max_bar_height_fraction,
            use_caps: cfg.use_caps,
            status: self.notice.as_deref(),
        };

        match self.renderer.draw(&render_frame) {
            Ok(()) => self.render_failures = 0,
            Err(e) => {
                self.render_failures += 1;
                warn!(
                    "draw failed ({}/{}): {}",
                    self.render_failures, MAX_RENDER_FAILURES, e
                );
                if self.render_failures >= MAX_RENDER_FAILURES {
                    return Err(e);
                }
            }
        }

        Ok(Step::Rendered)
    }

    /// Runs until the running flag is cleared or an unrecoverable error.
    pub fn run(&mut self) -> Result<()> {
        info!("processing loop started");
        let result = loop {
            match self.step() {
                Ok(Step::Stopped) => break Ok(()),
                Ok(Step::Rendered) | Ok(Step::Idle) => thread::sleep(self.poll_interval),
                Err(e) => break Err(e),
            }
        };
        self.running.store(false, Ordering::SeqCst);
        if self.frames.dropped() > 0 {
            info!("{} frames dropped while the loop was busy", self.frames.dropped());
        }
        info!("processing loop stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_channel;
    use crate::render::Geometry;
    use crossbeam::channel::bounded;

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn geometry(&self) -> Geometry {
            Geometry { width: 100, height: 100 }
        }

        fn draw(&mut self, _frame: &RenderFrame<'_>) -> Result<()> {
            Err(VizError::Render("surface lost".into()))
        }
    }

    /// Fails every draw except the ones whose index is listed.
    struct FlakyRenderer {
        draws: usize,
        succeed_on: Vec<usize>,
    }

    impl Renderer for FlakyRenderer {
        fn geometry(&self) -> Geometry {
            Geometry { width: 100, height: 100 }
        }

        fn draw(&mut self, _frame: &RenderFrame<'_>) -> Result<()> {
            let n = self.draws;
            self.draws += 1;
            if self.succeed_on.contains(&n) {
                Ok(())
            } else {
                Err(VizError::Render("resize in progress".into()))
            }
        }
    }

    #[test]
    fn successful_draw_resets_the_failure_count() {
        let frames = Arc::new(FrameQueue::new(4));
        let (_publisher, inbox) = config_channel();
        let (_tx, rx) = bounded(1);
        let streak = MAX_RENDER_FAILURES as usize - 1;
        let renderer = FlakyRenderer { draws: 0, succeed_on: vec![streak] };
        let mut driver = FrameDriver::new(
            Configuration::default(),
            renderer,
            Arc::clone(&frames),
            inbox,
            rx,
            Arc::new(AtomicBool::new(true)),
        );

        // fail, succeed once, fail again: never a full streak
        for _ in 0..(2 * streak + 1) {
            frames.push(vec![0.0; 256]);
            assert_eq!(driver.step(), Ok(Step::Rendered));
        }
        assert_eq!(driver.renderer().draws, 2 * streak + 1);
    }

    #[test]
    fn persistent_render_failure_escalates() {
        let frames = Arc::new(FrameQueue::new(4));
        let (_publisher, inbox) = config_channel();
        let (_tx, rx) = bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let mut driver = FrameDriver::new(
            Configuration::default(),
            FailingRenderer,
            Arc::clone(&frames),
            inbox,
            rx,
            running,
        );

        for _ in 1..MAX_RENDER_FAILURES {
            frames.push(vec![0.0; 256]);
            assert_eq!(driver.step(), Ok(Step::Rendered));
        }
        frames.push(vec![0.0; 256]);
        assert!(matches!(driver.step(), Err(VizError::Render(_))));
    }

    #[test]
    fn capture_error_stops_the_loop() {
        let frames = Arc::new(FrameQueue::new(4));
        let (_publisher, inbox) = config_channel();
        let (tx, rx) = bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let mut driver = FrameDriver::new(
            Configuration::default(),
            FailingRenderer,
            frames,
            inbox,
            rx,
            Arc::clone(&running),
        )
        .with_poll_interval(Duration::from_millis(1));

        tx.send(VizError::AudioCapture("device unplugged".into())).unwrap();
        assert!(matches!(driver.run(), Err(VizError::AudioCapture(_))));
        assert!(!running.load(Ordering::SeqCst));
    }
}
