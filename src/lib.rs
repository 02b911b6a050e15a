pub use at_controller as controller;
pub use at_cv as cv;

pub use controller::{FrameBuffer, Point, WindowSurface};
#[cfg(all(windows, feature = "windows"))]
pub use controller::GdiWindow;

pub use cv::{MatchTemplateMethod, MatcherOptions};

pub mod config;
pub mod crash;
pub mod error;
pub mod retry;

pub use config::Config;
pub use error::{Error, Result};
pub use retry::{Clock, RetryPolicy, SystemClock};

use std::{path::Path, time::Duration};

use color_print::cformat;
use cv::{SingleMatcher, SingleMatcherResult, TemplateStore, luma::bgra_to_luma};
use image::GrayImage;
use tracing::{debug, info, warn};

/// The centre of a template placed with its top-left corner at `top_left`.
///
/// Odd sizes round down: a 31 pixel wide template is offset by 15.
pub fn click_point(top_left: (u32, u32), template_size: (u32, u32)) -> Point {
    Point::new(
        (top_left.0 + template_size.0 / 2) as i32,
        (top_left.1 + template_size.1 / 2) as i32,
    )
}

/// Outcome of a successful [`AutoTalent::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Clicks posted before the target screen showed up
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Drives one window until the talent screen shows up.
///
/// `AutoTalent` combines a [`WindowSurface`] (via `at-controller`) with
/// template matching (via `at-cv`). Each check captures the window once and
/// matches against the configured templates.
///
/// # Example
/// ```ignore
/// let window = GdiWindow::find("Game Window")?;
/// let auto_talent = AutoTalent::new(window, Config::default());
/// let button = auto_talent.locate_button()?;
/// auto_talent.run(button, &RetryPolicy::default(), &SystemClock::new())?;
/// ```
pub struct AutoTalent<S: WindowSurface> {
    surface: S,
    config: Config,
    templates: TemplateStore,
}

impl<S: WindowSurface> AutoTalent<S> {
    pub fn new(surface: S, config: Config) -> Self {
        Self {
            surface,
            config,
            templates: TemplateStore::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Match the template at `path` against an already converted frame.
    fn match_gray(&self, gray: &GrayImage, path: &Path) -> Result<SingleMatcherResult> {
        let template = self.templates.get(path)?;
        let res =
            SingleMatcher::match_template(gray, template.image(), &self.config.matcher_options())?;
        Ok(res)
    }

    /// Whether every talent template is visible in `frame`.
    ///
    /// Templates are checked in order and the check stops at the first miss,
    /// so later templates are not even loaded.
    pub fn is_target_frame(&self, frame: &FrameBuffer) -> Result<bool> {
        let gray = bgra_to_luma(frame.width(), frame.height(), frame.as_raw());
        let method = self.config.method;
        for path in self.config.talent_paths() {
            let res = self.match_gray(&gray, &path)?;
            let best = res.best(method);
            debug!(
                "{}: {:.4} at ({}, {})",
                path.display(),
                best.value,
                best.rect.x,
                best.rect.y
            );
            if res.result.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Capture the window once and check for the talent screen.
    pub fn is_target_screen(&self) -> Result<bool> {
        let frame = self.surface.capture()?;
        self.is_target_frame(&frame)
    }

    /// Find the button in `frame`, returning the centre of the best placement.
    pub fn locate_button_in(&self, frame: &FrameBuffer) -> Result<Point> {
        let gray = bgra_to_luma(frame.width(), frame.height(), frame.as_raw());
        let res = self.match_gray(&gray, &self.config.button_path())?;
        let Some(found) = res.result else {
            let best = res.best(self.config.method);
            warn!(
                "button best score {:.4} at ({}, {}) is below {}",
                best.value, best.rect.x, best.rect.y, self.config.threshold
            );
            return Err(Error::ButtonNotFound {
                score: best.value,
                threshold: self.config.threshold,
            });
        };
        let point = click_point(
            (found.rect.x, found.rect.y),
            (found.rect.width, found.rect.height),
        );
        info!(
            "button found at ({}, {}) with score {:.4}",
            point.x, point.y, found.value
        );
        Ok(point)
    }

    /// Capture the window once and locate the button.
    pub fn locate_button(&self) -> Result<Point> {
        let frame = self.surface.capture()?;
        self.locate_button_in(&frame)
    }

    /// Post a left click at `button` shifted by the configured click offset.
    pub fn click(&self, button: Point, hold: Duration, clock: &impl Clock) -> Result<()> {
        let (dx, dy) = self.config.click_offset;
        let point = button.offset(dx, dy);
        self.surface.post_left_down(point)?;
        clock.sleep(hold);
        self.surface.post_left_up(point)?;
        Ok(())
    }

    /// Click `button` until the talent screen shows up.
    ///
    /// Without a limit in `policy` this loops until the screen appears or an
    /// error ends it.
    pub fn run(
        &self,
        button: Point,
        policy: &RetryPolicy,
        clock: &impl Clock,
    ) -> Result<RunReport> {
        let mut attempts = 0u32;
        loop {
            if self.is_target_screen()? {
                let report = RunReport {
                    attempts,
                    elapsed: clock.elapsed(),
                };
                info!(
                    "{}",
                    cformat!(
                        "<g><strong>[AutoTalent]</strong></g>: target screen reached after {} attempts",
                        attempts
                    )
                );
                return Ok(report);
            }

            let elapsed = clock.elapsed();
            if policy.exhausted(attempts, elapsed) {
                warn!("giving up after {} attempts ({:?})", attempts, elapsed);
                return Err(Error::RetriesExhausted { attempts, elapsed });
            }

            attempts += 1;
            info!(
                "{}",
                cformat!(
                    "<m><strong>[AutoTalent]</strong></m>: attempt {}, clicking ({}, {})",
                    attempts,
                    button.x,
                    button.y
                )
            );
            self.click(button, policy.press_hold, clock)?;
            clock.sleep(policy.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::controller::mock::{InputEvent, ScriptedSurface};
    use crate::cv::MatchError;
    use image::{Luma, Rgba, RgbaImage};

    use super::*;
    use crate::retry::fake::FakeClock;

    const BUTTON_AT: (u32, u32) = (150, 200);
    const TALENTS_AT: [(u32, u32); 3] = [(20, 20), (100, 40), (200, 90)];

    /// A deterministic high-contrast gray texture.
    fn noise(width: u32, height: u32, seed: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1)
                ^ y.wrapping_mul(0x85EB_CA77)
                ^ seed.wrapping_mul(0xC2B2_AE3D);
            h ^= h >> 15;
            h = h.wrapping_mul(0x2C1B_3C6D);
            h ^= h >> 12;
            let v = if (h >> 16) & 1 == 0 { 16 } else { 240 };
            Rgba([v, v, v, 255])
        })
    }

    struct Fixture {
        dir: tempfile::TempDir,
        button: RgbaImage,
        talents: Vec<RgbaImage>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let button = noise(40, 16, 100);
            button.save(dir.path().join("button.png")).unwrap();
            let talents: Vec<RgbaImage> = (1..=3).map(|i| noise(24, 24, i)).collect();
            for (i, talent) in talents.iter().enumerate() {
                talent
                    .save(dir.path().join(format!("talent{}.png", i + 1)))
                    .unwrap();
            }
            Self {
                dir,
                button,
                talents,
            }
        }

        fn config(&self) -> Config {
            Config {
                template_dir: self.dir.path().to_path_buf(),
                click_offset: (0, 0),
                ..Default::default()
            }
        }

        /// A 320x240 frame with the button and the listed talents drawn on it.
        fn frame(&self, with_button: bool, talents: &[usize]) -> FrameBuffer {
            let mut canvas = RgbaImage::from_pixel(320, 240, Rgba([60, 90, 120, 255]));
            if with_button {
                image::imageops::replace(
                    &mut canvas,
                    &self.button,
                    BUTTON_AT.0 as i64,
                    BUTTON_AT.1 as i64,
                );
            }
            for &i in talents {
                let (x, y) = TALENTS_AT[i];
                image::imageops::replace(&mut canvas, &self.talents[i], x as i64, y as i64);
            }
            FrameBuffer::from_rgba_image(&canvas)
        }

        fn button_center(&self) -> Point {
            click_point(BUTTON_AT, self.button.dimensions())
        }
    }

    #[test]
    fn test_click_point() {
        assert_eq!(click_point((10, 20), (30, 40)), Point::new(25, 40));
        assert_eq!(click_point((10, 20), (31, 41)), Point::new(25, 40));
        assert_eq!(click_point((0, 0), (1, 1)), Point::new(0, 0));
    }

    #[test]
    fn test_target_screen_on_first_capture() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::still(fixture.frame(false, &[0, 1, 2]));
        let auto_talent = AutoTalent::new(&surface, fixture.config());

        assert!(auto_talent.is_target_screen().unwrap());
        assert_eq!(surface.captures(), 1);
        assert_eq!(surface.foreground_requests(), 1);
        assert!(surface.events().is_empty());
    }

    #[test]
    fn test_any_missing_talent_fails() {
        let fixture = Fixture::new();
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), fixture.config());
        for present in [vec![1, 2], vec![0, 2], vec![0, 1], vec![]] {
            let frame = fixture.frame(true, &present);
            assert!(!auto_talent.is_target_frame(&frame).unwrap(), "{present:?}");
        }
    }

    #[test]
    fn test_target_frame_is_idempotent() {
        let fixture = Fixture::new();
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), fixture.config());
        let frame = fixture.frame(true, &[0, 1, 2]);
        let first = auto_talent.is_target_frame(&frame).unwrap();
        let second = auto_talent.is_target_frame(&frame).unwrap();
        assert!(first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stops_at_first_missing_talent() {
        let fixture = Fixture::new();
        std::fs::remove_file(fixture.dir.path().join("talent2.png")).unwrap();
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), fixture.config());

        // talent1 is absent, so the unreadable talent2 is never loaded
        let frame = fixture.frame(true, &[]);
        assert!(!auto_talent.is_target_frame(&frame).unwrap());

        // talent1 is present, so talent2 has to be loaded and fails
        let frame = fixture.frame(true, &[0]);
        let err = auto_talent.is_target_frame(&frame).unwrap_err();
        assert!(matches!(
            err,
            Error::Match(MatchError::TemplateLoad { ref path, .. }) if path.ends_with("talent2.png")
        ));
        assert_eq!(err.kind(), "TemplateLoadError");
    }

    #[test]
    fn test_locate_button() {
        let fixture = Fixture::new();
        let frame = fixture.frame(true, &[]);
        let surface = ScriptedSurface::still(frame.clone());
        let auto_talent = AutoTalent::new(&surface, fixture.config());

        let point = auto_talent.locate_button().unwrap();
        assert_eq!(point, Point::new(150 + 20, 200 + 8));
        assert_eq!(point, fixture.button_center());
        assert!(frame.contains(point));
    }

    #[test]
    fn test_button_absent_is_an_error() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::still(fixture.frame(false, &[0, 1, 2]));
        let auto_talent = AutoTalent::new(&surface, fixture.config());

        match auto_talent.locate_button() {
            Err(Error::ButtonNotFound { score, threshold }) => {
                assert!(score < threshold);
                assert_eq!(threshold, 0.99);
            }
            other => panic!("expected ButtonNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_button_template() {
        let fixture = Fixture::new();
        let config = Config {
            button_template: "nope.png".to_string(),
            ..fixture.config()
        };
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), config);
        let err = auto_talent
            .locate_button_in(&fixture.frame(true, &[]))
            .unwrap_err();
        assert_eq!(err.kind(), "TemplateLoadError");
    }

    #[test]
    fn test_capture_error_propagates() {
        let fixture = Fixture::new();
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), fixture.config());
        assert!(matches!(
            auto_talent.is_target_screen(),
            Err(Error::Capture(_))
        ));
    }

    #[test]
    fn test_click_applies_offset() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::default();
        let config = Config {
            click_offset: (-10, -45),
            ..fixture.config()
        };
        let auto_talent = AutoTalent::new(&surface, config);
        let clock = FakeClock::default();

        auto_talent
            .click(Point::new(170, 208), Duration::from_millis(100), &clock)
            .unwrap();
        assert_eq!(
            surface.events(),
            vec![
                InputEvent::LeftDown(Point::new(160, 163)),
                InputEvent::LeftUp(Point::new(160, 163))
            ]
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn test_run_clicks_until_target_screen() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::new([
            fixture.frame(true, &[]),
            fixture.frame(true, &[0]),
            fixture.frame(true, &[0, 2]),
            fixture.frame(true, &[0, 1, 2]),
        ]);
        let auto_talent = AutoTalent::new(&surface, fixture.config());
        let clock = FakeClock::default();

        let button = auto_talent.locate_button().unwrap();
        let report = auto_talent
            .run(button, &RetryPolicy::default(), &clock)
            .unwrap();

        // frames 2 and 3 miss a talent, frame 4 is the talent screen
        assert_eq!(report.attempts, 2);
        assert_eq!(surface.clicks(), 2);
        let at_button = |e: &InputEvent| match e {
            InputEvent::LeftDown(p) | InputEvent::LeftUp(p) => *p == button,
        };
        assert!(surface.events().iter().all(at_button));
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(3500),
                Duration::from_millis(100),
                Duration::from_millis(3500),
            ]
        );
        assert_eq!(report.elapsed, Duration::from_millis(7200));
    }

    #[test]
    fn test_run_gives_up_after_max_attempts() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::still(fixture.frame(true, &[0, 1]));
        let auto_talent = AutoTalent::new(&surface, fixture.config());
        let clock = FakeClock::default();

        let policy = RetryPolicy::default().with_max_attempts(3);
        let err = auto_talent
            .run(fixture.button_center(), &policy, &clock)
            .unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(surface.clicks(), 3);
        assert_eq!(surface.captures(), 4);
    }

    #[test]
    fn test_run_gives_up_after_timeout() {
        let fixture = Fixture::new();
        let surface = ScriptedSurface::still(fixture.frame(true, &[]));
        let auto_talent = AutoTalent::new(&surface, fixture.config());
        let clock = FakeClock::default();

        // each attempt takes 3.6s of fake time
        let policy = RetryPolicy::default().with_timeout(Duration::from_secs(10));
        let err = auto_talent
            .run(fixture.button_center(), &policy, &clock)
            .unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_template_larger_than_frame() {
        let fixture = Fixture::new();
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), fixture.config());
        let tiny = FrameBuffer::from_fn(8, 8, |_, _| [0, 0, 0, 255]);
        assert!(matches!(
            auto_talent.locate_button_in(&tiny),
            Err(Error::Match(MatchError::TemplateTooLarge { .. }))
        ));
    }

    #[test]
    fn test_gray_frame_matches_gray_template() {
        // templates saved as grayscale PNGs match captures converted from BGRA
        let dir = tempfile::tempdir().unwrap();
        let gray = GrayImage::from_fn(20, 12, |x, y| Luma([((x * 13 + y * 29) % 256) as u8]));
        gray.save(dir.path().join("button.png")).unwrap();
        let frame = FrameBuffer::from_fn(64, 48, |x, y| {
            if (10..30).contains(&x) && (5..17).contains(&y) {
                let v = gray.get_pixel(x - 10, y - 5).0[0];
                [v, v, v, 255]
            } else {
                [200, 30, 30, 255]
            }
        });
        let config = Config {
            template_dir: PathBuf::from(dir.path()),
            ..Default::default()
        };
        let auto_talent = AutoTalent::new(ScriptedSurface::default(), config);
        assert_eq!(auto_talent.locate_button_in(&frame).unwrap(), Point::new(20, 11));
    }
}
