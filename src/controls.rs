use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ColorMode, ConfigPublisher, Configuration, Rgb, MAX_SCALE, MIN_SCALE};

const BAR_STEP: usize = 5;
const FACTOR_STEP: f32 = 0.1;

#[derive(Debug, PartialEq)]
pub enum KeyAction {
    Quit,
    Change(Configuration),
    Ignore,
}

/// Rounds to one decimal so repeated steps do not drift.
fn step(v: f32, delta: f32) -> f32 {
    ((v + delta) * 10.0).round() / 10.0
}

/// What `key` does to `cfg`. The result is not validated here.
pub fn action_for(key: KeyEvent, cfg: &Configuration, fixed_color: Rgb) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    let mut next = cfg.clone();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Up => next.bar_count += BAR_STEP,
        KeyCode::Down => next.bar_count = next.bar_count.saturating_sub(BAR_STEP),
        KeyCode::Char('c') => next.use_caps = !next.use_caps,
        KeyCode::Char('a') => next.auto_scale = !next.auto_scale,
        KeyCode::Char('r') => {
            next.color_mode = match next.color_mode {
                ColorMode::Rainbow => ColorMode::Fixed(fixed_color),
                ColorMode::Fixed(_) => ColorMode::Rainbow,
            }
        }
        KeyCode::Char('[') => next.decay_factor = step(next.decay_factor, -FACTOR_STEP),
        KeyCode::Char(']') => next.decay_factor = step(next.decay_factor, FACTOR_STEP),
        KeyCode::Char(';') => next.cap_decay_factor = step(next.cap_decay_factor, -FACTOR_STEP),
        KeyCode::Char('\'') => next.cap_decay_factor = step(next.cap_decay_factor, FACTOR_STEP),
        // auto-scale skips the scale bound, so keep it in range here
        KeyCode::Char('-') => {
            next.scale = step(next.scale, -FACTOR_STEP).clamp(MIN_SCALE, MAX_SCALE)
        }
        KeyCode::Char('=') | KeyCode::Char('+') => {
            next.scale = step(next.scale, FACTOR_STEP).clamp(MIN_SCALE, MAX_SCALE)
        }
        _ => return KeyAction::Ignore,
    }
    KeyAction::Change(next)
}

/// Polls the keyboard and publishes configuration changes until `running`
/// is cleared.
pub fn spawn_controls(
    publisher: ConfigPublisher,
    initial: Configuration,
    running: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("barscope-controls".into())
        .spawn(move || {
            let mut cfg = initial;
            let fixed_color = match cfg.color_mode {
                ColorMode::Fixed(c) => c,
                ColorMode::Rainbow => Rgb::CYAN,
            };
            while running.load(Ordering::SeqCst) {
                let key = match event::poll(Duration::from_millis(100)) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => k,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("reading input failed: {}", e);
                            continue;
                        }
                    },
                    Ok(false) => continue,
                    Err(e) => {
                        warn!("polling input failed: {}", e);
                        thread::sleep(Duration::from_millis(100));
                        continue;
                    }
                };

                match action_for(key, &cfg, fixed_color) {
                    KeyAction::Quit => running.store(false, Ordering::SeqCst),
                    KeyAction::Change(next) => match publisher.publish(next.clone()) {
                        Ok(()) => {
                            debug!("configuration updated: {:?}", next);
                            cfg = next;
                        }
                        Err(e) => debug!("change rejected: {}", e),
                    },
                    KeyAction::Ignore => {}
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys() {
        let cfg = Configuration::default();
        assert_eq!(action_for(press(KeyCode::Char('q')), &cfg, Rgb::CYAN), KeyAction::Quit);
        assert_eq!(action_for(press(KeyCode::Esc), &cfg, Rgb::CYAN), KeyAction::Quit);
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &cfg, Rgb::CYAN),
            KeyAction::Quit
        );
    }

    #[test]
    fn steps_do_not_drift() {
        let mut cfg = Configuration { decay_factor: 0.5, ..Default::default() };
        for _ in 0..4 {
            match action_for(press(KeyCode::Char(']')), &cfg, Rgb::CYAN) {
                KeyAction::Change(next) => cfg = next,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(cfg.decay_factor, 0.9);
        // one more step leaves the accepted range
        match action_for(press(KeyCode::Char(']')), &cfg, Rgb::CYAN) {
            KeyAction::Change(next) => assert!(next.validate().is_err()),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn apply(cfg: &Configuration, code: KeyCode) -> Configuration {
        match action_for(press(code), cfg, Rgb::CYAN) {
            KeyAction::Change(next) => next,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn manual_scale_stays_in_range_under_auto_scale() {
        let mut cfg = Configuration { auto_scale: true, ..Default::default() };
        for _ in 0..30 {
            cfg = apply(&cfg, KeyCode::Char('-'));
            assert!(cfg.validate().is_ok());
        }
        assert_eq!(cfg.scale, MIN_SCALE);

        let manual = apply(&cfg, KeyCode::Char('a'));
        assert!(!manual.auto_scale);
        assert!(manual.validate().is_ok());

        for _ in 0..60 {
            cfg = apply(&cfg, KeyCode::Char('='));
        }
        assert_eq!(cfg.scale, MAX_SCALE);
    }

    #[test]
    fn cap_decay_keys_step_by_a_tenth() {
        let cfg = Configuration { cap_decay_factor: 0.5, ..Default::default() };
        assert_eq!(apply(&cfg, KeyCode::Char(';')).cap_decay_factor, 0.4);
        assert_eq!(apply(&cfg, KeyCode::Char('\'')).cap_decay_factor, 0.6);
        let top = Configuration { cap_decay_factor: 0.9, ..Default::default() };
        assert!(apply(&top, KeyCode::Char('\'')).validate().is_err());
    }

    #[test]
    fn toggles_color_mode() {
        let cfg = Configuration::default();
        let KeyAction::Change(next) = action_for(press(KeyCode::Char('r')), &cfg, Rgb::RED) else {
            panic!("expected a change");
        };
        assert_eq!(next.color_mode, ColorMode::Rainbow);
        let KeyAction::Change(back) = action_for(press(KeyCode::Char('r')), &next, Rgb::RED) else {
            panic!("expected a change");
        };
        assert_eq!(back.color_mode, ColorMode::Fixed(Rgb::RED));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = Configuration::default();
        assert_eq!(action_for(press(KeyCode::Char('x')), &cfg, Rgb::CYAN), KeyAction::Ignore);
    }
}
