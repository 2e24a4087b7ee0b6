use anyhow::{Context, Result};
use barscope::{
    audio, config_channel, controls::spawn_controls, ColorMode, Configuration, FrameDriver,
    FrameQueue, SettingsStore, StoredSettings, TerminalRenderer, TerminalSession,
};
use clap::Parser;
use crossbeam::channel::bounded;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tracing::{error, info, warn, Level};

const DEFAULT_FRAME_LEN: usize = 2048;
const MIN_FRAME_LEN: usize = 256;

/// Real-time audio spectrum bars in the terminal.
#[derive(Parser)]
#[command(name = "barscope", version)]
struct Cli {
    /// input device name (substring match, case-insensitive)
    #[arg(short, long)]
    device: Option<String>,

    /// list input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// settings document
    #[arg(long, default_value = "barscope.json")]
    config: PathBuf,

    /// number of bars (10-100)
    #[arg(short, long)]
    bars: Option<usize>,

    /// manual sensitivity (0.1-5)
    #[arg(short, long)]
    scale: Option<f32>,

    /// adapt sensitivity to the signal
    #[arg(long)]
    auto_scale: bool,

    /// draw peak caps
    #[arg(long)]
    caps: bool,

    /// bar color: rainbow, cyan, red, green, blue, yellow or r,g,b
    #[arg(long)]
    color: Option<ColorMode>,

    /// bar decay factor (0.0-0.9)
    #[arg(long)]
    decay: Option<f32>,

    /// cap decay factor (0.0-0.9)
    #[arg(long)]
    cap_decay: Option<f32>,

    /// samples per analyzed frame
    #[arg(long, default_value_t = DEFAULT_FRAME_LEN)]
    frame_length: usize,

    /// log file (the terminal is used for drawing)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// do not write the settings document
    #[arg(long)]
    no_save: bool,

    /// verbose per-frame logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut StoredSettings) {
        if let Some(d) = &self.device {
            settings.device = Some(d.clone());
        }
        if let Some(b) = self.bars {
            settings.bars = b;
        }
        if let Some(s) = self.scale {
            settings.scale = s;
        }
        if self.auto_scale {
            settings.auto_scale = true;
        }
        if self.caps {
            settings.use_caps = true;
        }
        if let Some(c) = self.color {
            settings.color = c;
        }
        if let Some(d) = self.decay {
            settings.decay_factor = d;
        }
        if let Some(d) = self.cap_decay {
            settings.cap_decay_factor = d;
        }
        if self.debug {
            settings.debug_output = true;
        }
    }
}

fn init_logging(path: &Path, debug: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_max_level(if debug { Level::DEBUG } else { Level::INFO })
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        for (i, name) in audio::input_device_names()?.iter().enumerate() {
            println!("{i}: {name}");
        }
        return Ok(());
    }

    anyhow::ensure!(
        cli.frame_length >= MIN_FRAME_LEN,
        "frame length must be at least {MIN_FRAME_LEN} samples"
    );

    let store = SettingsStore::new(cli.config.clone());
    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("barscope.log"));

    // The log level follows the stored debug flag, so peek before the
    // soft load below reports anything.
    let stored_debug = store
        .load()
        .map(|s| s.debug_output)
        .unwrap_or(StoredSettings::default().debug_output);
    init_logging(&log_path, cli.debug || stored_debug)?;

    let mut settings = store.load_or_default();
    cli.apply_overrides(&mut settings);
    let cfg: Configuration = settings.to_config();
    cfg.validate().context("invalid settings")?;

    if !cli.no_save {
        if let Err(e) = store.save(&settings) {
            warn!("{}", e);
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let frames = Arc::new(FrameQueue::new(barscope::buffer::DEFAULT_QUEUE_FRAMES));
    let (err_tx, err_rx) = bounded(8);
    let capture = audio::start_capture(
        settings.device.as_deref(),
        Arc::clone(&frames),
        cli.frame_length,
        err_tx,
    )?;

    let result = {
        let _session = TerminalSession::enter().context("cannot set up terminal")?;
        let title = format!(
            "barscope  |  input: {} ({} Hz, {} ch)",
            capture.device_name, capture.sample_rate, capture.channels
        );
        let renderer = TerminalRenderer::stdout(title)?;
        let (publisher, inbox) = config_channel();
        let controls = spawn_controls(publisher, cfg.clone(), Arc::clone(&running))?;

        let mut driver = FrameDriver::new(
            cfg,
            renderer,
            Arc::clone(&frames),
            inbox,
            err_rx,
            Arc::clone(&running),
        );
        let result = driver.run();
        running.store(false, Ordering::SeqCst);
        if controls.join().is_err() {
            warn!("control thread panicked");
        }

        if !cli.no_save {
            let final_settings = StoredSettings::from_config(driver.config(), settings.device.clone());
            if let Err(e) = store.save(&final_settings) {
                warn!("{}", e);
            }
        }
        result
    };
    drop(capture);

    match result {
        Ok(()) => {
            info!("bye");
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(anyhow::Error::new(e).context("barscope stopped"))
        }
    }
}
