use maze_runner::args::{Args, Mode};
use maze_runner::config::{AppConfig, DEFAULT_TEMPLATES_DIR, JsonConfigProvider, default_config_path};
use maze_runner::desktop::{DesktopError, DesktopResult, EnigoInput, ScreenSource, XcapScreen};
use maze_runner::game_automation::{
    AutomationEvent, BotConfig, MazeBot, ParamMap, StopHandle, create_automation_channels,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const SCREENSHOT_FILE: &str = "maze-screenshot.png";

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    let config_path = args.config_path.clone().or_else(default_config_path);
    let app_config = config_path
        .as_deref()
        .map(AppConfig::load_or_default)
        .unwrap_or_default();
    let debug = args.debug_mode || app_config.debug;

    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.mode == Mode::ListWindows {
        return list_windows();
    }

    let Some(title) = args.title.clone().or(app_config.title) else {
        log::error!("❌ No window title given, use --title=<substr> or set \"title\" in the config");
        return ExitCode::FAILURE;
    };
    let templates_dir = args
        .templates_dir
        .clone()
        .or(app_config.templates_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));

    match args.mode {
        Mode::Screenshot => screenshot(&title),
        _ => {
            let config = BotConfig {
                title,
                templates_dir,
                debug,
            };
            run_bot(config, config_path, args.timeout_secs).await
        }
    }
}

fn list_windows() -> ExitCode {
    match XcapScreen::list_titles() {
        Ok(titles) => {
            for title in titles {
                println!("{title}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn screenshot(title: &str) -> ExitCode {
    let mut screen = XcapScreen::new();
    let result = screen.bind(title).and_then(|binding| {
        let image = screen.capture(&binding)?;
        image
            .save(SCREENSHOT_FILE)
            .map_err(|e| DesktopError::ScreenshotSaveFailed {
                description: e.to_string(),
            })?;
        Ok(binding)
    });
    match result {
        Ok(binding) => {
            log::info!(
                "✅ Captured '{}' ({}x{}) to {SCREENSHOT_FILE}",
                binding.title,
                binding.width,
                binding.height
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ Screenshot failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_bot(config: BotConfig, config_path: Option<PathBuf>, timeout_secs: Option<u64>) -> ExitCode {
    let (sink, mut event_rx) = create_automation_channels();
    let stop = StopHandle::new();

    log::info!("🚀 Starting bot for window '{}'", config.title);

    // The bot loop blocks on capture and input, so it gets its own thread
    let bot_stop = stop.clone();
    let bot_thread = std::thread::spawn(move || -> DesktopResult<()> {
        let input = EnigoInput::new(config.debug)?;
        let screen = XcapScreen::new();
        let mut bot = match config_path {
            Some(path) => MazeBot::new(config, screen, input, sink, JsonConfigProvider::new(path)),
            None => MazeBot::new(config, screen, input, sink, ParamMap::new),
        }
        .with_stop_handle(bot_stop);
        bot.run()
    });

    let deadline = tokio::time::sleep(Duration::from_secs(timeout_secs.unwrap_or(0)));
    tokio::pin!(deadline);
    let mut deadline_armed = timeout_secs.is_some();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("🛑 Ctrl-C received, stopping");
                stop.request_stop();
            }
            _ = &mut deadline, if deadline_armed => {
                log::info!("⏱️ Timeout reached, stopping");
                deadline_armed = false;
                stop.request_stop();
            }
            event = event_rx.recv() => match event {
                Some(AutomationEvent::Log(line)) => log::info!("{line}"),
                Some(AutomationEvent::StateChanged(kind)) => log::debug!("State -> {kind}"),
                Some(AutomationEvent::Error(line)) => log::error!("❌ {line}"),
                Some(AutomationEvent::Stopped) | None => break,
            },
        }
    }

    let joined = tokio::task::spawn_blocking(move || bot_thread.join()).await;
    match joined {
        Ok(Ok(Ok(()))) => {
            log::info!("✅ Bot stopped");
            ExitCode::SUCCESS
        }
        Ok(Ok(Err(e))) => {
            log::error!("❌ Bot failed: {e}");
            ExitCode::FAILURE
        }
        _ => {
            log::error!("❌ Bot thread panicked");
            ExitCode::FAILURE
        }
    }
}
