use std::process::ExitCode;

use auto_talent::{
    config::{CONFIG_FILE, Config},
    controller::privilege,
    crash::CrashReporter,
};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

fn init_tracing_subscriber() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing_subscriber();

    let config = match Config::load_or_default(CONFIG_FILE) {
        Ok(config) => config,
        Err(err) => {
            let reporter = CrashReporter::new(Config::default().crash_log);
            reporter.report_error(&anyhow::Error::from(err).context("failed to load config"));
            return ExitCode::FAILURE;
        }
    };

    let reporter = CrashReporter::new(&config.crash_log);
    reporter.install_panic_hook();

    if !privilege::is_elevated() {
        info!("not elevated, relaunching as administrator");
        return match privilege::relaunch_elevated() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                reporter.report_error(&anyhow::Error::from(err).context("failed to relaunch"));
                ExitCode::FAILURE
            }
        };
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            reporter.report_error(&err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(all(windows, feature = "windows"))]
fn run(config: Config) -> anyhow::Result<()> {
    use anyhow::Context;
    use auto_talent::{AutoTalent, GdiWindow, SystemClock, controller::windows::set_dpi_aware};
    use color_print::cprintln;

    set_dpi_aware();

    let window = GdiWindow::find(&config.window_title)
        .with_context(|| format!("is '{}' running?", config.window_title))?
        .with_settle_delay(config.capture_settle());
    let policy = config.retry_policy();
    let auto_talent = AutoTalent::new(window, config);

    let button = auto_talent.locate_button()?;
    cprintln!("<g>button</g> at ({}, {})", button.x, button.y);

    let report = auto_talent.run(button, &policy, &SystemClock::new())?;
    cprintln!(
        "<g><strong>done</strong></g> after {} attempts in {:.1}s",
        report.attempts,
        report.elapsed.as_secs_f32()
    );
    Ok(())
}

#[cfg(not(all(windows, feature = "windows")))]
fn run(config: Config) -> anyhow::Result<()> {
    anyhow::bail!(
        "driving '{}' needs a Windows build with the `windows` feature",
        config.window_title
    )
}
