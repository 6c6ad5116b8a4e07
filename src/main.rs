use color_eyre::{eyre::eyre, Result};
use joystick_mirror::backend::GilrsBackend;
use joystick_mirror::config::MirrorConfig;
use joystick_mirror::DeviceSession;
use std::io::{self, BufRead, Write};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    setup()?;

    let config_path = MirrorConfig::default_path();
    let config = MirrorConfig::ensure_default_config(&config_path)?;
    info!("Using config {}: {:?}", config_path.display(), config);

    let settings = config.reader_settings()?;
    let mut session = DeviceSession::with_settings(GilrsBackend::new(), settings);

    let device_count = session.initialize();
    if device_count == 0 {
        println!("No available joysticks. Exit...");
        return Ok(());
    }
    println!("Number of joysticks: {}\n", device_count);

    let index = match config.device_index {
        Some(index) => index,
        None => prompt_device_index(device_count)?,
    };

    if !session.open(index) {
        return Err(eyre!("Joystick {} could not be opened", index));
    }

    let buttons = session.button_count();
    let axes = session.axis_count();
    println!(
        "Joystick open. Name: {} Buttons: {} Axes: {} Hats: {}\n",
        session.name(),
        buttons,
        axes,
        session.hat_count()
    );

    while session.is_reading() {
        println!("{}", state_line(&session, buttons, axes));
        thread::sleep(config.display_interval());
    }

    warn!("Reader stopped, exiting");
    session.shutdown();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .init();
}

fn prompt_device_index(device_count: usize) -> Result<i32> {
    print!("Enter joystick ID (from 0 to {}): ", device_count - 1);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse()
        .map_err(|e| eyre!("Invalid joystick ID {:?}: {}", line.trim(), e))
}

fn state_line(session: &DeviceSession<GilrsBackend>, buttons: i32, axes: i32) -> String {
    let axes: Vec<String> = (0..axes)
        .map(|i| session.axis_value(i).to_string())
        .collect();
    let buttons: String = (0..buttons)
        .map(|i| if session.button_state(i, false) { "X " } else { "_ " })
        .collect();

    format!(
        "Axes: {} hat value: {} buttons: {}",
        axes.join(":"),
        session.hat_value(),
        buttons
    )
}
