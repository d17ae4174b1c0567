//! Terminal visualiser example.
//!
//! Draws the default input device (or a named one) as an ASCII waveform in
//! the terminal until Ctrl+C is pressed.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example terminal
//! cargo run --example terminal -- --list
//! cargo run --example terminal -- "USB Microphone" --light --bars
//! RUST_LOG=ascii_wave=debug cargo run --example terminal
//! ```

use ascii_wave::source::{default_input_device_name, list_input_devices};
use ascii_wave::{AsciiWave, AudioSource, ChannelSink, Frame, Theme, WaveShape};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Clear screen and home the cursor.
const CLEAR: &str = "\x1b[2J\x1b[H";
const HOME: &str = "\x1b[H";

fn color(frame: &Frame) -> String {
    let [fr, fg, fb] = frame.theme().foreground();
    let [br, bg, bb] = frame.theme().background();
    format!("\x1b[38;2;{fr};{fg};{fb}m\x1b[48;2;{br};{bg};{bb}m")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't tear the picture
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--list") {
        let default = default_input_device_name();
        for name in list_input_devices()? {
            let marker = if Some(&name) == default.as_ref() { "*" } else { " " };
            println!("{marker} {name}");
        }
        return Ok(());
    }

    let source = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map_or_else(AudioSource::default_device, AudioSource::device);
    let theme = if args.iter().any(|a| a == "--light") {
        Theme::Light
    } else {
        Theme::Dark
    };
    let shape = if args.iter().any(|a| a == "--bars") {
        WaveShape::Bars
    } else {
        WaveShape::Wave
    };

    // A couple of frames of slack; the terminal drops frames rather than lag
    let (tx, mut rx) = mpsc::channel::<Frame>(2);

    let session = AsciiWave::builder()
        .source(source)
        .columns(100)
        .rows(21)
        .theme(theme)
        .shape(shape)
        .add_sink(ChannelSink::with_name("terminal", tx))
        .on_event(|e| tracing::warn!(?e, "pipeline event"))
        .start()
        .await?;

    print!("{CLEAR}");
    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                println!(
                    "{HOME}{}{}\x1b[0m\nframe {:>6}  level {:.2}",
                    color(&frame),
                    frame.to_text(),
                    frame.sequence(),
                    frame.level()
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Get stats before stopping (stop() consumes the session)
    let stats = session.stats();
    session.stop().await?;

    println!("\nStats: {stats:?}");
    Ok(())
}
