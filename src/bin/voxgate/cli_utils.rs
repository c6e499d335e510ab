use anyhow::Result;
use voxgate::audio::CpalHost;
use voxgate::config::AppConfig;
use voxgate::output::{ConsoleEmitter, ConsoleStyle, KeyEmitter};

pub(crate) fn list_input_devices() -> Result<()> {
    // Support VOXGATE_TEST_DEVICES for testing
    let devices = if let Ok(raw) = std::env::var("VOXGATE_TEST_DEVICES") {
        parse_device_list(&raw)
    } else {
        CpalHost::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.trim()
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn console_style(config: &AppConfig) -> ConsoleStyle {
    if config.json {
        ConsoleStyle::Json
    } else {
        ConsoleStyle::Plain
    }
}

/// True when gate decisions are printed rather than injected as key events.
pub(crate) fn prints_decisions(config: &AppConfig) -> bool {
    config.dry_run || config.json || !cfg!(windows)
}

/// Key injection where the platform supports it, console output otherwise.
pub(crate) fn build_emitter(config: &AppConfig) -> Box<dyn KeyEmitter> {
    if prints_decisions(config) {
        if !config.dry_run && !config.json {
            tracing::warn!("key injection is only available on Windows; printing gate decisions");
        }
        return Box::new(ConsoleEmitter::stdout(console_style(config)));
    }
    injecting_emitter()
}

#[cfg(windows)]
fn injecting_emitter() -> Box<dyn KeyEmitter> {
    Box::new(voxgate::output::SendInputEmitter::new())
}

#[cfg(not(windows))]
fn injecting_emitter() -> Box<dyn KeyEmitter> {
    Box::new(ConsoleEmitter::stdout(ConsoleStyle::Plain))
}
