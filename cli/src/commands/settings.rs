//! Settings command - show and change persisted preferences.

use anyhow::{bail, Result};
use portpilot_core::{PageSize, PortBackend, PortPilotEngine, SettingsRepository, Theme};

type Engine<B, R> = PortPilotEngine<B, R>;

pub fn show<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    json: bool,
) -> Result<()> {
    let settings = engine.settings().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let on_off = |b: bool| if b { "on" } else { "off" };
    let layout = settings.sidebar_layout;

    println!("auto-refresh:      {}", on_off(settings.auto_refresh_enabled));
    println!("interval:          {}ms", settings.auto_refresh_interval_ms);
    println!("status bar:        {}", on_off(settings.status_bar_visible));
    println!("page size:         {}", settings.page_size);
    println!("theme:             {}", settings.theme);
    println!("language:          {}", settings.language);
    println!("sidebar:           {}", settings.sidebar_mode.title());
    println!(
        "sidebar layout:    {:.0}/{:.0}{}",
        layout.layout[0],
        layout.layout[1],
        if layout.collapsed { " (collapsed)" } else { "" }
    );
    println!("favorite presets:  {}", settings.favorite_presets.len());
    Ok(())
}

pub async fn interval<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    ms: u64,
) -> Result<()> {
    let stored = engine.set_auto_refresh_interval(ms).await?;
    if stored != ms {
        println!("Interval clamped to {}ms", stored);
    } else {
        println!("Interval set to {}ms", stored);
    }
    Ok(())
}

pub async fn auto_refresh<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    enabled: bool,
) -> Result<()> {
    engine.set_auto_refresh_enabled(enabled).await?;
    println!("Auto refresh {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn status_bar<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    visible: bool,
) -> Result<()> {
    engine.settings().set_status_bar_visible(visible).await?;
    println!("Status bar {}", if visible { "shown" } else { "hidden" });
    Ok(())
}

pub async fn page_size<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    size: usize,
) -> Result<()> {
    let size = PageSize::try_from(size)?;
    engine.set_page_size(size).await?;
    println!("Page size set to {}", size);
    Ok(())
}

pub async fn theme<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    theme: &str,
) -> Result<()> {
    let theme: Theme = theme.parse()?;
    engine.set_theme(theme).await?;
    println!("Theme set to {}", theme);
    Ok(())
}

pub async fn language<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    code: &str,
) -> Result<()> {
    engine.set_language(code).await?;
    println!("Language set to {}", engine.language());
    Ok(())
}

pub async fn add_preset<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    label: &str,
    query: &str,
) -> Result<()> {
    if !engine.add_preset(label, query).await? {
        bail!("Preset not added: label and query must be non-empty and not already saved");
    }
    println!("Added preset \"{}\"", label.trim());
    Ok(())
}

pub async fn remove_preset<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    number: usize,
) -> Result<()> {
    let removed = match number.checked_sub(1) {
        Some(index) => engine.remove_preset(index).await?,
        None => None,
    };
    match removed {
        Some(preset) => println!("Removed preset \"{}\"", preset.label),
        None => bail!("No preset #{}", number),
    }
    Ok(())
}

pub fn list_presets<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &Engine<B, R>,
    json: bool,
) -> Result<()> {
    let presets = engine.presets();

    if json {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    if presets.is_empty() {
        println!("No favorite presets.");
        return Ok(());
    }

    for (i, preset) in presets.iter().enumerate() {
        println!("{:>2}. {:<24} {}", i + 1, preset.label, preset.query);
    }
    Ok(())
}
