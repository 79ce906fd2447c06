use crate::cli::LocationArgs;
use anyhow::{Result, bail};
use prospector_actors::system::ActorSystem;
use prospector_config::ProspectorConfig;
use prospector_llm::ensure_fetcher_ready;
use prospector_search::geolocation::{FixedLocation, location_source_from_settings};
use prospector_search::{LocationSource, SearchOrchestrator};
use prospector_tui::{TuiActor, spawn_tui_feeders};
use std::sync::Arc;

const TUI_MAILBOX: usize = 256;

/// Command-line coordinates replace whatever source the config names.
pub fn build_locator(
    cfg: &ProspectorConfig,
    overrides: &LocationArgs,
) -> Result<Arc<dyn LocationSource>> {
    if let Some(coordinates) = overrides.fixed() {
        if !coordinates.is_valid() {
            bail!("--lat/--lon out of range: {coordinates}");
        }
        return Ok(Arc::new(FixedLocation::new(coordinates)));
    }
    Ok(location_source_from_settings(&cfg.geolocation)?)
}

pub fn build_orchestrator(
    cfg: &ProspectorConfig,
    overrides: &LocationArgs,
) -> Result<SearchOrchestrator> {
    let fetcher = ensure_fetcher_ready(&cfg.gemini)?;
    let locator = build_locator(cfg, overrides)?;
    Ok(SearchOrchestrator::new(fetcher, locator).with_location_timeout(cfg.geolocation.timeout()))
}

/// Run the interactive UI until the user quits or Ctrl-C arrives.
pub async fn run_tui(orchestrator: SearchOrchestrator, use_location: bool) -> Result<()> {
    let mut system = ActorSystem::new();
    let shutdown = system.shutdown_handle();

    let tui = TuiActor::new(orchestrator, use_location, shutdown.clone())?;
    let addr = system.spawn("tui:main", tui, TUI_MAILBOX);
    spawn_tui_feeders(addr, shutdown);

    system.run_until_shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_config::{LocationProvider, ProspectorConfigLoader};

    fn config(yaml: &str) -> ProspectorConfig {
        ProspectorConfigLoader::new()
            .with_yaml_str(yaml)
            .load()
            .expect("config loads")
    }

    #[test]
    fn cli_coordinates_override_config_source() {
        let cfg = config("geolocation:\n  provider: none\n");
        assert_eq!(cfg.geolocation.provider, LocationProvider::None);

        let overrides = LocationArgs {
            lat: Some(10.0),
            lon: Some(20.0),
            ..LocationArgs::default()
        };
        assert_eq!(build_locator(&cfg, &overrides).unwrap().name(), "fixed");
        assert_eq!(
            build_locator(&cfg, &LocationArgs::default()).unwrap().name(),
            "none"
        );
    }

    #[test]
    fn out_of_range_cli_coordinates_fail_fast() {
        let cfg = config("geolocation:\n  provider: none\n");
        let overrides = LocationArgs {
            lat: Some(100.0),
            lon: Some(0.0),
            ..LocationArgs::default()
        };
        assert!(build_locator(&cfg, &overrides).is_err());
    }
}
