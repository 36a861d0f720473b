use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use battlescape::app::SPRITE_MANIFEST_FILE;
use battlescape::{
    load_terrain_dir, resolve_app_paths, AppPaths, LoopConfig, Scene, SpriteBank, SpriteBankError,
    StartupError, TerrainDefError,
};
use battlescape::world::Battlefield;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::map_scene::BattlescapeScene;
use super::placeholder_art::placeholder_bank;
use super::scenario::{load_scenario, ScenarioError};

pub(crate) const SCENARIO_ENV_VAR: &str = "BATTLESCAPE_SCENARIO";
const DEFAULT_SCENARIO_FILE: &str = "outpost.json";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to load terrain definitions: {0}")]
    Terrain(#[from] TerrainDefError),
    #[error("failed to load scenario: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("failed to load sprites: {0}")]
    Sprites(#[from] SpriteBankError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) battlefield: Battlefield,
    pub(crate) sprites: SpriteBank,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Battlescape Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        base_content_dir = %paths.base_content_dir.display(),
        "startup"
    );

    let terrain = Arc::new(load_terrain_dir(&paths.terrain_dir)?);
    let scenario_path = resolve_scenario_path(&paths)?;
    let scenario = load_scenario(&scenario_path, terrain)?;
    let sprites = load_sprites(&paths, &scenario.battlefield)?;

    let config = LoopConfig {
        window_title: format!("Battlescape | {}", scenario.name),
        ..LoopConfig::default()
    };
    Ok(AppWiring {
        config,
        scene: Box::new(BattlescapeScene::new(scenario.name)),
        battlefield: scenario.battlefield,
        sprites,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_scenario_path(paths: &AppPaths) -> Result<PathBuf, BootstrapError> {
    let from_env = match env::var(SCENARIO_ENV_VAR) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(BootstrapError::EnvVar {
                var: SCENARIO_ENV_VAR,
                source,
            })
        }
    };
    Ok(scenario_path_for(paths, from_env.as_deref()))
}

/// Bare file names resolve inside the scenario directory; anything with a
/// directory component is taken as given.
fn scenario_path_for(paths: &AppPaths, requested: Option<&str>) -> PathBuf {
    let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
        return paths.scenarios_dir.join(DEFAULT_SCENARIO_FILE);
    };
    let requested = PathBuf::from(requested);
    if requested.components().count() == 1 && !requested.is_absolute() {
        paths.scenarios_dir.join(requested)
    } else {
        requested
    }
}

fn load_sprites(paths: &AppPaths, battlefield: &Battlefield) -> Result<SpriteBank, SpriteBankError> {
    if paths.sprites_dir.join(SPRITE_MANIFEST_FILE).is_file() {
        SpriteBank::load(&paths.sprites_dir)
    } else {
        info!(
            dir = %paths.sprites_dir.display(),
            "sprite_manifest_missing_using_placeholders"
        );
        placeholder_bank(battlefield)
    }
}
