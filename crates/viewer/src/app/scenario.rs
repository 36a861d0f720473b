use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use battlescape::map::{Direction, GridPosition, MapDimensions};
use battlescape::world::{Battlefield, BattlefieldError, LayerSlot, TerrainTable};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Symbol for an empty layer slot in a row string.
const EMPTY_SYMBOL: char = '.';

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scenario json at {json_path}: {source}")]
    Parse {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("legend symbol '{symbol}' is reserved for empty slots")]
    ReservedSymbol { symbol: char },
    #[error("legend symbol '{symbol}' names unknown terrain object '{name}'")]
    UnknownTerrain { symbol: char, name: String },
    #[error("level {z} is defined more than once")]
    DuplicateLevel { z: i32 },
    #[error("level {z} {layer:?} has {actual} rows, expected {expected}")]
    RowCount {
        z: i32,
        layer: LayerSlot,
        expected: usize,
        actual: usize,
    },
    #[error("level {z} {layer:?} row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        z: i32,
        layer: LayerSlot,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("level {z} {layer:?} row {row} uses symbol '{symbol}' missing from the legend")]
    UnknownSymbol {
        z: i32,
        layer: LayerSlot,
        row: usize,
        symbol: char,
    },
    #[error("selected unit '{0}' is not in the unit list")]
    UnknownSelectedUnit(String),
    #[error(transparent)]
    Battlefield(#[from] BattlefieldError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    name: String,
    width: i32,
    length: i32,
    height: i32,
    legend: BTreeMap<char, String>,
    levels: Vec<LevelDef>,
    #[serde(default)]
    units: Vec<UnitDef>,
    #[serde(default)]
    selected: Option<String>,
    #[serde(default)]
    path: Vec<Direction>,
    #[serde(default)]
    doors: Vec<DoorDef>,
}

/// Rows are indexed by grid y, characters by grid x.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelDef {
    z: i32,
    #[serde(default)]
    floor: Vec<String>,
    #[serde(default)]
    west_walls: Vec<String>,
    #[serde(default)]
    north_walls: Vec<String>,
    #[serde(default)]
    objects: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitDef {
    name: String,
    position: GridPosition,
    #[serde(default)]
    direction: Direction,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DoorDef {
    position: GridPosition,
    frame: u8,
}

/// A loaded scenario: the battlefield plus its display name.
#[derive(Debug)]
pub(crate) struct Scenario {
    pub(crate) name: String,
    pub(crate) battlefield: Battlefield,
}

pub(crate) fn load_scenario(
    path: &Path,
    terrain: Arc<TerrainTable>,
) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario = parse_scenario(&raw, terrain)?;
    let dims = scenario.battlefield.dimensions();
    info!(
        path = %path.display(),
        name = scenario.name.as_str(),
        width = dims.width,
        length = dims.length,
        height = dims.height,
        units = scenario.battlefield.units().len(),
        "scenario_loaded"
    );
    Ok(scenario)
}

pub(crate) fn parse_scenario(
    raw: &str,
    terrain: Arc<TerrainTable>,
) -> Result<Scenario, ScenarioError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file: ScenarioFile =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ScenarioError::Parse {
                json_path,
                source: error.into_inner(),
            }
        })?;
    build_battlefield(file, terrain)
}

fn build_battlefield(
    file: ScenarioFile,
    terrain: Arc<TerrainTable>,
) -> Result<Scenario, ScenarioError> {
    let mut legend = BTreeMap::new();
    for (symbol, name) in &file.legend {
        if *symbol == EMPTY_SYMBOL {
            return Err(ScenarioError::ReservedSymbol { symbol: *symbol });
        }
        let id = terrain
            .id_by_name(name)
            .ok_or_else(|| ScenarioError::UnknownTerrain {
                symbol: *symbol,
                name: name.clone(),
            })?;
        legend.insert(*symbol, id);
    }

    let dimensions = MapDimensions {
        width: file.width,
        length: file.length,
        height: file.height,
    };
    let mut battlefield = Battlefield::new(dimensions, terrain)?;

    let mut seen_levels = HashSet::new();
    for level in &file.levels {
        if !seen_levels.insert(level.z) {
            return Err(ScenarioError::DuplicateLevel { z: level.z });
        }
        for (slot, rows) in [
            (LayerSlot::Floor, &level.floor),
            (LayerSlot::WestWall, &level.west_walls),
            (LayerSlot::NorthWall, &level.north_walls),
            (LayerSlot::Object, &level.objects),
        ] {
            if rows.is_empty() {
                continue;
            }
            let expected_rows = dimensions.length as usize;
            if rows.len() != expected_rows {
                return Err(ScenarioError::RowCount {
                    z: level.z,
                    layer: slot,
                    expected: expected_rows,
                    actual: rows.len(),
                });
            }
            for (y, row) in rows.iter().enumerate() {
                let cells: Vec<char> = row.chars().collect();
                if cells.len() != dimensions.width as usize {
                    return Err(ScenarioError::RowWidth {
                        z: level.z,
                        layer: slot,
                        row: y,
                        expected: dimensions.width as usize,
                        actual: cells.len(),
                    });
                }
                for (x, symbol) in cells.into_iter().enumerate() {
                    if symbol == EMPTY_SYMBOL {
                        continue;
                    }
                    let id = legend.get(&symbol).copied().ok_or(ScenarioError::UnknownSymbol {
                        z: level.z,
                        layer: slot,
                        row: y,
                        symbol,
                    })?;
                    let pos = GridPosition::new(x as i32, y as i32, level.z);
                    battlefield.set_layer(pos, slot, Some(id))?;
                }
            }
        }
    }

    for door in &file.doors {
        battlefield.set_door_frame(door.position, door.frame)?;
    }

    let mut selected = None;
    for unit in &file.units {
        let id = battlefield.spawn_unit(unit.name.clone(), unit.position, unit.direction)?;
        if file.selected.as_deref() == Some(unit.name.as_str()) {
            selected = Some(id);
        }
    }
    if let Some(name) = &file.selected {
        let id = selected.ok_or_else(|| ScenarioError::UnknownSelectedUnit(name.clone()))?;
        battlefield.set_selected_unit(Some(id))?;
        battlefield.queue_path(file.path.iter().copied());
    }

    Ok(Scenario {
        name: file.name,
        battlefield,
    })
}
