mod terrain_defs;

pub use terrain_defs::{
    load_terrain_dir, parse_terrain_defs, ContentErrorCode, SourceLocation, TerrainDefError,
};
