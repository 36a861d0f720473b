use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::sprite_keys::validate_sheet_key;
use crate::world::{
    MoveCosts, TerrainFlags, TerrainObject, TerrainObjectId, TerrainTable,
    TERRAIN_ANIMATION_FRAMES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateObject,
    NoObjects,
}

#[derive(Debug, Clone)]
pub struct TerrainDefError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for TerrainDefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for TerrainDefError {}

/// Loads every `*.xml` file under `dir` (sorted by relative path) into one
/// terrain table. Object names must be unique across all files.
pub fn load_terrain_dir(dir: &Path) -> Result<TerrainTable, TerrainDefError> {
    let files = collect_xml_files_sorted(dir).map_err(|error| read_error(error.path, error.source))?;

    let mut names = HashSet::<String>::new();
    let mut objects = Vec::<TerrainObject>::new();
    for file in &files {
        let raw = fs::read_to_string(file).map_err(|source| read_error(file.clone(), source))?;
        for object in parse_terrain_defs(file, &raw)? {
            if !names.insert(object.name.clone()) {
                return Err(TerrainDefError {
                    code: ContentErrorCode::DuplicateObject,
                    message: format!(
                        "terrain object '{}' is defined more than once",
                        object.name
                    ),
                    file_path: file.clone(),
                    location: None,
                });
            }
            objects.push(object);
        }
    }

    if objects.is_empty() {
        return Err(TerrainDefError {
            code: ContentErrorCode::NoObjects,
            message: "no <TerrainObject> definitions found".to_string(),
            file_path: dir.to_path_buf(),
            location: None,
        });
    }

    info!(
        dir = %dir.display(),
        files = files.len(),
        objects = objects.len(),
        "terrain_defs_loaded"
    );
    Ok(TerrainTable::from_objects(objects))
}

/// Parses one `<TerrainDefs>` document. Ids are left at 0; the table
/// assigns them.
pub fn parse_terrain_defs(file_path: &Path, raw: &str) -> Result<Vec<TerrainObject>, TerrainDefError> {
    let doc = Document::parse(raw).map_err(|error| TerrainDefError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "TerrainDefs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <TerrainDefs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut objects = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "TerrainObject" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported element <{}>; expected <TerrainObject>",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        objects.push(parse_terrain_object(file_path, &doc, child)?);
    }
    Ok(objects)
}

fn parse_terrain_object(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<TerrainObject, TerrainDefError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut name: Option<String> = None;
    let mut sheet: Option<String> = None;
    let mut frames: Option<[u16; TERRAIN_ANIMATION_FRAMES]> = None;
    let mut y_offset = 0;
    let mut terrain_level = 0;
    let mut flags = TerrainFlags::default();
    let mut move_costs = MoveCosts::default();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <TerrainObject>"),
                file_path,
                doc,
                field,
            ));
        }

        let text = || required_text(file_path, doc, field, &field_name);
        match field_name.as_str() {
            "name" => name = Some(text()?),
            "sheet" => {
                let value = text()?;
                validate_sheet_key(&value).map_err(|error| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("invalid sheet '{value}': {error}"),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                sheet = Some(value);
            }
            "frames" => frames = Some(parse_frames(file_path, doc, field, &text()?)?),
            "yOffset" => y_offset = parse_int(file_path, doc, field, &text()?)?,
            "terrainLevel" => terrain_level = parse_int(file_path, doc, field, &text()?)?,
            "ufoDoor" => flags.ufo_door = parse_bool(file_path, doc, field, &text()?)?,
            "stopLOS" => flags.stop_los = parse_bool(file_path, doc, field, &text()?)?,
            "noFloor" => flags.no_floor = parse_bool(file_path, doc, field, &text()?)?,
            "blockSmoke" => flags.block_smoke = parse_bool(file_path, doc, field, &text()?)?,
            "tuWalk" => move_costs.walk = parse_int(file_path, doc, field, &text()?)?,
            "tuFly" => move_costs.fly = parse_int(file_path, doc, field, &text()?)?,
            "tuSlide" => move_costs.slide = parse_int(file_path, doc, field, &text()?)?,
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <TerrainObject>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let missing = |field: &str| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("missing required field <{field}> in <TerrainObject>"),
            file_path,
            doc,
            node,
        )
    };
    let name = name.ok_or_else(|| missing("name"))?;
    let sprite_sheet = sheet.ok_or_else(|| missing("sheet"))?;
    let sprite_frames = frames.ok_or_else(|| missing("frames"))?;

    Ok(TerrainObject {
        id: TerrainObjectId(0),
        name,
        sprite_sheet,
        sprite_frames,
        y_offset,
        terrain_level,
        flags,
        move_costs,
    })
}

/// One index for a static object, or one per animation frame.
fn parse_frames(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    value: &str,
) -> Result<[u16; TERRAIN_ANIMATION_FRAMES], TerrainDefError> {
    let invalid = |message: String| {
        error_at_node(ContentErrorCode::InvalidValue, message, file_path, doc, node)
    };
    let indices = value
        .split_whitespace()
        .map(|part| {
            part.parse::<u16>()
                .map_err(|_| invalid(format!("frame index '{part}' is not a valid u16")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match indices.as_slice() {
        [single] => Ok([*single; TERRAIN_ANIMATION_FRAMES]),
        many if many.len() == TERRAIN_ANIMATION_FRAMES => {
            let mut frames = [0; TERRAIN_ANIMATION_FRAMES];
            frames.copy_from_slice(many);
            Ok(frames)
        }
        other => Err(invalid(format!(
            "expected 1 or {TERRAIN_ANIMATION_FRAMES} frame indices, got {}",
            other.len()
        ))),
    }
}

fn parse_int(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    value: &str,
) -> Result<i32, TerrainDefError> {
    value.parse::<i32>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("'{value}' is not a valid integer"),
            file_path,
            doc,
            node,
        )
    })
}

fn parse_bool(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    value: &str,
) -> Result<bool, TerrainDefError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("'{value}' is not a boolean; allowed values: true, false"),
            file_path,
            doc,
            node,
        )),
    }
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, TerrainDefError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> TerrainDefError {
    let pos = doc.text_pos_at(node.range().start);
    TerrainDefError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn read_error(path: PathBuf, source: std::io::Error) -> TerrainDefError {
    TerrainDefError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read terrain definitions: {source}"),
        file_path: path,
        location: None,
    }
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<Vec<TerrainObject>, TerrainDefError> {
        parse_terrain_defs(Path::new("test.xml"), raw)
    }

    #[test]
    fn parses_a_full_object() {
        let objects = parse(
            r#"<TerrainDefs>
  <TerrainObject>
    <name>ufo_door_west</name>
    <sheet>terrain/ufo</sheet>
    <frames>20 21 22 23 24 25 26 27</frames>
    <yOffset>2</yOffset>
    <terrainLevel>-4</terrainLevel>
    <ufoDoor>true</ufoDoor>
    <stopLOS>true</stopLOS>
    <noFloor>false</noFloor>
    <blockSmoke>true</blockSmoke>
    <tuWalk>4</tuWalk>
    <tuFly>4</tuFly>
    <tuSlide>255</tuSlide>
  </TerrainObject>
</TerrainDefs>"#,
        )
        .expect("parse");
        assert_eq!(objects.len(), 1);
        let object = &objects[0];
        assert_eq!(object.name, "ufo_door_west");
        assert_eq!(object.sprite_sheet, "terrain/ufo");
        assert_eq!(object.sprite_frames, [20, 21, 22, 23, 24, 25, 26, 27]);
        assert_eq!(object.y_offset, 2);
        assert_eq!(object.terrain_level, -4);
        assert!(object.flags.ufo_door && object.flags.stop_los && object.flags.block_smoke);
        assert!(!object.flags.no_floor);
        assert_eq!(object.move_costs.slide, 255);
    }

    #[test]
    fn single_frame_index_repeats_for_every_animation_frame() {
        let objects = parse(
            "<TerrainDefs><TerrainObject><name>grass</name><sheet>terrain</sheet>\
<frames>5</frames></TerrainObject></TerrainDefs>",
        )
        .expect("parse");
        assert_eq!(objects[0].sprite_frames, [5; TERRAIN_ANIMATION_FRAMES]);
        assert_eq!(objects[0].terrain_level, 0);
    }

    #[test]
    fn malformed_xml_reports_position() {
        let error = parse("<TerrainDefs>\n  <TerrainObject>\n</TerrainDefs>").expect_err("bad xml");
        assert_eq!(error.code, ContentErrorCode::XmlMalformed);
        assert!(error.location.is_some());
    }

    #[test]
    fn wrong_root_and_unknown_elements_are_rejected() {
        let error = parse("<Defs/>").expect_err("root");
        assert_eq!(error.code, ContentErrorCode::InvalidRoot);

        let error = parse("<TerrainDefs><Unit/></TerrainDefs>").expect_err("def type");
        assert_eq!(error.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn field_errors_point_at_the_field() {
        let error = parse(
            "<TerrainDefs>\n<TerrainObject>\n<name>a</name>\n<name>b</name>\n</TerrainObject>\n</TerrainDefs>",
        )
        .expect_err("duplicate");
        assert_eq!(error.code, ContentErrorCode::DuplicateField);
        assert_eq!(error.location, Some(SourceLocation { line: 4, column: 1 }));

        let error = parse(
            "<TerrainDefs><TerrainObject><name>a</name><colour>red</colour></TerrainObject></TerrainDefs>",
        )
        .expect_err("unknown");
        assert_eq!(error.code, ContentErrorCode::UnknownField);

        let error = parse(
            "<TerrainDefs><TerrainObject><name>a</name><frames>1</frames></TerrainObject></TerrainDefs>",
        )
        .expect_err("missing");
        assert_eq!(error.code, ContentErrorCode::MissingField);
        assert!(error.message.contains("<sheet>"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for body in [
            "<name>a</name><sheet>terrain</sheet><frames>1 2 3</frames>",
            "<name>a</name><sheet>terrain</sheet><frames>x</frames>",
            "<name>a</name><sheet>Terrain</sheet><frames>1</frames>",
            "<name>a</name><sheet>terrain</sheet><frames>1</frames><ufoDoor>yes</ufoDoor>",
            "<name>a</name><sheet>terrain</sheet><frames>1</frames><yOffset>1.5</yOffset>",
        ] {
            let raw = format!("<TerrainDefs><TerrainObject>{body}</TerrainObject></TerrainDefs>");
            let error = parse(&raw).expect_err("invalid");
            assert_eq!(error.code, ContentErrorCode::InvalidValue, "body={body}");
        }
    }

    #[test]
    fn directory_load_merges_files_in_path_order() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir_all(temp.path().join("ufo")).expect("subdir");
        fs::write(
            temp.path().join("b_walls.xml"),
            "<TerrainDefs><TerrainObject><name>wall</name><sheet>terrain</sheet><frames>3</frames></TerrainObject></TerrainDefs>",
        )
        .expect("write");
        fs::write(
            temp.path().join("a_floors.xml"),
            "<TerrainDefs><TerrainObject><name>grass</name><sheet>terrain</sheet><frames>0</frames></TerrainObject></TerrainDefs>",
        )
        .expect("write");
        fs::write(
            temp.path().join("ufo").join("hull.xml"),
            "<TerrainDefs><TerrainObject><name>hull</name><sheet>terrain</sheet><frames>9</frames></TerrainObject></TerrainDefs>",
        )
        .expect("write");
        fs::write(temp.path().join("notes.txt"), "ignored").expect("write");

        let table = load_terrain_dir(temp.path()).expect("load");
        let names: Vec<&str> = table.objects().iter().map(|obj| obj.name.as_str()).collect();
        assert_eq!(names, vec!["grass", "wall", "hull"]);
        assert_eq!(table.id_by_name("hull"), Some(TerrainObjectId(2)));
    }

    #[test]
    fn duplicate_names_across_files_are_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let body = "<TerrainDefs><TerrainObject><name>grass</name><sheet>terrain</sheet><frames>0</frames></TerrainObject></TerrainDefs>";
        fs::write(temp.path().join("a.xml"), body).expect("write");
        fs::write(temp.path().join("b.xml"), body).expect("write");
        let error = load_terrain_dir(temp.path()).expect_err("duplicate");
        assert_eq!(error.code, ContentErrorCode::DuplicateObject);
    }

    #[test]
    fn empty_or_missing_directories_fail() {
        let temp = TempDir::new().expect("temp dir");
        let error = load_terrain_dir(temp.path()).expect_err("empty");
        assert_eq!(error.code, ContentErrorCode::NoObjects);

        let error = load_terrain_dir(&temp.path().join("missing")).expect_err("missing");
        assert_eq!(error.code, ContentErrorCode::ReadFile);
    }
}
