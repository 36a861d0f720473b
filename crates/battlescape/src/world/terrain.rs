use std::collections::HashMap;

/// Number of animation frames every terrain object cycles through.
pub const TERRAIN_ANIMATION_FRAMES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerrainObjectId(pub u32);

/// Time-unit costs to cross an object. Carried for the pathfinder; the
/// renderer never reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveCosts {
    pub walk: i32,
    pub fly: i32,
    pub slide: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainFlags {
    pub ufo_door: bool,
    pub stop_los: bool,
    pub no_floor: bool,
    pub block_smoke: bool,
}

/// Smallest building block of battlescape terrain: one floor, wall or object
/// sprite with its drawing and height properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainObject {
    pub id: TerrainObjectId,
    pub name: String,
    pub sprite_sheet: String,
    pub sprite_frames: [u16; TERRAIN_ANIMATION_FRAMES],
    pub y_offset: i32,
    pub terrain_level: i32,
    pub flags: TerrainFlags,
    pub move_costs: MoveCosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRef<'a> {
    pub sheet: &'a str,
    pub index: usize,
}

impl TerrainObject {
    pub fn is_animated_door(&self) -> bool {
        self.flags.ufo_door
    }

    /// Sprite for an animation frame. Doors ignore the shared animation frame
    /// and show `door_frame`, which stays 0 until game logic opens them.
    pub fn sprite_for(&self, animation_frame: u8, door_frame: u8) -> SpriteRef<'_> {
        let frame = if self.is_animated_door() {
            door_frame
        } else {
            animation_frame
        };
        let frame = frame as usize % TERRAIN_ANIMATION_FRAMES;
        SpriteRef {
            sheet: &self.sprite_sheet,
            index: self.sprite_frames[frame] as usize,
        }
    }
}

/// Read-only terrain object store. Ids are assigned in insertion order.
#[derive(Debug, Default, Clone)]
pub struct TerrainTable {
    objects: Vec<TerrainObject>,
    ids_by_name: HashMap<String, TerrainObjectId>,
}

impl TerrainTable {
    pub fn from_objects(mut objects: Vec<TerrainObject>) -> Self {
        let mut ids_by_name = HashMap::with_capacity(objects.len());
        for (idx, object) in objects.iter_mut().enumerate() {
            let id = TerrainObjectId(idx as u32);
            object.id = id;
            ids_by_name.insert(object.name.clone(), id);
        }
        Self {
            objects,
            ids_by_name,
        }
    }

    pub fn id_by_name(&self, name: &str) -> Option<TerrainObjectId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn get(&self, id: TerrainObjectId) -> Option<&TerrainObject> {
        self.objects.get(id.0 as usize)
    }

    pub fn objects(&self) -> &[TerrainObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_object(name: &str, terrain_level: i32) -> TerrainObject {
    TerrainObject {
        id: TerrainObjectId(0),
        name: name.to_string(),
        sprite_sheet: "terrain".to_string(),
        sprite_frames: [0, 1, 2, 3, 4, 5, 6, 7],
        y_offset: 0,
        terrain_level,
        flags: TerrainFlags::default(),
        move_costs: MoveCosts::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_assigns_ids_in_insertion_order() {
        let table = TerrainTable::from_objects(vec![
            test_object("grass", 0),
            test_object("crate", -8),
        ]);
        assert_eq!(table.id_by_name("grass"), Some(TerrainObjectId(0)));
        assert_eq!(table.id_by_name("crate"), Some(TerrainObjectId(1)));
        assert_eq!(
            table.get(TerrainObjectId(1)).map(|obj| obj.terrain_level),
            Some(-8)
        );
        assert!(table.get(TerrainObjectId(2)).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn animated_objects_follow_the_animation_frame() {
        let mut object = test_object("smoke", 0);
        object.sprite_frames = [10, 11, 12, 13, 14, 15, 16, 17];
        assert_eq!(object.sprite_for(5, 0).index, 15);
    }

    #[test]
    fn doors_use_the_door_frame_not_the_animation_frame() {
        let mut door = test_object("ufo_door", 0);
        door.flags.ufo_door = true;
        door.sprite_frames = [20, 21, 22, 23, 24, 25, 26, 27];
        assert_eq!(door.sprite_for(5, 0).index, 20);
        assert_eq!(door.sprite_for(5, 3).index, 23);
    }
}
