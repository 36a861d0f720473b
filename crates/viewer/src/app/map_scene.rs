use battlescape::map::{GridPosition, MapView};
use battlescape::world::{Battlefield, UnitStatus};
use battlescape::{apply_view_actions, InputSnapshot, Scene, SceneCommand};
use tracing::{debug, info, warn};

use super::orders::straight_path;

/// The viewer's only scene: map navigation plus click-to-select and
/// click-to-walk for the selected unit.
pub(crate) struct BattlescapeScene {
    scenario_name: String,
}

impl BattlescapeScene {
    pub(crate) fn new(scenario_name: impl Into<String>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
        }
    }

    fn handle_click(&self, view: &MapView, battlefield: &mut Battlefield) {
        let target = view.selection().at_level(view.camera().active_level());

        if let Some(clicked) = battlefield.select_unit(target) {
            let id = clicked.id();
            let name = clicked.name().to_string();
            if battlefield.selected_unit_id() != Some(id) {
                if battlefield.selection_locked() {
                    debug!(unit = name.as_str(), "unit_selection_ignored_unit_walking");
                    return;
                }
                match battlefield.set_selected_unit(Some(id)) {
                    Ok(()) => info!(unit = name.as_str(), "unit_selected"),
                    Err(error) => warn!(error = %error, "unit_selection_failed"),
                }
            }
            return;
        }

        let Some(unit) = battlefield.selected_unit() else {
            debug!("walk_order_ignored_no_unit");
            return;
        };
        if unit.status() != UnitStatus::Standing {
            debug!(unit = unit.name(), "walk_order_ignored_unit_busy");
            return;
        }

        let from = unit.position();
        let goal = GridPosition::new(target.x, target.y, from.z);
        let path = straight_path(from, goal);
        if path.is_empty() {
            return;
        }
        info!(
            unit = unit.name(),
            steps = path.len(),
            goal_x = goal.x,
            goal_y = goal.y,
            "walk_order_queued"
        );
        battlefield.clear_path();
        battlefield.queue_path(path);
    }
}

impl Scene for BattlescapeScene {
    fn load(&mut self, view: &mut MapView, battlefield: &mut Battlefield) {
        if let Some(unit) = battlefield.selected_unit() {
            view.center_on(unit.position());
        }
        info!(scenario = self.scenario_name.as_str(), "scene_loaded");
    }

    fn update(
        &mut self,
        input: &InputSnapshot,
        view: &mut MapView,
        battlefield: &mut Battlefield,
    ) -> SceneCommand {
        if apply_view_actions(input, view, battlefield) == SceneCommand::Quit {
            return SceneCommand::Quit;
        }
        if input.left_click_pressed() {
            self.handle_click(view, battlefield);
        }
        SceneCommand::None
    }

    fn debug_title(&self, view: &MapView, battlefield: &Battlefield) -> Option<String> {
        let cell = view.selected_cell();
        let unit = battlefield
            .selected_unit()
            .map_or("none", |unit| unit.name());
        Some(format!(
            "Battlescape | {} | level {} | cell ({}, {}) | unit {}",
            self.scenario_name,
            view.camera().active_level(),
            cell.x,
            cell.y,
            unit
        ))
    }
}
