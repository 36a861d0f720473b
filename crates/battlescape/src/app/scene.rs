use tracing::{debug, info, warn};

use crate::map::MapView;
use crate::world::Battlefield;

use super::input::ActionStates;
use super::InputAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Input gathered since the previous tick. Press edges are reported once.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    left_click_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        left_click_pressed: bool,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            left_click_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

/// Game logic driving the map between animation ticks. The loop owns the
/// view and the battlefield and lends both to the scene each tick.
pub trait Scene {
    fn load(&mut self, _view: &mut MapView, _battlefield: &mut Battlefield) {}
    fn update(
        &mut self,
        input: &InputSnapshot,
        view: &mut MapView,
        battlefield: &mut Battlefield,
    ) -> SceneCommand;
    fn debug_title(&self, _view: &MapView, _battlefield: &Battlefield) -> Option<String> {
        None
    }
}

/// Applies the map navigation keys shared by every battlescape scene:
/// level changes, centring on the selected unit and cycling the selection.
pub fn apply_view_actions(
    input: &InputSnapshot,
    view: &mut MapView,
    battlefield: &mut Battlefield,
) -> SceneCommand {
    if input.quit_requested() || input.was_pressed(InputAction::Quit) {
        return SceneCommand::Quit;
    }
    if input.was_pressed(InputAction::LevelUp) {
        view.level_up();
    }
    if input.was_pressed(InputAction::LevelDown) {
        view.level_down();
    }
    if input.was_pressed(InputAction::NextUnit) && select_next_unit(battlefield) {
        if let Some(unit) = battlefield.selected_unit() {
            info!(unit = unit.name(), "unit_selected");
            view.center_on(unit.position());
        }
    }
    if input.was_pressed(InputAction::CenterOnUnit) {
        match battlefield.selected_unit() {
            Some(unit) => view.center_on(unit.position()),
            None => debug!("center_on_unit_ignored_no_selection"),
        }
    }
    SceneCommand::None
}

/// Returns whether the selection moved.
fn select_next_unit(battlefield: &mut Battlefield) -> bool {
    if battlefield.selection_locked() {
        debug!("unit_selection_ignored_unit_walking");
        return false;
    }
    let units = battlefield.units();
    if units.is_empty() {
        return false;
    }
    let next = match battlefield.selected_unit_id() {
        Some(current) => units
            .iter()
            .position(|unit| unit.id() == current)
            .map_or(0, |idx| (idx + 1) % units.len()),
        None => 0,
    };
    let id = units[next].id();
    match battlefield.set_selected_unit(Some(id)) {
        Ok(()) => true,
        Err(error) => {
            warn!(error = %error, "unit_selection_failed");
            false
        }
    }
}
