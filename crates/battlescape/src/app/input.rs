use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    LevelUp,
    LevelDown,
    CenterOnUnit,
    NextUnit,
    Quit,
}

const ACTION_COUNT: usize = 5;

/// Held state plus a press edge per action. Edges survive until the next
/// tick snapshot consumes them, so a key held across ticks fires once.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let idx = action.index();
        if is_down && !self.down[idx] {
            self.pressed[idx] = true;
        }
        self.down[idx] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::LevelUp => 0,
            InputAction::LevelDown => 1,
            InputAction::CenterOnUnit => 2,
            InputAction::NextUnit => 3,
            InputAction::Quit => 4,
        }
    }

    pub(crate) fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::PageUp | KeyCode::KeyE => Some(InputAction::LevelUp),
            KeyCode::PageDown | KeyCode::KeyQ => Some(InputAction::LevelDown),
            KeyCode::KeyC | KeyCode::Home => Some(InputAction::CenterOnUnit),
            KeyCode::Tab => Some(InputAction::NextUnit),
            KeyCode::Escape => Some(InputAction::Quit),
            _ => None,
        }
    }
}
