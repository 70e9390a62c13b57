#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    ToggleWander,
    CyclePage,
    Quit,
}

const ACTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::ToggleWander => 0,
            InputAction::CyclePage => 1,
            InputAction::Quit => 2,
        }
    }
}
