/// A key as reported by the host. Letters are reported in lowercase with the
/// shift state tracked separately, so `T` arrives as shift + `t` and `?` as
/// shift + `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Shift,
    Other,
}

impl Key {
    pub fn char(c: char) -> Self {
        Self::Char(c.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    PreviousBuild,
    NextBuild,
    ScrollDown,
    ScrollUp,
    TriggerBuild,
    AbortBuild,
    ScrollToBottom,
    ScrollToTop,
    ToggleHelp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordState {
    #[default]
    Idle,
    AwaitingSecond(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardChordState {
    pub chord: ChordState,
    pub shift_held: bool,
    /// Set while the trigger key is down so key-repeat cannot queue more builds.
    pub trigger_held: bool,
}

impl KeyboardChordState {
    pub fn key_down(&mut self, key: Key) -> Option<KeyCommand> {
        let c = match key {
            Key::Shift => {
                self.shift_held = true;
                return None;
            }
            Key::Other => {
                self.chord = ChordState::Idle;
                return None;
            }
            Key::Char(c) => c.to_ascii_lowercase(),
        };

        let prior = std::mem::take(&mut self.chord);
        match (self.shift_held, c) {
            (false, 'h') => Some(KeyCommand::PreviousBuild),
            (false, 'l') => Some(KeyCommand::NextBuild),
            (false, 'j') => Some(KeyCommand::ScrollDown),
            (false, 'k') => Some(KeyCommand::ScrollUp),
            (false, 'g') => {
                if prior == ChordState::AwaitingSecond('g') {
                    Some(KeyCommand::ScrollToTop)
                } else {
                    self.chord = ChordState::AwaitingSecond('g');
                    None
                }
            }
            (true, 't') => {
                if self.trigger_held {
                    None
                } else {
                    self.trigger_held = true;
                    Some(KeyCommand::TriggerBuild)
                }
            }
            (true, 'a') => Some(KeyCommand::AbortBuild),
            (true, 'g') => Some(KeyCommand::ScrollToBottom),
            (true, '/') => Some(KeyCommand::ToggleHelp),
            _ => None,
        }
    }

    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Shift => self.shift_held = false,
            Key::Char(c) if c.eq_ignore_ascii_case(&'t') => self.trigger_held = false,
            _ => {}
        }
    }
}
