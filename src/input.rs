use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControlKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Backspace,
    Esc,
    Interrupt,
}

/// One polled keystroke: a raw control key or a printable character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Char(char),
    Control(ControlKey),
}

pub(crate) fn collect_input_nonblocking() -> anyhow::Result<Vec<Input>> {
    let mut out = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Press && k.kind != KeyEventKind::Repeat {
                continue;
            }
            if let Some(input) = map_key(k.code, k.modifiers) {
                out.push(input);
            }
            if out.len() >= 32 {
                break;
            }
        }
    }
    Ok(out)
}

fn map_key(code: KeyCode, mods: KeyModifiers) -> Option<Input> {
    use ControlKey::*;
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c' | 'C')) {
        return Some(Input::Control(Interrupt));
    }
    Some(match code {
        KeyCode::Up => Input::Control(Up),
        KeyCode::Down => Input::Control(Down),
        KeyCode::Left => Input::Control(Left),
        KeyCode::Right => Input::Control(Right),
        KeyCode::Enter => Input::Control(Enter),
        KeyCode::Backspace => Input::Control(Backspace),
        KeyCode::Esc => Input::Control(Esc),
        KeyCode::Char(ch) if !ch.is_control() => Input::Char(ch),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_c_is_interrupt_not_text() {
        assert_eq!(
            map_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Input::Control(ControlKey::Interrupt))
        );
        assert_eq!(
            map_key(KeyCode::Char('c'), KeyModifiers::NONE),
            Some(Input::Char('c'))
        );
        assert_eq!(map_key(KeyCode::F(2), KeyModifiers::NONE), None);
    }
}
