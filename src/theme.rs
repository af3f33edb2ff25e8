use std::collections::HashMap;

/// Semantic color names. The core only ever hands these around; `render`
/// turns them into terminal colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ColorToken {
    Plain,
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    Pink,
    Grey,
    Bright,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ColorMap {
    by_char: HashMap<char, ColorToken>,
    default: ColorToken,
}

impl ColorMap {
    pub(crate) fn new(default: ColorToken) -> Self {
        Self {
            by_char: HashMap::new(),
            default,
        }
    }

    pub(crate) fn with(mut self, chars: &str, token: ColorToken) -> Self {
        for ch in chars.chars() {
            self.by_char.insert(ch, token);
        }
        self
    }

    pub(crate) fn color_of(&self, ch: char) -> ColorToken {
        self.by_char.get(&ch).copied().unwrap_or(self.default)
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(ColorToken::Green)
    }
}

pub(crate) fn colors_for_command(name: &str) -> ColorMap {
    use ColorToken::*;
    match name {
        "fire" => ColorMap::new(Green)
            .with("(", Red)
            .with(")", Yellow)
            .with("§", Grey)
            .with("@", Plain),
        "idle" => ColorMap::new(Green)
            .with("U", Pink)
            .with("o+,`O", Plain)
            .with("#]", Red)
            .with("~", Cyan),
        "sleep" => ColorMap::new(Blue).with("zZ", Cyan).with("*.", Yellow),
        "kill" => ColorMap::new(Magenta),
        _ => ColorMap::default(),
    }
}

/// Fading shades for the command history, newest last.
pub(crate) const HISTORY_SHADES: [ColorToken; 5] = [
    ColorToken::Grey,
    ColorToken::Grey,
    ColorToken::Plain,
    ColorToken::Plain,
    ColorToken::Bright,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_chars_use_default() {
        let m = colors_for_command("fire");
        assert_eq!(m.color_of('('), ColorToken::Red);
        assert_eq!(m.color_of('x'), ColorToken::Green);
    }

    #[test]
    fn unknown_command_gets_fallback_map() {
        assert_eq!(colors_for_command("nope"), ColorMap::default());
    }
}
