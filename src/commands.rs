use crate::config::GameTiming;
use crate::games::snake::Snake;
use crate::games::space::SpaceDefense;
use crate::games::MiniGame;
use crate::theme::{colors_for_command, ColorMap};
use std::collections::BTreeMap;

/// Builds a fresh game sized for a pane of `(rows, cols)`.
pub(crate) type GameFactory = fn(u16, u16, GameTiming) -> Box<dyn MiniGame>;

#[derive(Clone, Copy)]
pub(crate) enum CommandKind {
    Animation,
    MiniGame(GameFactory),
}

/// What a command does to the pet besides starting its activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    Rest,
    DeleteSave,
}

#[derive(Clone, Copy)]
pub(crate) struct Command {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) kind: CommandKind,
    pub(crate) effect: Effect,
    pub(crate) ends_session: bool,
}

impl Command {
    pub(crate) fn colors(&self) -> ColorMap {
        colors_for_command(self.name)
    }
}

fn snake(rows: u16, cols: u16, _: GameTiming) -> Box<dyn MiniGame> {
    Box::new(Snake::new(rows as i32, cols as i32))
}

fn space(rows: u16, cols: u16, timing: GameTiming) -> Box<dyn MiniGame> {
    Box::new(SpaceDefense::for_pane(rows, cols, timing.update_interval))
}

const COMMANDS: [Command; 7] = [
    Command {
        name: "kill",
        description: "Save state is deleted",
        kind: CommandKind::Animation,
        effect: Effect::DeleteSave,
        ends_session: true,
    },
    Command {
        name: "idle",
        description: "Go back to idle state",
        kind: CommandKind::Animation,
        effect: Effect::None,
        ends_session: false,
    },
    Command {
        name: "sleep",
        description: "Sleeps to recover fatigue",
        kind: CommandKind::Animation,
        effect: Effect::Rest,
        ends_session: false,
    },
    Command {
        name: "snake",
        description: "Plays snake to gain EXP",
        kind: CommandKind::MiniGame(snake),
        effect: Effect::None,
        ends_session: false,
    },
    Command {
        name: "space",
        description: "Plays space defense for EXP",
        kind: CommandKind::MiniGame(space),
        effect: Effect::None,
        ends_session: false,
    },
    Command {
        name: "fire",
        description: "Pet shoots fire",
        kind: CommandKind::Animation,
        effect: Effect::None,
        ends_session: false,
    },
    Command {
        name: "quit",
        description: "Saves and quits the game",
        kind: CommandKind::Animation,
        effect: Effect::None,
        ends_session: true,
    },
];

/// Closed set of commands, keyed by the word typed at the prompt.
pub(crate) struct Catalog {
    by_name: BTreeMap<&'static str, Command>,
}

impl Catalog {
    pub(crate) fn standard() -> Self {
        Self {
            by_name: COMMANDS.iter().map(|c| (c.name, *c)).collect(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Command> {
        self.by_name.get(name)
    }

    /// `(name, description)` pairs for the legend, alphabetical.
    pub(crate) fn legend(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.by_name.values().map(|c| (c.name, c.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{GameLogic, GameState};

    #[test]
    fn catalog_has_the_seven_commands() {
        let cat = Catalog::standard();
        let names: Vec<_> = cat.legend().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["fire", "idle", "kill", "quit", "sleep", "snake", "space"]
        );
        assert!(cat.get("dance").is_none());
        assert!(cat.get("SNAKE").is_none());
    }

    #[test]
    fn effects_and_session_end() {
        let cat = Catalog::standard();
        assert_eq!(cat.get("sleep").unwrap().effect, Effect::Rest);
        assert_eq!(cat.get("kill").unwrap().effect, Effect::DeleteSave);
        assert!(cat.get("kill").unwrap().ends_session);
        assert!(cat.get("quit").unwrap().ends_session);
        assert!(!cat.get("idle").unwrap().ends_session);
        assert!(matches!(cat.get("space").unwrap().kind, CommandKind::MiniGame(_)));
        assert!(matches!(cat.get("fire").unwrap().kind, CommandKind::Animation));
    }

    #[test]
    fn game_factories_start_playing() {
        let cat = Catalog::standard();
        for name in ["snake", "space"] {
            let CommandKind::MiniGame(make) = cat.get(name).unwrap().kind else {
                panic!("{name} is not a game");
            };
            let game = make(20, 60, GameTiming::default());
            assert_eq!(game.state(), GameState::Playing);
            assert_eq!(game.score(), 0);
        }
    }
}
