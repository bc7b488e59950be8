use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::error;

use crate::error::ConfigError;

/// Replaced by the path of the file that holds the board state to move from.
pub const INPUT_PLACEHOLDER: &str = "MOVE_INPUT_FILE";
/// Replaced by the path of the file the move generator writes its move to.
pub const OUTPUT_PLACEHOLDER: &str = "MOVE_OUTPUT_FILE";

pub const DEFAULT_OPENING_TEMPLATE_FILE: &str = "opening_command_line.txt";
pub const DEFAULT_GAME_TEMPLATE_FILE: &str = "game_command_line.txt";

/// The two phases of a game that have separate move generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The mover still has pieces to place.
    Opening,
    MidEndGame,
}

impl Phase {
    pub fn for_unplayed_pieces(unplayed_piece_count: u32) -> Phase {
        if unplayed_piece_count > 0 {
            Phase::Opening
        } else {
            Phase::MidEndGame
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Opening => write!(f, "Opening"),
            Phase::MidEndGame => write!(f, "Mid/End-Game"),
        }
    }
}

/// A command line with an input and an output file placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    /// Checks that both placeholders are present.
    ///
    /// `origin` only shows up in the error.
    pub fn parse(template: &str, origin: &Path) -> Result<Self, ConfigError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(ConfigError::EmptyTemplate {
                path: origin.to_path_buf(),
            });
        }
        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder {
                    path: origin.to_path_buf(),
                    placeholder,
                });
            }
        }
        Ok(Self(String::from(template)))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Unreadable {
            path: path.to_path_buf(),
            err,
        })?;
        Self::parse(&contents, path)
    }

    /// Fills in the two scratch file paths.
    pub fn expand(&self, input: &Path, output: &Path) -> String {
        self.0
            .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
            .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything the move oracle needs, read once at startup.
#[derive(Clone, Debug)]
pub struct WrapperConfig {
    pub opening: CommandTemplate,
    pub game: CommandTemplate,
    /// Where scratch files are created.
    pub work_dir: PathBuf,
    /// `None` waits for the move generator as long as it takes.
    pub move_timeout: Option<Duration>,
}

impl WrapperConfig {
    /// Loads both templates and verifies that `work_dir` is writable.
    ///
    /// Every problem is logged; the first one is returned.
    pub fn load(
        opening_path: &Path,
        game_path: &Path,
        work_dir: PathBuf,
        move_timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let opening = CommandTemplate::load(opening_path);
        let game = CommandTemplate::load(game_path);
        let writable = check_writable(&work_dir);
        for err in [opening.as_ref().err(), game.as_ref().err(), writable.as_ref().err()]
            .into_iter()
            .flatten()
        {
            error!("{}", err);
        }
        let opening = opening?;
        let game = game?;
        writable?;
        Ok(Self {
            opening,
            game,
            work_dir,
            move_timeout,
        })
    }

    pub fn command_for(&self, phase: Phase) -> &CommandTemplate {
        match phase {
            Phase::Opening => &self.opening,
            Phase::MidEndGame => &self.game,
        }
    }
}

fn check_writable(dir: &Path) -> Result<(), ConfigError> {
    let write_check = dir.join(format!(".morris_write_check_{}", std::process::id()));
    std::fs::write(&write_check, "xxx")
        .and_then(|()| std::fs::remove_file(&write_check))
        .map_err(|err| ConfigError::WorkDirNotWritable {
            dir: dir.to_path_buf(),
            err,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("morris_config_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn phase_follows_unplayed_pieces() {
        assert_eq!(Phase::for_unplayed_pieces(9), Phase::Opening);
        assert_eq!(Phase::for_unplayed_pieces(1), Phase::Opening);
        assert_eq!(Phase::for_unplayed_pieces(0), Phase::MidEndGame);
        assert_eq!(Phase::MidEndGame.to_string(), "Mid/End-Game");
    }

    #[test]
    fn parse_requires_both_placeholders() {
        let origin = Path::new("t.txt");
        assert!(CommandTemplate::parse("engine MOVE_INPUT_FILE MOVE_OUTPUT_FILE", origin).is_ok());
        assert!(matches!(
            CommandTemplate::parse("engine MOVE_INPUT_FILE", origin),
            Err(ConfigError::MissingPlaceholder { placeholder: OUTPUT_PLACEHOLDER, .. })
        ));
        assert!(matches!(
            CommandTemplate::parse("engine", origin),
            Err(ConfigError::MissingPlaceholder { placeholder: INPUT_PLACEHOLDER, .. })
        ));
        assert!(matches!(
            CommandTemplate::parse("  \n ", origin),
            Err(ConfigError::EmptyTemplate { .. })
        ));
    }

    #[test]
    fn expand_substitutes_paths() {
        let template = CommandTemplate::parse(
            " java -jar ai.jar -i MOVE_INPUT_FILE -o MOVE_OUTPUT_FILE\n",
            Path::new("t"),
        )
        .unwrap();
        assert_eq!(
            template.expand(Path::new("/tmp/in.txt"), Path::new("/tmp/out.txt")),
            "java -jar ai.jar -i /tmp/in.txt -o /tmp/out.txt"
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = temp_dir("missing");
        let err = CommandTemplate::load(&dir.join("nope.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
        // A directory is not a template file either
        let err = CommandTemplate::load(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn load_full_config() {
        let dir = temp_dir("full");
        let opening = dir.join("opening.txt");
        let game = dir.join("game.txt");
        std::fs::write(&opening, "open MOVE_INPUT_FILE MOVE_OUTPUT_FILE\n").unwrap();
        std::fs::write(&game, "play MOVE_INPUT_FILE MOVE_OUTPUT_FILE").unwrap();

        let config = WrapperConfig::load(&opening, &game, dir.clone(), None).unwrap();
        assert_eq!(
            config.command_for(Phase::Opening).as_str(),
            "open MOVE_INPUT_FILE MOVE_OUTPUT_FILE"
        );
        assert_eq!(
            config.command_for(Phase::MidEndGame).as_str(),
            "play MOVE_INPUT_FILE MOVE_OUTPUT_FILE"
        );
    }

    #[test]
    fn load_fails_on_bad_game_template() {
        let dir = temp_dir("bad_game");
        let opening = dir.join("opening.txt");
        let game = dir.join("game.txt");
        std::fs::write(&opening, "open MOVE_INPUT_FILE MOVE_OUTPUT_FILE").unwrap();
        std::fs::write(&game, "play MOVE_INPUT_FILE").unwrap();

        let err = WrapperConfig::load(&opening, &game, dir, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPlaceholder { .. }));
    }

    #[test]
    fn load_fails_on_missing_work_dir() {
        let dir = temp_dir("no_work_dir");
        let opening = dir.join("opening.txt");
        std::fs::write(&opening, "open MOVE_INPUT_FILE MOVE_OUTPUT_FILE").unwrap();

        let err = WrapperConfig::load(&opening, &opening, dir.join("does/not/exist"), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::WorkDirNotWritable { .. }));
    }
}
