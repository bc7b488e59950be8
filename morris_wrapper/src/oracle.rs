use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use morris::{highlight_diff, pad_labels};
use tracing::{debug, error, info};

use crate::config::{Phase, WrapperConfig};
use crate::error::OracleError;

/// How often a running move generator is checked when a timeout is set.
const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Something that proposes the next board state from the perspective of
/// player one.
pub trait MoveGenerator {
    /// `unplayed_piece_count` belongs to the player about to move and selects
    /// the game phase.
    fn compute_move(&self, board: &str, unplayed_piece_count: u32) -> Result<String, OracleError>;
}

/// Runs an external move generator, exchanging the board through files.
pub struct MoveOracle {
    config: WrapperConfig,
    // At most one move generator runs at any time, across all games
    in_flight: Mutex<()>,
    // Disambiguates scratch files created within the same millisecond
    sequence: AtomicU64,
}

/// What a finished move generator left behind.
struct Invocation {
    status: ExitStatus,
    stdout: Vec<String>,
    stderr: Vec<String>,
    elapsed: Duration,
}

impl MoveOracle {
    pub fn new(config: WrapperConfig) -> Self {
        Self {
            config,
            in_flight: Mutex::new(()),
            sequence: AtomicU64::new(0),
        }
    }

    fn scratch_paths(&self) -> (PathBuf, PathBuf) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let suffix = format!("{}_{}_{}", std::process::id(), millis, seq);
        (
            self.config.work_dir.join(format!("move_input_{}.txt", suffix)),
            self.config.work_dir.join(format!("move_output_{}.txt", suffix)),
        )
    }

    fn run(&self, command: &str) -> Result<Invocation, OracleError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(OracleError::EmptyCommand)?;

        let start = Instant::now();
        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| OracleError::Launch {
                program: String::from(program),
                err,
            })?;

        // Drain both pipes while waiting, a chatty generator could block otherwise
        let stdout = collect_lines(child.stdout.take());
        let stderr = collect_lines(child.stderr.take());

        let status = match self.config.move_timeout {
            None => child.wait().map_err(OracleError::Wait)?,
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
        };
        let elapsed = start.elapsed();

        Ok(Invocation {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            elapsed,
        })
    }
}

impl MoveGenerator for MoveOracle {
    fn compute_move(&self, board: &str, unplayed_piece_count: u32) -> Result<String, OracleError> {
        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        let phase = Phase::for_unplayed_pieces(unplayed_piece_count);
        let (input_path, output_path) = self.scratch_paths();
        let command = self.config.command_for(phase).expand(&input_path, &output_path);

        std::fs::write(&input_path, board).map_err(|err| OracleError::ScratchFile {
            path: input_path.clone(),
            err,
        })?;

        info!(%phase, "Running Command: {}", command);
        let invocation = match self.run(&command) {
            Ok(invocation) => invocation,
            Err(err) => {
                error!(%phase, "Error processing move request: {}", err);
                return Err(err);
            }
        };

        let result = if invocation.status.success() {
            read_move(&output_path).and_then(|raw| check_output(board, &raw))
        } else {
            Err(OracleError::NonZeroExit {
                code: invocation.status.code(),
            })
        };

        match result {
            Ok(next_move) => {
                remove_scratch_files(&[&input_path, &output_path]);
                let (input_label, output_label) =
                    pad_labels("Input Board State: ", &format!("{} Output Move: ", phase));
                info!(
                    elapsed_ms = invocation.elapsed.as_millis() as u64,
                    "Move computed\n{}{}\n{}",
                    input_label,
                    board,
                    highlight_diff(&output_label, board, &next_move, true)
                );
                Ok(next_move)
            }
            Err(err) => {
                error!(
                    %phase,
                    exit_code = ?invocation.status.code(),
                    input = %input_path.display(),
                    output = %output_path.display(),
                    "{}",
                    err
                );
                log_captured("Standard Out", &invocation.stdout);
                log_captured("Standard Error", &invocation.stderr);
                Err(err)
            }
        }
    }
}

/// Validates the contents of the output file against the board it was
/// computed from. The move must have exactly as many characters.
pub fn check_output(board: &str, raw: &str) -> Result<String, OracleError> {
    let next_move = raw.trim();
    if next_move.is_empty() {
        return Err(OracleError::EmptyOutput);
    }
    let expected = board.chars().count();
    let actual = next_move.chars().count();
    if expected != actual {
        return Err(OracleError::LengthMismatch { expected, actual });
    }
    Ok(String::from(next_move))
}

fn read_move(path: &Path) -> Result<String, OracleError> {
    std::fs::read_to_string(path).map_err(|err| OracleError::ScratchFile {
        path: path.to_path_buf(),
        err,
    })
}

fn remove_scratch_files(paths: &[&Path]) {
    for path in paths {
        if let Err(err) = std::fs::remove_file(path) {
            debug!(path = %path.display(), "Could not remove scratch file: {}", err);
        }
    }
}

fn log_captured(stream: &str, lines: &[String]) {
    error!("{} from command execution was {} lines", stream, lines.len());
    for line in lines {
        error!("{}", line);
    }
}

fn collect_lines<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<Vec<String>> {
    std::thread::spawn(move || match stream {
        Some(stream) => BufReader::new(stream).lines().map_while(Result::ok).collect(),
        None => Vec::new(),
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, OracleError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(OracleError::Wait)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            // Only the direct child is killed. Processes it spawned may keep the
            // output pipes open, so the reader threads are detached, not joined.
            // Reap the process so it does not linger as a zombie
            let _ = child.kill();
            let _ = child.wait();
            return Err(OracleError::TimedOut { timeout });
        }
        std::thread::sleep(TIMEOUT_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{quickcheck, TestResult};

    use super::*;

    quickcheck! {
        fn output_of_wrong_length_is_rejected(board: String, output: String) -> TestResult {
            if output.trim().chars().count() == board.chars().count() {
                return TestResult::discard();
            }
            TestResult::from_bool(check_output(&board, &output).is_err())
        }
    }

    #[test]
    fn output_is_trimmed_before_checking() {
        assert_eq!(check_output("xWBx", "xWWx\n").unwrap(), "xWWx");
        assert!(matches!(
            check_output("xWBx", "xWW"),
            Err(OracleError::LengthMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(check_output("", " \n"), Err(OracleError::EmptyOutput)));
    }

    #[cfg(unix)]
    mod process {
        use std::path::Path;
        use std::sync::Arc;

        use super::super::*;
        use crate::config::CommandTemplate;

        fn work_dir(name: &str) -> PathBuf {
            let dir = std::env::temp_dir()
                .join(format!("morris_oracle_{}_{}", name, std::process::id()));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn template(command: &str) -> CommandTemplate {
            CommandTemplate::parse(command, Path::new("test")).unwrap()
        }

        /// Writes a script that receives the input path as $1 and the output path as $2.
        fn script(dir: &Path, name: &str, body: &str) -> CommandTemplate {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            template(&format!("sh {} MOVE_INPUT_FILE MOVE_OUTPUT_FILE", path.display()))
        }

        fn oracle(dir: &Path, opening: CommandTemplate, game: CommandTemplate) -> MoveOracle {
            MoveOracle::new(WrapperConfig {
                opening,
                game,
                work_dir: dir.to_path_buf(),
                move_timeout: None,
            })
        }

        fn scratch_files(dir: &Path) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(dir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with("move_"))
                .collect();
            names.sort();
            names
        }

        #[test]
        fn successful_move_cleans_up() {
            let dir = work_dir("success");
            let game = template("false MOVE_INPUT_FILE MOVE_OUTPUT_FILE");
            let opening = script(&dir, "engine.sh", "printf 'WxxB\\n' > \"$2\"\n");
            let oracle = oracle(&dir, opening, game);

            assert_eq!(oracle.compute_move("xxxB", 9).unwrap(), "WxxB");
            assert!(scratch_files(&dir).is_empty());
        }

        #[test]
        fn phase_selects_template() {
            let dir = work_dir("phase");
            let opening = template("false MOVE_INPUT_FILE MOVE_OUTPUT_FILE");
            let game = template("cp MOVE_INPUT_FILE MOVE_OUTPUT_FILE");
            let oracle = oracle(&dir, opening, game);

            assert_eq!(oracle.compute_move("WxB", 0).unwrap(), "WxB");
            assert!(matches!(
                oracle.compute_move("WxB", 1),
                Err(OracleError::NonZeroExit { code: Some(1) })
            ));
        }

        #[test]
        fn wrong_length_fails_and_keeps_files() {
            let dir = work_dir("length");
            let opening = script(
                &dir,
                "short.sh",
                "echo chatter; echo oops >&2; printf 'WB' > \"$2\"\n",
            );
            let oracle = oracle(&dir, opening.clone(), opening);

            assert!(matches!(
                oracle.compute_move("xxxB", 3),
                Err(OracleError::LengthMismatch { expected: 4, actual: 2 })
            ));
            let files = scratch_files(&dir);
            assert_eq!(files.len(), 2);
            assert!(files[0].starts_with("move_input_"));
            assert!(files[1].starts_with("move_output_"));
        }

        #[test]
        fn missing_output_file_fails() {
            let dir = work_dir("no_output");
            let opening = script(&dir, "silent.sh", "exit 0\n");
            let oracle = oracle(&dir, opening.clone(), opening);

            assert!(matches!(
                oracle.compute_move("xxxB", 3),
                Err(OracleError::ScratchFile { .. })
            ));
        }

        #[test]
        fn unknown_program_fails_to_launch() {
            let dir = work_dir("launch");
            let missing = template("/nonexistent/morris-engine MOVE_INPUT_FILE MOVE_OUTPUT_FILE");
            let oracle = oracle(&dir, missing.clone(), missing);

            assert!(matches!(
                oracle.compute_move("xxxB", 3),
                Err(OracleError::Launch { .. })
            ));
        }

        #[test]
        fn slow_generator_times_out() {
            let dir = work_dir("timeout");
            let slow = script(&dir, "slow.sh", "sleep 5\ncp \"$1\" \"$2\"\n");
            let mut oracle = oracle(&dir, slow.clone(), slow);
            oracle.config.move_timeout = Some(Duration::from_millis(100));

            let start = Instant::now();
            assert!(matches!(
                oracle.compute_move("xxxB", 3),
                Err(OracleError::TimedOut { .. })
            ));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn concurrent_requests_run_one_at_a_time() {
            let dir = work_dir("serial");
            let busy = dir.join("busy");
            let body = format!(
                "[ -e {busy} ] && exit 3\ntouch {busy}\nsleep 0.3\ncp \"$1\" \"$2\"\nrm {busy}\n",
                busy = busy.display()
            );
            let engine = script(&dir, "engine.sh", &body);
            let oracle = Arc::new(oracle(&dir, engine.clone(), engine));

            let workers: Vec<_> = ["WxxB", "BxxW"]
                .into_iter()
                .map(|board| {
                    let oracle = Arc::clone(&oracle);
                    std::thread::spawn(move || oracle.compute_move(board, 3))
                })
                .collect();
            for (worker, board) in workers.into_iter().zip(["WxxB", "BxxW"]) {
                assert_eq!(worker.join().unwrap().unwrap(), board);
            }
            assert!(!busy.exists());
        }

        #[test]
        fn scratch_files_are_unique() {
            let dir = work_dir("unique");
            let cp = template("cp MOVE_INPUT_FILE MOVE_OUTPUT_FILE");
            let oracle = oracle(&dir, cp.clone(), cp);
            let (in_a, out_a) = oracle.scratch_paths();
            let (in_b, out_b) = oracle.scratch_paths();
            assert_ne!(in_a, in_b);
            assert_ne!(out_a, out_b);
        }
    }
}
