/// Marks the pieces of the first-seated player in a board state string.
pub const PLAYER_ONE_MARKER: char = 'W';
/// Marks the pieces of the second-seated player in a board state string.
pub const PLAYER_TWO_MARKER: char = 'B';

/// Returns `board` with every `side_a` replaced by `side_b` and vice versa.
///
/// All other characters are kept as they are, so applying the same swap twice
/// gives back the original string.
pub fn swap_perspective(board: &str, side_a: char, side_b: char) -> String {
    board
        .chars()
        .map(|c| {
            if c == side_a {
                side_b
            } else if c == side_b {
                side_a
            } else {
                c
            }
        })
        .collect()
}

/// Swaps the two player markers, so that the second player sees the board
/// as if they were the first.
pub fn swap_players(board: &str) -> String {
    swap_perspective(board, PLAYER_ONE_MARKER, PLAYER_TWO_MARKER)
}

#[cfg(test)]
mod tests {
    use quickcheck::{quickcheck, TestResult};

    use super::*;

    quickcheck! {
        fn swap_is_self_inverse(board: String, a: char, b: char) -> TestResult {
            if a == b {
                return TestResult::discard();
            }
            TestResult::from_bool(swap_perspective(&swap_perspective(&board, a, b), a, b) == board)
        }

        fn swap_keeps_length(board: String) -> bool {
            swap_players(&board).chars().count() == board.chars().count()
        }
    }

    #[test]
    fn swap_exchanges_markers_only() {
        assert_eq!(swap_players("WWxBxxB"), "BBxWxxW");
        assert_eq!(swap_players(""), "");
        assert_eq!(swap_perspective("abcab", 'a', 'c'), "cbacb");
    }

    #[test]
    fn swap_with_identical_markers_is_identity() {
        assert_eq!(swap_perspective("WBx", 'W', 'W'), "WBx");
    }
}
