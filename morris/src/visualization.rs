use crate::Seat;

/// Renders `after` behind `label` and marks, on a second line, every
/// position in which it differs from `before`.
///
/// The markers are relative to the player who moved, which is player one if
/// `from_perspective_of_player_one` is set:
///
/// - `+` the mover now has a piece there
/// - `-` the mover's piece left that position
/// - `x` an opponent's piece was removed
/// - `*` any other change
/// - `?` the position exists in only one of the two boards
pub fn highlight_diff(
    label: &str,
    before: &str,
    after: &str,
    from_perspective_of_player_one: bool,
) -> String {
    let mover = if from_perspective_of_player_one {
        Seat::PlayerOne
    } else {
        Seat::PlayerTwo
    };
    let own = mover.marker();
    let opponent = mover.other().marker();

    let before: Vec<char> = before.chars().collect();
    let after: Vec<char> = after.chars().collect();

    let mut markers = String::with_capacity(before.len().max(after.len()));
    for idx in 0..before.len().max(after.len()) {
        let marker = match (before.get(idx), after.get(idx)) {
            (Some(b), Some(a)) if b == a => ' ',
            (Some(_), Some(&a)) if a == own => '+',
            (Some(&b), Some(_)) if b == own => '-',
            (Some(&b), Some(_)) if b == opponent => 'x',
            (Some(_), Some(_)) => '*',
            _ => '?',
        };
        markers.push(marker);
    }

    let padding = " ".repeat(label.chars().count());
    let result = format!(
        "{}{}\n{}{}",
        label,
        after.iter().collect::<String>(),
        padding,
        markers
    );
    result.trim_end().to_string()
}

/// Right-pads the shorter of two labels with spaces so that text following
/// them lines up.
pub fn pad_labels(first: &str, second: &str) -> (String, String) {
    let width = first.chars().count().max(second.chars().count());
    (format!("{:<width$}", first), format!("{:<width$}", second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_placement_by_player_one() {
        let out = highlight_diff("Move: ", "xxxB", "xWxB", true);
        assert_eq!(out, "Move: xWxB\n       +");
    }

    #[test]
    fn marks_slide_and_capture_by_player_two() {
        let out = highlight_diff("", "BxW", "xBx", false);
        assert_eq!(out, "xBx\n-+x");
    }

    #[test]
    fn unchanged_board_has_no_markers() {
        assert_eq!(highlight_diff("L ", "WBx", "WBx", true), "L WBx");
    }

    #[test]
    fn length_mismatch_is_flagged() {
        assert_eq!(highlight_diff("", "xx", "xxW", true), "xxW\n  ?");
    }

    #[test]
    fn pads_shorter_label() {
        let (a, b) = pad_labels("Input Board State: ", "Opening Output Move: ");
        assert_eq!(a.len(), b.len());
        assert_eq!(a, "Input Board State:   ");
    }
}
