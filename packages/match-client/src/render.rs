use match_sync::models::{
    board::{Board, Cell, Player, COLS},
    lobby::LobbyListing,
    match_view::{DisplayStatus, MatchView},
    presence::PresenceStatus,
};

fn disc(cell: Cell, winning: bool) -> char {
    match (cell, winning) {
        (Cell::Empty, _) => '.',
        (Cell::Disc(Player::Red), false) => 'r',
        (Cell::Disc(Player::Red), true) => 'R',
        (Cell::Disc(Player::Yellow), false) => 'y',
        (Cell::Disc(Player::Yellow), true) => 'Y',
    }
}

fn colour(player: Player) -> &'static str {
    match player {
        Player::Red => "red",
        Player::Yellow => "yellow",
    }
}

/// Text grid with 1-based column numbers underneath. Winning cells are
/// upper-case.
pub fn board(board: &Board, winning: &[(usize, usize)]) -> String {
    let mut out = String::new();

    for (row, cells) in board.rows().iter().enumerate() {
        out.push('|');
        for (column, cell) in cells.iter().enumerate() {
            out.push(' ');
            out.push(disc(*cell, winning.contains(&(row, column))));
        }
        out.push_str(" |\n");
    }

    out.push(' ');
    for column in 1..=COLS {
        out.push_str(&format!(" {}", column));
    }
    out.push('\n');
    out
}

pub fn status_line(view: &MatchView) -> String {
    match view.status {
        DisplayStatus::Loading => "Loading match".to_string(),
        DisplayStatus::Waiting => "Waiting for an opponent to join".to_string(),
        DisplayStatus::Playing if view.opponent_presence == PresenceStatus::Absent => {
            "Opponent disconnected, game paused".to_string()
        }
        DisplayStatus::Playing if view.is_my_turn => match view.player_color {
            Some(player) => format!("Your turn ({})", colour(player)),
            None => "Your turn".to_string(),
        },
        DisplayStatus::Playing => match view.current_player {
            Some(player) => format!("Waiting for {}", colour(player)),
            None => "Waiting for the other player".to_string(),
        },
        DisplayStatus::Won => match (view.winner, view.player_color) {
            (Some(winner), Some(me)) if winner == me => "You won!".to_string(),
            (Some(_), Some(_)) => "You lost".to_string(),
            (Some(winner), None) => format!("{} wins", colour(winner)),
            (None, _) => "Game over".to_string(),
        },
        DisplayStatus::Draw => "Draw".to_string(),
    }
}

pub fn view(view: &MatchView) -> String {
    let mut out = board(&view.board, &[]);
    out.push_str(&status_line(view));
    out.push('\n');

    if let Some(rematch_id) = &view.rematch_id {
        out.push_str(&format!("Rematch: {}\n", rematch_id));
    }
    if !view.anomalies.is_empty() {
        out.push_str(&format!(
            "({} unreadable cell(s) shown as empty)\n",
            view.anomalies.len()
        ));
    }
    out
}

pub fn listing(listing: &LobbyListing, player_id: &str) -> String {
    let mut out = String::from("Open matches:\n");
    if listing.waiting.is_empty() {
        out.push_str("  none\n");
    }
    for summary in &listing.waiting {
        let host = summary.host_name().unwrap_or("unknown");
        let mine = if summary.is_hosted_by(player_id) {
            " (yours)"
        } else {
            ""
        };
        out.push_str(&format!("  {}  hosted by {}{}\n", summary.id, host, mine));
    }

    if !listing.active.is_empty() {
        out.push_str("Your games in progress:\n");
        for summary in &listing.active {
            let opponent = summary.opponent_name(player_id).unwrap_or("unknown");
            out.push_str(&format!("  {}  vs {}\n", summary.id, opponent));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_sync::models::board::ROWS;

    #[test]
    fn test_board_marks_winning_cells() {
        let mut grid = Board::empty();
        grid.set(ROWS - 1, 0, Cell::Disc(Player::Red));
        grid.set(ROWS - 1, 1, Cell::Disc(Player::Yellow));

        let text = board(&grid, &[(ROWS - 1, 0)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), ROWS + 1);
        assert_eq!(lines[ROWS - 1], "| R y . . . . . |");
        assert_eq!(lines[ROWS], "  1 2 3 4 5 6 7");
    }

    #[test]
    fn test_paused_game_status() {
        let mut view = MatchView::loading("m1");
        view.status = DisplayStatus::Playing;
        view.is_my_turn = true;
        view.opponent_presence = PresenceStatus::Absent;

        assert_eq!(status_line(&view), "Opponent disconnected, game paused");

        view.opponent_presence = PresenceStatus::Unknown;
        view.player_color = Some(Player::Yellow);
        assert_eq!(status_line(&view), "Your turn (yellow)");
    }

    #[test]
    fn test_empty_lobby() {
        let text = listing(&LobbyListing::default(), "me");
        assert_eq!(text, "Open matches:\n  none\n");
    }
}
