use crate::models::board::{Board, Player};
use crate::models::match_record::MatchStatus;
use crate::models::presence::PresenceStatus;
use crate::models::snapshot::{DecodeAnomaly, MatchSnapshot};

/// Status as the UI shows it; `finished` splits into `Won` and `Draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayStatus {
    Loading,
    Waiting,
    Playing,
    Won,
    Draw,
}

impl DisplayStatus {
    pub fn is_over(self) -> bool {
        matches!(self, DisplayStatus::Won | DisplayStatus::Draw)
    }
}

/// Read model handed to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchView {
    pub match_id: String,
    pub status: DisplayStatus,
    pub board: Board,
    pub current_player: Option<Player>,
    pub winner: Option<Player>,
    pub player_color: Option<Player>,
    pub is_my_turn: bool,
    pub rematch_id: Option<String>,
    pub opponent_presence: PresenceStatus,
    pub is_loading: bool,
    pub anomalies: Vec<DecodeAnomaly>,
}

impl MatchView {
    pub fn loading(match_id: &str) -> Self {
        MatchView {
            match_id: match_id.to_string(),
            status: DisplayStatus::Loading,
            board: Board::empty(),
            current_player: None,
            winner: None,
            player_color: None,
            is_my_turn: false,
            rematch_id: None,
            opponent_presence: PresenceStatus::Unknown,
            is_loading: true,
            anomalies: Vec::new(),
        }
    }

    pub fn from_snapshot(
        snapshot: &MatchSnapshot,
        player_id: &str,
        opponent_presence: PresenceStatus,
    ) -> Self {
        let winner = snapshot.winner();
        let status = match snapshot.status {
            MatchStatus::Waiting => DisplayStatus::Waiting,
            MatchStatus::Playing => DisplayStatus::Playing,
            MatchStatus::Finished if snapshot.winner_id.is_some() => DisplayStatus::Won,
            MatchStatus::Finished => DisplayStatus::Draw,
        };
        let is_my_turn = snapshot.status == MatchStatus::Playing
            && snapshot.current_turn_id.as_deref() == Some(player_id);

        MatchView {
            match_id: snapshot.match_id.clone(),
            status,
            board: snapshot.board.clone(),
            current_player: snapshot.current_player(),
            winner,
            player_color: snapshot.color_of(player_id),
            is_my_turn,
            rematch_id: snapshot.rematch_id.clone(),
            opponent_presence,
            is_loading: false,
            anomalies: snapshot.anomalies.clone(),
        }
    }

    pub fn is_opponent_present(&self) -> bool {
        self.opponent_presence.is_present()
    }
}
