pub mod board;
pub mod lobby;
pub mod match_record;
pub mod match_view;
pub mod presence;
pub mod snapshot;
