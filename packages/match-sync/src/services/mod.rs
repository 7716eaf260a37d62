pub mod connect4_service;
pub mod errors;
pub mod lobby_service;
pub mod match_sync_service;
pub mod notification_service;
pub mod presence_tracker;
