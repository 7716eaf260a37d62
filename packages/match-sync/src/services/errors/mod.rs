pub mod connect4_service_errors;
pub mod lobby_service_errors;
pub mod match_sync_errors;
pub mod notification_service_errors;
