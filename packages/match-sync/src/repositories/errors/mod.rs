pub mod match_repository_errors;
pub mod procedure_errors;
pub mod realtime_errors;
