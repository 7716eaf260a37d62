pub mod errors;
pub mod match_repository;
pub mod procedure_repository;
pub mod push_repository;
pub mod realtime;
pub mod realtime_repository;
pub mod rest;
