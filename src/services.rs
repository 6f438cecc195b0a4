pub mod agent;
pub mod completion;
pub mod match_service;
