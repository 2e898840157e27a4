pub mod assembler;
pub mod daily_service;
