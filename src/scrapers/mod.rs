pub mod base;
pub mod session;
pub mod table;
pub mod tpex;
pub mod twse;
