// Service layer exposed to the binary and any embedding caller.
pub mod chart_service;
