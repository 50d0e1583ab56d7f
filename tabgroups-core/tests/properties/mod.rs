//! Property test modules

mod backup_tests;
mod catch_rule_tests;
mod coalesce_tests;
mod migration_tests;
mod navigation_tests;
mod session_tests;
