mod actions_tests;
mod backup_tests;
mod lifecycle_tests;
mod routing_tests;
mod support;
