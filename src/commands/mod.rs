pub mod ask;
pub mod boot;
pub mod clean;
pub mod config;
pub mod doctor;
pub mod install;
pub mod repl;
pub mod serve;
pub mod status;
pub mod update;
pub mod verify;
pub mod watch;
