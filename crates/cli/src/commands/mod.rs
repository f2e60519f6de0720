pub mod config_cmd;
pub mod simulate;
pub mod status;
