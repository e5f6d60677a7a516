pub mod catalog;
pub mod config;
pub mod doctor;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}
