mod backup;
mod command;
mod encoding;

pub use backup::{BackupError, BackupManager};
pub use command::{CommandError, CommandExecutor, CommandLine, CommandOutput, DefaultCommandExecutor};
pub use encoding::{count_lines, is_text_content};
