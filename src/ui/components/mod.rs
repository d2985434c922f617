pub mod command_palette;
pub mod confirm_dialog;

pub use command_palette::draw_command_palette;
pub use confirm_dialog::draw_reset_confirmation;
