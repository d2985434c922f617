mod calendar;
mod records;
mod summary;

pub use calendar::draw_calendar;
pub use records::draw_records;
pub use summary::draw_summary;
