// Letter export: dates, file names and the PDF endpoints.

pub mod dates;
pub mod filename;
pub mod handlers;
