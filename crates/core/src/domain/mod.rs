pub mod classification;
pub mod lead;
