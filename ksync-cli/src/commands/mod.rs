pub mod run;
pub mod source;
