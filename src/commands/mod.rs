pub mod minify;
pub mod run;
