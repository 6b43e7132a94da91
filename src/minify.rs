//! Strip everything that is not one of the eight instructions.
//!
//! Newlines go too, so line/column numbers reported for a minified program
//! refer to the minified text rather than the original file.

/// The instruction set, in no particular order.
pub const INSTRUCTIONS: [char; 8] = ['>', '<', '+', '-', '.', ',', '[', ']'];

pub fn is_instruction(c: char) -> bool {
    INSTRUCTIONS.contains(&c)
}

pub fn minify(source: &str) -> String {
    source.chars().filter(|&c| is_instruction(c)).collect()
}
