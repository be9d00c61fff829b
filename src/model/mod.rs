pub mod config;
pub mod piece;
pub mod statement;
pub mod vocab;
