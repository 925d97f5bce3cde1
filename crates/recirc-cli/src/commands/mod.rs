pub mod check;
pub mod common;
pub mod nodes;
pub mod render;
pub mod replay;
