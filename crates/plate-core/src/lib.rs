mod core;
pub mod dom;
pub mod highlight;
mod input_rules;
mod keymap;
pub mod markdown;
mod ops;
mod plugin;
mod view;

pub use crate::core::*;
pub use crate::input_rules::*;
pub use crate::keymap::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::view::*;
