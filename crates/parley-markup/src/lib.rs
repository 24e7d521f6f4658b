//! Markup transcoder for rich chat messages.
//!
//! Model output carries UI components as bracket markup, e.g.
//!
//! ```text
//! [#Container#]
//! Pick one
//! [Order](st|Tea,Coffee|1|1|0)
//! [/Container/]
//! ```
//!
//! [`parse`] turns such text into a [`MarkupNode`] tree and [`serialize`]
//! turns a tree back into text so previously sent messages can be fed to
//! the model again.

mod node;
mod parse;
mod serialize;

pub use node::{
    Accessory, Button, ButtonLink, ButtonStyle, MarkupError, MarkupNode, MediaItem, Section,
    SelectMenu, SeparatorSize, Thumbnail,
};
pub use parse::parse;
pub use serialize::serialize;

#[cfg(test)]
mod tests;
