//! Text analysis: the segmentation seam between raw post text and the
//! indexing pipeline.

pub mod segmenter;
pub mod token;

pub use segmenter::{Segmenter, UnicodeSegmenter};
pub use token::Token;
