//! quire-markdown: markdown encoding for quire document trees.
//!
//! This crate provides:
//! - `BlockTokenizer` / `BlockRule` - line-based block rules, with the
//!   paragraph rule built in
//! - `InlineTokenizer` / `InlineRule` - escapes, code spans, links, hard
//!   breaks, delimiter runs registered by mark units and single-token
//!   syntax registered by node units
//! - `ParseSpec` - how each token folds into the tree
//! - `MarkdownWriter` - the serializer, with per-node and per-mark writers
//! - `MarkdownCodec` - all of the above composed against one `Schema`

pub mod block;
pub mod codec;
pub mod error;
pub mod escape;
pub mod inline;
pub mod parser;
pub mod serializer;
pub mod token;

pub use block::{
    BlockRule, BlockTokenizer, BlockquoteRule, FenceRule, HeadingRule, HrRule, Line, ListRule,
    MAX_LIST_ORDER, NOTICE_STYLES, NoticeRule, checkbox_item_attrs, fence_attrs, fence_language,
    heading_attrs, hr_attrs, list_order, notice_attrs, notice_style, ordered_list_attrs,
    split_lines,
};
pub use codec::{MarkdownCodec, MarkdownCodecBuilder};
pub use error::{CodecError, MarkdownSyntaxError};
pub use escape::{escape, unescape};
pub use inline::{DelimiterSpec, InlineRule, InlineTokenizer};
pub use parser::{AttrsFn, ParseSpec};
pub use serializer::{MarkWriter, MarkdownWriter, NodeWriter};
pub use token::{Nesting, Token};
