pub mod align;
pub mod conll;
pub mod shaping;

pub use align::{
    create_test_samples, tokenize_and_keep_labels, AlignedCorpus, SubwordAligner, BOUNDARY_FLAG,
    CONTINUATION_FLAG,
};
pub use conll::{parse_conll, ConllParser, ParsedCorpus};
pub use shaping::{
    add_special_tokens, create_attention_masks, pad_sequence, truncate_sequence, SequenceShaper,
    ShapedExample, PAD_ITEM, SEP_ITEM,
};
