//! # BIO Span Extraction
//!
//! Groups word-level `B-`/`I-` tags into entity spans. Any other tag
//! (`O`, `X`, special tokens) closes the open span.

use serde::{Deserialize, Serialize};

/// A contiguous run of words sharing one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    /// First word index.
    pub start: usize,
    /// One past the last word index.
    pub end: usize,
    pub text: String,
}

enum Prefix<'a> {
    Begin(&'a str),
    Inside(&'a str),
    Outside,
}

fn split_tag(tag: &str) -> Prefix<'_> {
    if let Some(kind) = tag.strip_prefix("B-") {
        Prefix::Begin(kind)
    } else if let Some(kind) = tag.strip_prefix("I-") {
        Prefix::Inside(kind)
    } else {
        Prefix::Outside
    }
}

/// Extract entity spans from parallel word and tag sequences.
///
/// An `I-` tag that does not continue a span of the same type starts a new
/// one. Extra words or tags beyond the shorter sequence are ignored.
pub fn extract_entities<W: AsRef<str>, T: AsRef<str>>(words: &[W], tags: &[T]) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut open: Option<(&str, usize)> = None;
    let n = words.len().min(tags.len());

    let close = |open: &mut Option<(&str, usize)>, end: usize, entities: &mut Vec<Entity>| {
        if let Some((kind, start)) = open.take() {
            let text = words[start..end]
                .iter()
                .map(|w| w.as_ref())
                .collect::<Vec<&str>>()
                .join(" ");
            entities.push(Entity {
                entity_type: kind.to_string(),
                start,
                end,
                text,
            });
        }
    };

    for (i, tag) in tags.iter().take(n).enumerate() {
        match split_tag(tag.as_ref()) {
            Prefix::Begin(kind) => {
                close(&mut open, i, &mut entities);
                open = Some((kind, i));
            }
            Prefix::Inside(kind) => match open {
                Some((current, _)) if current == kind => {}
                _ => {
                    close(&mut open, i, &mut entities);
                    open = Some((kind, i));
                }
            },
            Prefix::Outside => close(&mut open, i, &mut entities),
        }
    }
    close(&mut open, n, &mut entities);

    entities
}
