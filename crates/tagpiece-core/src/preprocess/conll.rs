//! # CoNLL Parser
//!
//! Turns line-oriented annotated text into parallel sentence and tag
//! sequences. The word is the first whitespace-separated field and the tag
//! is the fourth; blank lines separate sentences and `# id` lines are
//! metadata.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TagpieceError};

/// Prefix of sentence-id metadata lines.
const SENTENCE_ID_MARKER: &str = "# id";

/// Field index of the word token.
const WORD_FIELD: usize = 0;

/// Field index of the NER tag.
const TAG_FIELD: usize = 3;

/// Parallel sentences and label sequences from one CoNLL source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCorpus {
    pub sentences: Vec<Vec<String>>,
    pub labels: Vec<Vec<String>>,
}

impl ParsedCorpus {
    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Total number of words across all sentences.
    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }
}

/// CoNLL reader.
#[derive(Debug, Clone)]
pub struct ConllParser {
    keep_trailing_sentence: bool,
}

impl Default for ConllParser {
    fn default() -> Self {
        Self {
            keep_trailing_sentence: true,
        }
    }
}

impl ConllParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep (default) or drop a final sentence that is not followed by a
    /// blank line. Dropping matches older preprocessing output.
    pub fn keep_trailing_sentence(mut self, keep: bool) -> Self {
        self.keep_trailing_sentence = keep;
        self
    }

    /// Parse an ordered sequence of raw lines.
    ///
    /// Lines may still carry their `\n` / `\r\n` terminators.
    ///
    /// # Errors
    /// [`TagpieceError::Format`] for a data line with fewer than 4 fields.
    pub fn parse<I, S>(&self, lines: I) -> Result<ParsedCorpus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut corpus = ParsedCorpus::default();
        let mut tokens: Vec<String> = Vec::new();
        let mut tags: Vec<String> = Vec::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            if line.starts_with(SENTENCE_ID_MARKER) {
                continue;
            }

            if line.trim().is_empty() {
                if !tokens.is_empty() {
                    corpus.sentences.push(std::mem::take(&mut tokens));
                    corpus.labels.push(std::mem::take(&mut tags));
                }
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() <= TAG_FIELD {
                return Err(TagpieceError::Format {
                    line: idx + 1,
                    content: line.trim_end_matches(['\r', '\n']).to_string(),
                });
            }
            tokens.push(fields[WORD_FIELD].trim().to_string());
            tags.push(fields[TAG_FIELD].trim().to_string());
        }

        if !tokens.is_empty() {
            if self.keep_trailing_sentence {
                corpus.sentences.push(tokens);
                corpus.labels.push(tags);
            } else {
                warn!(
                    words = tokens.len(),
                    "dropping trailing sentence without a blank terminator"
                );
            }
        }

        debug!(
            sentences = corpus.len(),
            words = corpus.word_count(),
            "parsed CoNLL input"
        );
        Ok(corpus)
    }

    /// Parse a whole document held in memory.
    pub fn parse_str(&self, content: &str) -> Result<ParsedCorpus> {
        self.parse(content.lines())
    }

    /// Read and parse a UTF-8 CoNLL file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedCorpus> {
        let lines = crate::io::read_text(path)?;
        self.parse(&lines)
    }
}

/// Parse lines with the default parser.
pub fn parse_conll<I, S>(lines: I) -> Result<ParsedCorpus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ConllParser::default().parse(lines)
}
