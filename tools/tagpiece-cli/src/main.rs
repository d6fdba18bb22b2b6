//! Tagpiece command line tool
//!
//! Prepares CoNLL splits for training, tags raw sentences with a trained
//! token classifier and prints corpus statistics.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand, ValueEnum};
use tagpiece_core::io::{read_text, to_json_string};
use tagpiece_core::{
    ConllParser, CorpusStats, HfTokenizer, Indexer, Inference, LabelMode, PipelineConfig,
    Preprocessor, TokenClassifier,
};
use tracing::info;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "tagpiece")]
#[command(about = "Align NER labels to subword tokens and tag sentences")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON pipeline configuration
    #[arg(short, long, env = "TAGPIECE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Fixed sequence length, special tokens included
    #[arg(long, global = true)]
    max_length: Option<usize>,

    /// Examples per batch
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Label distribution over subwords: "same" or "x_mode"
    #[arg(long, global = true)]
    label_mode: Option<String>,

    /// Threads used to load examples
    #[arg(long, global = true)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse, align and shape CoNLL splits and write them as JSON
    Prepare {
        /// Training split in CoNLL format
        #[arg(long)]
        train: PathBuf,
        /// Development split in CoNLL format
        #[arg(long)]
        dev: Option<PathBuf>,
        /// tokenizer.json of the target model
        #[arg(long)]
        tokenizer: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        /// Dataset layout to produce
        #[arg(long, value_enum, default_value_t = Format::Transformer)]
        format: Format,
    },
    /// Tag whitespace-tokenized sentences, one per line
    Predict {
        /// Directory with model.safetensors, config.json and tokenizer.json
        #[arg(long)]
        model_dir: PathBuf,
        /// Tokenizer file, if not inside the model directory
        #[arg(long)]
        tokenizer: Option<PathBuf>,
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print statistics for a CoNLL file
    Inspect {
        /// CoNLL file
        #[arg(long)]
        data: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// Subword sentences plus shaped labels, encoded by the tokenizer later
    Transformer,
    /// Fully shaped token, label and mask sequences with table indexers
    Lstm,
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(max_length) = self.max_length {
            config = config.with_max_length(max_length);
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(mode) = &self.label_mode {
            let mode: LabelMode = mode.parse()?;
            config = config.with_label_mode(mode);
        }
        if let Some(workers) = self.workers {
            config = config.with_num_workers(workers);
        }
        config.validate()?;
        Ok(config)
    }

    fn run(self) -> Result<()> {
        let config = self.pipeline_config()?;
        match self.command {
            Commands::Prepare {
                train,
                dev,
                tokenizer,
                out,
                format,
            } => prepare(&config, &train, dev.as_deref(), &tokenizer, &out, format),
            Commands::Predict {
                model_dir,
                tokenizer,
                input,
            } => predict(&config, &model_dir, tokenizer.as_deref(), &input),
            Commands::Inspect { data } => inspect(&config, &data),
        }
    }
}

fn prepare(
    config: &PipelineConfig,
    train: &Path,
    dev: Option<&Path>,
    tokenizer_path: &Path,
    out: &Path,
    format: Format,
) -> Result<()> {
    let tokenizer = HfTokenizer::from_file(tokenizer_path, &config.special_tokens)
        .with_context(|| format!("failed to load tokenizer {}", tokenizer_path.display()))?;
    let preprocessor = Preprocessor::new(config)?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let mut splits = vec![("train", train)];
    if let Some(dev) = dev {
        splits.push(("dev", dev));
    }
    let pad = config.special_tokens.pad.as_str();
    let unk = config.special_tokens.unk.as_str();

    match format {
        Format::Transformer => {
            let mut all_labels = Vec::new();
            for (name, path) in splits {
                let lines = read_text(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let prepared = preprocessor
                    .prepare(&lines, &tokenizer)
                    .with_context(|| format!("failed to prepare {name} split"))?;
                prepared.save(out.join(format!("{name}.json")))?;
                info!(split = name, examples = prepared.len(), "wrote split");
                all_labels.extend(prepared.labels);
            }
            Indexer::build(&all_labels, pad, unk).save(out.join("target_indexer.json"))?;
        }
        Format::Lstm => {
            let mut all_tokens = Vec::new();
            let mut all_labels = Vec::new();
            for (name, path) in splits {
                let lines = read_text(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let shaped = preprocessor
                    .prepare_shaped(&lines, &tokenizer)
                    .with_context(|| format!("failed to shape {name} split"))?;
                tagpiece_core::io::write_json(out.join(format!("{name}.json")), &shaped)?;
                info!(split = name, examples = shaped.len(), "wrote split");
                for example in shaped {
                    all_tokens.push(example.tokens);
                    all_labels.push(example.labels);
                }
            }
            Indexer::build(&all_tokens, pad, unk).save(out.join("token_indexer.json"))?;
            Indexer::build(&all_labels, pad, unk).save(out.join("target_indexer.json"))?;
        }
    }

    info!(out = %out.display(), "preparation complete");
    Ok(())
}

fn predict(
    config: &PipelineConfig,
    model_dir: &Path,
    tokenizer: Option<&Path>,
    input: &Path,
) -> Result<()> {
    let device = Device::Cpu;
    let tokenizer_path = tokenizer
        .map(Path::to_path_buf)
        .unwrap_or_else(|| model_dir.join("tokenizer.json"));
    let tokenizer = HfTokenizer::from_file(&tokenizer_path, &config.special_tokens)
        .with_context(|| format!("failed to load tokenizer {}", tokenizer_path.display()))?;
    let model = TokenClassifier::from_dir(model_dir, &device)
        .with_context(|| format!("failed to load model from {}", model_dir.display()))?;

    let sentences = read_sentences(input)?;
    if sentences.is_empty() {
        bail!("no sentences in {}", input.display());
    }

    let inference = Inference::new(model, Arc::new(tokenizer), config, device)?;
    for prediction in inference.predict_words(&sentences)? {
        println!("{}", serde_json::to_string(&prediction)?);
    }
    Ok(())
}

fn inspect(config: &PipelineConfig, data: &Path) -> Result<()> {
    let corpus = ConllParser::new()
        .keep_trailing_sentence(config.keep_trailing_sentence)
        .parse_file(data)
        .with_context(|| format!("failed to parse {}", data.display()))?;
    println!("{}", to_json_string(&CorpusStats::from_corpus(&corpus))?);
    Ok(())
}

/// One sentence per non-blank line, words split on whitespace.
fn read_sentences(path: &Path) -> Result<Vec<Vec<String>>> {
    let lines = read_text(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tagpiece=info".parse()?)
                .add_directive("tagpiece_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prepare_defaults_to_transformer() {
        let cli = Cli::try_parse_from([
            "tagpiece",
            "prepare",
            "--train",
            "train.conll",
            "--tokenizer",
            "tokenizer.json",
            "--out",
            "data",
        ])
        .unwrap();
        match cli.command {
            Commands::Prepare { dev, format, .. } => {
                assert!(dev.is_none());
                assert_eq!(format, Format::Transformer);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_overrides_apply_on_defaults() {
        let cli = Cli::try_parse_from([
            "tagpiece",
            "inspect",
            "--data",
            "x.conll",
            "--max-length",
            "64",
            "--label-mode",
            "x_mode",
        ])
        .unwrap();
        let config = cli.pipeline_config().unwrap();
        assert_eq!(config.max_length, 64);
        assert_eq!(config.label_mode, LabelMode::XMode);
        assert_eq!(config.batch_size, PipelineConfig::default().batch_size);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let cli =
            Cli::try_parse_from(["tagpiece", "inspect", "--data", "x", "--label-mode", "bio"])
                .unwrap();
        assert!(cli.pipeline_config().is_err());

        let cli =
            Cli::try_parse_from(["tagpiece", "inspect", "--data", "x", "--max-length", "1"])
                .unwrap();
        assert!(cli.pipeline_config().is_err());
    }

    #[test]
    fn test_config_file_then_overrides() {
        let dir = std::env::temp_dir().join(format!("tagpiece-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"max_length": 32, "batch_size": 4}"#).unwrap();

        let cli = Cli::try_parse_from([
            "tagpiece",
            "--config",
            path.to_str().unwrap(),
            "--batch-size",
            "8",
            "inspect",
            "--data",
            "x",
        ])
        .unwrap();
        let config = cli.pipeline_config().unwrap();
        assert_eq!(config.max_length, 32);
        assert_eq!(config.batch_size, 8);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_sentences_skips_blank_lines() {
        let dir = std::env::temp_dir().join(format!("tagpiece-cli-read-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("input.txt");
        std::fs::write(&path, "EU rejects German call\n\n  Peter Blackburn \n").unwrap();

        let sentences = read_sentences(&path).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], vec!["Peter", "Blackburn"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
