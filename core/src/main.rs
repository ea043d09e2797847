// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ltr::{
    config::TrainConfig,
    dataset::{CsvColumns, ReaderKind},
    entrypoint, Result,
};

/// Pairwise learning to rank.
#[derive(Parser)]
#[command(name = "ltr", version, about)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model as described by a TOML config file.
    Train { config_path: PathBuf },

    /// Report the ranking quality of a saved model on a dataset.
    Evaluate {
        /// Model written by `train` (see `save_model`).
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        data: PathBuf,

        /// One of csv, letor, yahoo.
        #[arg(long)]
        reader: ReaderKind,

        /// Column of the query id for the csv reader. Negative counts from the end.
        #[arg(long, default_value_t = CsvColumns::default().qid, allow_negative_numbers = true)]
        qid: i64,

        /// Column of the document id for the csv reader.
        #[arg(long, default_value_t = CsvColumns::default().doc, allow_negative_numbers = true)]
        doc: i64,

        /// Column of the relevance grade for the csv reader.
        #[arg(long, default_value_t = CsvColumns::default().rel, allow_negative_numbers = true)]
        rel: i64,

        /// The `k` in NDCG@k.
        #[arg(long, default_value_t = 20)]
        cutoff: usize,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match args.command {
        Commands::Train { config_path } => {
            let config = TrainConfig::from_path(&config_path)?;
            entrypoint::train::run(&config)?;
        }
        Commands::Evaluate {
            model,
            data,
            reader,
            qid,
            doc,
            rel,
            cutoff,
        } => {
            let reader = reader.with_columns(CsvColumns { qid, doc, rel });
            let report = entrypoint::evaluate::run(&model, &data, &reader, cutoff)?;
            info!(
                "{} = {:.6} over {} query groups",
                report.phase, report.metric, report.groups
            );
        }
    }

    Ok(())
}
