//! CLI argument structures

use crate::cli::validation::parse_property_filter;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Run graph pipelines as vertex programs
#[derive(Parser)]
#[command(name = "pregel-bridge")]
#[command(about = "pregel-bridge - Run graph pipelines as vertex programs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Group vertices by a key and aggregate every group
    #[command(name = "group-by")]
    GroupBy(GroupByArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GroupByArgs {
    /// JSON graph file: {"vertices": [{"id", "label", "properties"}]}
    #[arg(short = 'g', long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Lambda computing the group key (e.g. label, id, property:name)
    #[arg(short = 'k', long, default_value = "label")]
    pub key: String,

    /// Lambda computing the grouped value; the whole vertex when omitted
    #[arg(long)]
    pub value: Option<String>,

    /// Lambda applied to each group (e.g. count, sum, fold)
    #[arg(short = 'r', long)]
    pub reduce: Option<String>,

    /// Only group vertices whose property equals the value
    #[arg(long, value_name = "PROPERTY=VALUE", value_parser = parse_property_filter)]
    pub has: Vec<(String, Value)>,

    /// Label of the group-by step
    #[arg(short = 'l', long, default_value = "groups")]
    pub label: String,

    /// Side-effect key the result is published under; defaults to the label
    #[arg(long)]
    pub side_effect_key: Option<String>,

    /// Engine configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker count, overriding the configuration file
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,
}
