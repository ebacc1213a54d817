use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use reachcfg::generator::DEFAULT_MAX_DEPTH;
use reachcfg::grammar::DEFAULT_MAX_NONTERMINALS;
use reachcfg::parser::ParseOptions;
use reachcfg::recognizer::Verdict;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// File containing the grammar
    pub file: PathBuf,

    /// File with one string to test per line (default: standard input)
    pub tests: Option<PathBuf>,

    /// Start symbol (default: first line of the grammar)
    #[arg(short, long, value_name = "SYMBOL")]
    pub start: Option<String>,

    /// Most nonterminals the grammar may use
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_NONTERMINALS)]
    pub max_nonterminals: usize,

    /// How verdicts are printed
    #[arg(short, long, value_enum, default_value_t = Format::Verdict)]
    pub format: Format,

    /// Generate this many sentences instead of testing strings
    #[arg(short = 'n', long, value_name = "AMOUNT")]
    pub generate: Option<u32>,

    /// Seed for generated sentences (default: random)
    #[arg(long, value_name = "SEED", requires = "generate")]
    pub seed: Option<u64>,

    /// Depth after which generated sentences take the shortest way out
    #[arg(long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// ACCEPT or REJECT
    Verdict,
    /// acepta or NO acepta
    Acepta
}

impl Format {
    pub fn render(self, verdict: Verdict) -> &'static str {
        match (self, verdict) {
            (Format::Verdict, Verdict::Accept) => "ACCEPT",
            (Format::Verdict, Verdict::Reject) => "REJECT",
            (Format::Acepta, Verdict::Accept) => "acepta",
            (Format::Acepta, Verdict::Reject) => "NO acepta"
        }
    }
}

impl Cli {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_nonterminals: self.max_nonterminals
        }
    }
}
