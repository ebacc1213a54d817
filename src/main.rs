mod cli;

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use rand::prelude::*;

use cli::{Cli, Format};
use reachcfg::error_handling::{report, Location};
use reachcfg::generator::{self, GenerateError};
use reachcfg::grammar::{Grammar, NonterminalId};
use reachcfg::parser::{self, io_error, CompileError, CompileErrors};
use reachcfg::recognizer::recognize_from;

enum Failure {
    Compile(CompileErrors),
    Generate(GenerateError)
}

impl From<CompileErrors> for Failure {
    fn from(errors: CompileErrors) -> Self {
        Failure::Compile(errors)
    }
}

impl From<CompileError> for Failure {
    fn from(error: CompileError) -> Self {
        Failure::Compile(vec![error])
    }
}

impl From<GenerateError> for Failure {
    fn from(error: GenerateError) -> Self {
        Failure::Generate(error)
    }
}

fn stdout_error(error: io::Error) -> CompileError {
    io_error(error, Path::new("<stdout>"))
}

fn start_symbol(grammar: &Grammar, cli: &Cli) -> Result<NonterminalId, CompileError> {
    match &cli.start {
        None => Ok(grammar.start()),
        Some(name) => grammar.defined(name).map_err(|error| CompileError {
            location: Location::file(&cli.file),
            error: error.into()
        })
    }
}

// Prints one verdict per input line, in order. Bytes that are not UTF-8
// become U+FFFD and the line is still tested.
fn write_verdicts(grammar: &Grammar, start: NonterminalId, format: Format, mut reader: impl BufRead, source: &Path, out: &mut impl Write) -> Result<(), CompileError> {
    let mut line = Vec::new();

    for number in 1usize.. {
        line.clear();
        if reader.read_until(b'\n', &mut line).map_err(|e| io_error(e, source))? == 0 {
            break;
        }

        let text = String::from_utf8_lossy(&line);
        if let Cow::Owned(_) = text {
            log::warn!("{}:{}: not valid UTF-8", source.display(), number);
        }
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let text = text.strip_suffix('\r').unwrap_or(text);

        let verdict = recognize_from(grammar, start, text);
        writeln!(out, "{}", format.render(verdict)).map_err(stdout_error)?;
    }

    Ok(())
}

fn test_lines(grammar: &Grammar, start: NonterminalId, cli: &Cli, out: &mut impl Write) -> Result<(), CompileError> {
    match &cli.tests {
        Some(path) => {
            let file = File::open(path).map_err(|e| io_error(e, path))?;
            write_verdicts(grammar, start, cli.format, BufReader::new(file), path, out)
        }
        None => write_verdicts(grammar, start, cli.format, io::stdin().lock(), Path::new("<stdin>"), out)
    }
}

fn generate_sentences(grammar: &Grammar, start: NonterminalId, amount: u32, cli: &Cli, out: &mut impl Write) -> Result<(), Failure> {
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy()
    };

    for _ in 0..amount {
        let sentence = generator::generate(grammar, start, cli.max_depth, &mut rng, &cli.file)?;
        writeln!(out, "{}", sentence).map_err(stdout_error)?;
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let grammar = parser::parse_file(&cli.file, &cli.parse_options())?;
    let start = start_symbol(&grammar, cli)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match cli.generate {
        Some(amount) => generate_sentences(&grammar, start, amount, cli, &mut out)?,
        None => test_lines(&grammar, start, cli, &mut out)?
    }
    out.flush().map_err(stdout_error)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Compile(errors)) => {
            report(&errors);
            ExitCode::FAILURE
        }
        Err(Failure::Generate(error)) => {
            report(&[error]);
            ExitCode::FAILURE
        }
    }
}
