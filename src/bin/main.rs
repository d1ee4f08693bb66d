use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use ajfront::ast::AstPrinter;
use ajfront::driver::{collect_sources, UnitReport};
use ajfront::parser::{Lexer, LineMap, TokenStream};
use ajfront::{Compiler, Config, Dialect};

#[derive(Parser)]
#[command(name = "ajfront")]
#[command(about = "Front end for Java with aspect-oriented extensions")]
#[command(version)]
struct Cli {
    /// Dialect to parse with (`aspectj`, or `none` to disable)
    #[arg(long, global = true, value_name = "NAME")]
    dialect: Option<String>,

    /// Parser worker threads
    #[arg(short = 'j', long, global = true, default_value_t = 1)]
    jobs: usize,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse sources and show the tree and diagnostics
    Parse {
        /// Source file or directory of .java/.aj files
        #[arg(value_name = "FILE|DIR")]
        input: PathBuf,

        /// Show the debug form of the tree
        #[arg(short, long)]
        detailed: bool,
    },

    /// Lexically analyze a source file
    Lex {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show token locations
        #[arg(short, long)]
        locations: bool,
    },

    /// Parse and analyze sources, failing on errors
    Check {
        #[arg(value_name = "FILE|DIR")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = Config::from_env();
    if let Some(name) = &cli.dialect {
        config = config.with_dialect(name.as_str());
    }
    let dialect = Dialect::resolve(&config);
    let compiler = Compiler::new(config, dialect).with_threads(cli.jobs);

    match &cli.command {
        Commands::Parse { input, detailed } => parse_sources(&compiler, input, *detailed),
        Commands::Lex { input, locations } => lex_file(input, *locations),
        Commands::Check { input } => check_sources(&compiler, input),
    }
}

fn parse_sources(compiler: &Compiler, input: &Path, detailed: bool) -> Result<()> {
    let paths = collect_sources(input).with_context(|| format!("reading {}", input.display()))?;
    let compilation = compiler.compile_paths(&paths);
    for report in &compilation.units {
        println!("== {}", report.name);
        match &report.result {
            Ok(compiled) => {
                if detailed {
                    println!("{:#?}", compiled.unit);
                } else {
                    print!("{}", AstPrinter::new().print(&compiled.unit));
                }
            }
            Err(err) => println!("error: {}", err),
        }
        print_diagnostics(report);
    }
    Ok(())
}

fn check_sources(compiler: &Compiler, input: &Path) -> Result<()> {
    let paths = collect_sources(input).with_context(|| format!("reading {}", input.display()))?;
    let compilation = compiler.compile_paths(&paths);
    for report in &compilation.units {
        print_diagnostics(report);
    }
    let errors = compilation.error_count();
    println!("{} file(s) checked, {} error(s)", compilation.units.len(), errors);
    if compilation.failed() {
        bail!("check failed with {} error(s)", errors);
    }
    Ok(())
}

fn print_diagnostics(report: &UnitReport) {
    match &report.result {
        Ok(compiled) => {
            for diagnostic in &compiled.diagnostics {
                println!("{}:{}", report.name, diagnostic.render(&compiled.lines));
            }
        }
        Err(err) => println!("{}: error: {}", report.name, err),
    }
}

fn lex_file(input: &Path, locations: bool) -> Result<()> {
    let source = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let lines = LineMap::new(&source);
    let mut lexer = Lexer::new(&source);
    while let Some(result) = lexer.next_token() {
        match result {
            Ok(token) if locations => {
                println!("{:?} {:?} at {}", token.kind, token.text, lines.location(token.span.start));
            }
            Ok(token) => println!("{:?} {:?}", token.kind, token.text),
            Err(err) => println!("invalid token {:?} at {}", err.text, lines.location(err.span.start)),
        }
    }
    Ok(())
}
