use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nesasm::cpu::OpcodeTable;
use nesasm::source::FsLoader;
use nesasm::Assembler;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble 6502 source into an iNES ROM")]
struct Opts {
    /// Output ROM, defaults to the input with a .nes extension
    #[arg(short, long, value_name = "OUTFILE")]
    output: Option<PathBuf>,
    /// Write the symbol table to <OUTFILE>.symbols.json
    #[arg(short, long)]
    symbols: bool,
    /// Write cycle counts per top level scope to <OUTFILE>.cycles.json
    #[arg(short, long)]
    cycles: bool,
    /// Only report warnings and errors
    #[arg(short, long)]
    quiet: bool,
    /// Directory searched by `.inc <file>`, defaults to nes_lib next to the input
    #[arg(short = 'I', long, value_name = "DIR")]
    include_dir: Option<PathBuf>,
    #[arg(value_name = "INFILE")]
    input: PathBuf,
}

fn main() {
    let opts = Opts::parse();
    let default_level = if opts.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&opts) {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn run(opts: &Opts) -> Result<()> {
    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let base_dir = opts.input.parent().unwrap_or_else(|| Path::new("."));
    let mut loader = FsLoader::new(base_dir);
    if let Some(dir) = &opts.include_dir {
        loader = loader.with_system_dir(dir);
    }

    let mut assembler = Assembler::new(OpcodeTable::mos6502(), Box::new(loader));
    let rom = assembler.assemble(&opts.input.to_string_lossy(), &source)?;

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| opts.input.with_extension("nes"));
    fs::write(&output, &rom).with_context(|| format!("writing {}", output.display()))?;
    assembler.log_bank_usage();
    info!("Wrote {} bytes to {}", rom.len(), output.display());

    if opts.symbols {
        let path = with_suffix(&output, "symbols.json");
        fs::write(&path, assembler.symbol_table().export_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote symbol table to {}", path.display());
    }
    if opts.cycles {
        let path = with_suffix(&output, "cycles.json");
        fs::write(&path, assembler.symbol_table().export_cycle_count_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote cycle counts to {}", path.display());
    }
    Ok(())
}

// game.nes -> game.nes.symbols.json
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
