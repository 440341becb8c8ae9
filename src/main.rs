use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use copperline::Copperline;

use dwarfline::utils::{basename, parse_address};
use dwarfline::{Location, Symbolizer};

#[derive(Parser)]
#[command(
    name = "dwarfline",
    about = "Translate addresses into file names and line numbers",
    after_help = "\
EXAMPLES:
    dwarfline -e ./app 0x401136              File and line
    dwarfline -f -e ./app -e ./libfoo.so 4096  Function too, two binaries
    dwarfline -e ./app                       Read addresses from a prompt"
)]
struct Args {
    /// Binary to read debug information from (repeat to try several in order)
    #[arg(short, long = "exe", value_name = "BINARY", required = true)]
    exe: Vec<PathBuf>,

    /// Print the function name before the location
    #[arg(short, long)]
    functions: bool,

    /// Strip directories from file names
    #[arg(short = 's', long)]
    basenames: bool,

    /// Addresses to resolve (0x-prefixed hex or decimal)
    #[arg(value_name = "ADDRESS")]
    addresses: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let symbolizer = Symbolizer::from_paths(&args.exe);
    if symbolizer.is_empty() {
        bail!("none of the given binaries could be loaded");
    }

    if args.addresses.is_empty() {
        return main_loop(&symbolizer, &args);
    }
    for address in &args.addresses {
        lookup(&symbolizer, &args, address);
    }
    Ok(())
}

fn main_loop(symbolizer: &Symbolizer, args: &Args) -> Result<()> {
    let mut cl = Copperline::new();
    while let Ok(line) = cl.read_line("dwarfline> ", copperline::Encoding::Utf8) {
        let address = line.trim();
        if !address.is_empty() {
            lookup(symbolizer, args, address);
        }
        cl.add_history(line);
    }
    Ok(())
}

fn lookup(symbolizer: &Symbolizer, args: &Args, text: &str) {
    match parse_address(text) {
        Ok(address) => {
            let location = symbolizer.resolve(address);
            println!("{}", format_location(location.as_ref(), args));
        }
        Err(err) => eprintln!("{err}"),
    }
}

/// addr2line layout: optional function line, then `file:line`, `??` for unknowns.
fn format_location(location: Option<&Location>, args: &Args) -> String {
    let mut out = String::new();
    if args.functions {
        let function = location.and_then(|loc| loc.function.as_deref());
        out.push_str(function.unwrap_or("??"));
        out.push('\n');
    }
    match location {
        Some(loc) => {
            let file = if args.basenames {
                basename(&loc.file)
            } else {
                loc.file.as_str()
            };
            out.push_str(&format!("{file}:{}", loc.line));
        }
        None => out.push_str("??:0"),
    }
    out
}
