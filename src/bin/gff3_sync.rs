//! Thin CLI wrapper around [`gffstream::SyncInserter`].

use clap::Parser;
use gffstream::SyncInserter;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Rewrite GFF3 files with ### synchronization marks at every safe point",
    long_about = None
)]
struct Cli {
    /// Input GFF3 files, treated as one concatenation in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let result = SyncInserter::new(cli.inputs)
        .run(&mut out)
        .and_then(|()| out.flush().map_err(Into::into));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gff3-sync: {e}");
            ExitCode::FAILURE
        }
    }
}
