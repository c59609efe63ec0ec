use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use mdstore::{Bargain, Day, HisMin, Minute, RecordCodec, Store};
use serde::Serialize;

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Day,
    Minute,
    Hismin,
    Bargain,
}

#[derive(Parser)]
#[command(name = "mdstore-info", about = "Inspect a market-data block-chain file")]
struct Args {
    /// Record kind stored in the file.
    #[arg(short = 't', long = "type", value_enum)]
    kind: RecordKind,

    /// Print the number of instruments in the header table and exit.
    #[arg(short = 'c', long = "count", conflicts_with_all = ["all", "list", "id"])]
    count: bool,

    /// Dump every instrument's records.
    #[arg(short = 'a', long = "all", conflicts_with_all = ["count", "list", "id"])]
    all: bool,

    /// List instrument ids present in the header table and exit.
    #[arg(short = 'l', long = "list", conflicts_with_all = ["count", "all", "id"])]
    list: bool,

    /// Dump the records of a single instrument.
    #[arg(short = 'i', long = "id", conflicts_with_all = ["count", "all", "list"])]
    id: Option<u32>,

    /// Emit JSON instead of a plain-text table.
    #[arg(long)]
    json: bool,

    /// Path to the data file.
    file: PathBuf,
}

fn main() -> ExitCode {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let result = match args.kind {
        RecordKind::Day => run::<Day>(&args),
        RecordKind::Minute => run::<Minute>(&args),
        RecordKind::Hismin => run::<HisMin>(&args),
        RecordKind::Bargain => run::<Bargain>(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run<R: RecordCodec + Serialize>(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let store: Store<R> = Store::open(&args.file, false)?;

    if args.count {
        println!("{}", store.len());
        return Ok(());
    }

    if args.list {
        let ids = store.ids();
        if args.json {
            println!("{}", serde_json::to_string(&ids)?);
        } else {
            for id in ids {
                println!("{id}");
            }
        }
        return Ok(());
    }

    if let Some(id) = args.id {
        return dump_one(&store, id, args.json);
    }

    if args.all {
        for id in store.ids() {
            println!("id:{id}");
            dump_one(&store, id, args.json)?;
        }
        return Ok(());
    }

    log::warn!("no mode selected; pass one of --count, --all, --list, or --id <ID>");
    Ok(())
}

/// Dump one instrument's records: one JSON object per line with `--json`,
/// otherwise the brief summary line each record kind defines.
fn dump_one<R: RecordCodec + Serialize>(
    store: &Store<R>,
    id: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for record in store.get(id)? {
        let record = record?;
        if json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{}", record.summary());
        }
    }
    Ok(())
}
