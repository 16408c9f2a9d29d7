//! CLI entry point for `zxfs`.
//!
//! Usage:
//!     zxfs [-c config.ini] [-i image] new
//!     zxfs [-c config.ini] [-i image] put <name> <host_file>
//!     zxfs [-c config.ini] [-i image] get <name> [-o out]
//!     zxfs [-c config.ini] [-i image] ls

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use zxfs::config::{self, ZxfsConfig};
use zxfs::{logger, ImageFile, OpenMode, Zxfs, ZxfsError};

#[derive(Parser)]
#[command(name = "zxfs", about = "Flat file store inside a single image")]
struct Cli {
    /// INI file with `[storage] image` and `[logging] level`
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the .img file, overrides the config
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an image holding empty tables (truncates an existing file)
    New,
    /// Store a host file under NAME and persist the tables
    Put { name: String, source: PathBuf },
    /// Print the contents of NAME, or write them to --out
    Get {
        name: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List every file with its size
    Ls,
}

fn main() {
    let args = Cli::parse();

    let cfg = match &args.config {
        Some(path) => config::load_config(path).unwrap_or_else(|e| fail(e)),
        None => ZxfsConfig::default(),
    };

    let level = if args.verbose { LevelFilter::Debug } else { cfg.log_level };
    if let Err(e) = logger::init(level) {
        eprintln!("cannot install logger: {}", e);
    }

    let image = match args.image.clone().or_else(|| cfg.image.clone().map(PathBuf::from)) {
        Some(p) => p,
        None => {
            eprintln!("Error: no image given");
            eprintln!("Pass --image <file> or set storage.image in the config.");
            process::exit(2);
        }
    };

    if let Err(e) = run(&image, args.command) {
        fail(e);
    }
}

fn run(image: &Path, command: Command) -> Result<(), ZxfsError> {
    match command {
        Command::New => {
            let mut fs = Zxfs::open(image, OpenMode::Create)?;
            fs.persist()?;
            println!("ZXFS image created at {}", fs.store().path().display());
            fs.close()?;
        }
        Command::Put { name, source } => {
            let data = std::fs::read(&source)?;
            let mut fs = open_existing(image)?;
            fs.write(&name, &data)?;
            fs.persist()?;
            fs.close()?;
            println!("stored {} ({} bytes)", name, data.len());
        }
        Command::Get { name, out } => {
            let mut fs = open_existing(image)?;
            let Some(data) = fs.read(&name)? else {
                eprintln!("{}: no such file", name);
                process::exit(1);
            };
            match out {
                Some(path) => std::fs::write(path, &data)?,
                None => std::io::stdout().lock().write_all(&data)?,
            }
        }
        Command::Ls => {
            let fs = open_existing(image)?;
            for (name, size) in fs.list() {
                println!("{:>8}  {}", size, name);
            }
        }
    }
    Ok(())
}

fn open_existing(image: &Path) -> Result<Zxfs<ImageFile>, ZxfsError> {
    if !image.exists() {
        eprintln!("Error: image not found at {}", image.display());
        eprintln!("Run `zxfs -i {} new` first.", image.display());
        process::exit(1);
    }
    Zxfs::open(image, OpenMode::ReadWrite)
}

fn fail(e: ZxfsError) -> ! {
    eprintln!("zxfs: {}", e);
    process::exit(1);
}
