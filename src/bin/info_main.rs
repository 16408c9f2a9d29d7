//! CLI entry point for `zxfs_info`

use clap::Parser;
use log::LevelFilter;
use zxfs::fs_layout::{self, FatEntry};
use zxfs::{logger, MemImage, Zxfs};

/// Simple inspection tool for ZXFS images
#[derive(Parser)]
struct Cli {
    /// Path to the .img file
    image: String,

    /// Also print the block chain of every file
    #[arg(short, long)]
    chains: bool,
}

fn main() {
    let args = Cli::parse();
    let _ = logger::init(LevelFilter::Warn);

    // Inspect a copy so this tool never writes to the image.
    let bytes = match std::fs::read(&args.image) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("cannot read {}: {}", args.image, e);
            std::process::exit(1);
        }
    };
    let image_len = bytes.len();
    let fs = match Zxfs::load_from(MemImage::from_bytes(bytes)) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("{}: {}", args.image, e);
            std::process::exit(1);
        }
    };

    print_fs_info(&fs, image_len, args.chains);
}

fn print_fs_info(fs: &Zxfs<MemImage>, image_len: usize, chains: bool) {
    let fat = fs.allocation_table();
    let (mut linked, mut tails) = (0, 0);
    for e in fat.entries() {
        match e {
            FatEntry::Next(_) => linked += 1,
            FatEntry::EndOfChain => tails += 1,
            FatEntry::Free => {}
        }
    }

    println!("====== ZXFS IMAGE ======");
    println!("Image size:      {} bytes", image_len);
    println!("Block size:      {} bytes", fs_layout::BLOCK_SIZE);
    println!("Total blocks:    {}", fs_layout::TOTAL_BLOCKS);
    println!("Data area @      {} bytes", fs_layout::DATA_REGION_START);

    println!("\n====== ALLOCATION TABLE ======");
    println!("Free blocks:     {}", fs.free_blocks());
    println!("Linked blocks:   {}", linked);
    println!("Chain ends:      {}", tails);

    println!(
        "\n====== DIRECTORY ({}/{}) ======",
        fs.entries().len(),
        fs_layout::DIR_ENTRIES
    );
    for entry in fs.entries() {
        println!("- {} : {} bytes, {} blocks", entry.name, entry.size, entry.blocks.len());
        if chains {
            let walked = entry.blocks.first().map(|&h| fat.chain(h)).unwrap_or_default();
            println!("    record: {:?}", entry.blocks);
            if walked != entry.blocks {
                println!("    fat:    {:?}  (mismatch)", walked);
            }
        }
    }
}
