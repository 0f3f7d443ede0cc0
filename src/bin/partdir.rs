//! partdir CLI
//!
//! Inspect and edit a file-backed partition directory.

use clap::{Args as ClapArgs, Parser, Subcommand};
use partdir::config::{default_static_regions, region_ids};
use partdir::store::LogRecovery;
use partdir::{
    AreaSource, Config, Directory, FileStore, FlashMap, Partition, PartitionRecord, StaticRegion,
    SyncStrategy,
};
use tracing_subscriber::{fmt, EnvFilter};

/// partdir CLI
#[derive(Parser, Debug)]
#[command(name = "partdir")]
#[command(about = "Dynamic partition directory over a log-structured store")]
#[command(version)]
struct Args {
    /// Store log file
    #[arg(short, long, default_value = "./partdir_data/partitions.log")]
    store: String,

    /// Directory capacity (defaults to one less than the static region count, at most 10)
    #[arg(short, long)]
    max_partitions: Option<u8>,

    /// Static region as ID:OFFSET:SIZE (repeatable; replaces the default layout)
    #[arg(short, long = "region", value_parser = parse_region)]
    regions: Vec<(u8, u64, u64)>,

    /// Static region that holds the directory and names the device
    #[arg(short, long, default_value_t = region_ids::STORAGE)]
    base_region: u8,

    /// Device id stamped onto partitions
    #[arg(long, default_value_t = 0)]
    device_id: u8,

    /// Device name stamped onto partitions
    #[arg(long, default_value = "FLASH_CTRL")]
    device_name: String,

    /// fsync every N writes instead of every write
    #[arg(long)]
    sync_every: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List claimed slots
    List,

    /// Print the claimed count
    Count,

    /// Look up a partition by index or id
    Get {
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        index: Option<u8>,

        #[arg(long)]
        id: Option<u8>,
    },

    /// Append a partition at the end of the directory
    Append(RecordArgs),

    /// Overwrite the slot at an already claimed index
    Set {
        /// Slot index
        index: u8,

        #[command(flatten)]
        record: RecordArgs,
    },

    /// Overwrite by id, filling a hole or appending when the id is new
    Upsert(RecordArgs),

    /// Delete the partition at an index, leaving a hole
    Delete {
        /// Slot index
        index: u8,
    },

    /// Show the effective flash map (dynamic over static)
    Map,

    /// Check the store log without modifying it
    Verify,

    /// Rewrite the store log with live keys only
    Compact,
}

#[derive(ClapArgs, Debug)]
struct RecordArgs {
    /// Partition id
    #[arg(long)]
    id: u8,

    /// Start offset (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_number)]
    offset: u64,

    /// Size in bytes (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_number)]
    size: u64,
}

impl RecordArgs {
    fn record(&self) -> PartitionRecord {
        PartitionRecord::new(self.id, self.offset, self.size)
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,partdir=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("partdir v{}", partdir::VERSION);
    tracing::debug!("Store: {}", args.store);

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> partdir::Result<()> {
    let config = build_config(&args);

    match args.command {
        Commands::Verify => {
            let result = LogRecovery::verify(&config.store_path)?;
            println!(
                "entries={} corrupted={} last_lsn={} torn_tail={} valid_len={}",
                result.entries_recovered,
                result.entries_corrupted,
                result.last_lsn,
                result.was_truncated,
                result.valid_len
            );
            return Ok(());
        }
        Commands::Compact => {
            let store = FileStore::open_with_config(&config)?;
            let stale = store.stale_entries();
            store.compact()?;
            println!("compacted: dropped {} stale entries", stale);
            return Ok(());
        }
        Commands::Map => {
            let store = FileStore::open_with_config(&config)?;
            let map = FlashMap::open(store, &config)?;
            for area in map.areas()? {
                let source = match area.source {
                    AreaSource::Dynamic { index } => format!("dynamic[{}]", index),
                    AreaSource::Static => "static".to_string(),
                };
                println!("{:<12} {}", source, format_partition(&area.partition));
            }
            return Ok(());
        }
        _ => {}
    }

    let mut directory = Directory::open_file(&config)?;

    match args.command {
        Commands::List => {
            for (index, slot) in directory.slots() {
                match slot.record() {
                    Some(_) => {
                        let partition = directory.get_by_index(index)?;
                        println!("[{}] {}", index, format_partition(&partition));
                    }
                    None => println!("[{}] <hole>", index),
                }
            }
        }
        Commands::Count => println!("{}", directory.count()),
        Commands::Get { index, id } => {
            let partition = match (index, id) {
                (Some(index), _) => directory.get_by_index(index)?,
                (None, Some(id)) => directory.get_by_id(id)?,
                (None, None) => {
                    return Err(partdir::PartdirError::Config(
                        "get needs --index or --id".to_string(),
                    ))
                }
            };
            println!("{}", format_partition(&partition));
        }
        Commands::Append(record) => {
            let index = directory.append(record.record())?;
            println!("appended at index {}", index);
        }
        Commands::Set { index, record } => {
            directory.set_at_index(index, record.record())?;
            println!("wrote index {}", index);
        }
        Commands::Upsert(record) => {
            let index = directory.upsert_by_id(record.record())?;
            println!("wrote index {}", index);
        }
        Commands::Delete { index } => {
            directory.delete(index)?;
            println!("deleted index {}", index);
        }
        Commands::Map | Commands::Verify | Commands::Compact => {}
    }

    for (id, indices) in directory.duplicate_ids() {
        tracing::warn!("id {} is stored at indices {:?}", id, indices);
    }

    Ok(())
}

fn build_config(args: &Args) -> Config {
    let mut regions: Vec<StaticRegion> = if args.regions.is_empty() {
        default_static_regions()
    } else {
        args.regions
            .iter()
            .map(|&(id, offset, size)| StaticRegion::new(id, 0, "", offset, size))
            .collect()
    };

    for region in &mut regions {
        region.device_id = args.device_id;
        region.device_name = args.device_name.clone();
    }

    let mut builder = Config::builder()
        .store_path(&args.store)
        .static_regions(regions)
        .base_region_id(args.base_region);

    if let Some(n) = args.max_partitions {
        builder = builder.max_partitions(n);
    }
    if let Some(count) = args.sync_every {
        builder = builder.sync_strategy(SyncStrategy::EveryNEntries { count });
    }

    builder.build()
}

fn format_partition(p: &Partition) -> String {
    format!(
        "id={:<3} offset={:#010x} size={:#010x} device={}({})",
        p.id, p.offset, p.size, p.device_name, p.device_id
    )
}

fn parse_number(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

fn parse_region(s: &str) -> Result<(u8, u64, u64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [id, offset, size] = parts.as_slice() else {
        return Err(format!("expected ID:OFFSET:SIZE, got {:?}", s));
    };
    let id = id.parse::<u8>().map_err(|e| format!("invalid region id {:?}: {}", id, e))?;
    Ok((id, parse_number(offset)?, parse_number(size)?))
}
