use std::fmt::Display;

use clap::{App, Arg, ArgMatches, SubCommand};
use shmseg::{
    error::SegmentError,
    record::{self, Record, RECORD_OFFSET},
    segment::Backend,
    FileBackend, MappingBackend, RawAccessor, Result, Segment, SegmentConfig, ShmError,
};

/// Value types the `dump` subcommand can decode
const RECORD_TYPES: &[&str] = &[
    "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64", "bool",
];

fn main() -> Result<()> {
    env_logger::init();

    let name_arg = || {
        Arg::with_name("name")
            .short("n")
            .long("name")
            .value_name("NAME")
            .help("Name of the segment")
            .required(true)
            .takes_value(true)
    };
    let size_arg = || {
        Arg::with_name("size")
            .short("s")
            .long("size")
            .value_name("SIZE")
            .help("Segment size in bytes (<= 0 or above 8 MiB means 8 MiB)")
            .default_value("8388608")
            .allow_hyphen_values(true)
            .takes_value(true)
    };
    let dir_arg = || {
        Arg::with_name("dir")
            .short("d")
            .long("dir")
            .value_name("DIR")
            .help("Back the segment with a file in DIR instead of POSIX shm")
            .takes_value(true)
    };
    let attach_arg = || {
        Arg::with_name("attach")
            .long("attach")
            .help("Fail instead of creating the segment when the name is absent")
    };
    let addr_arg = || {
        Arg::with_name("addr")
            .short("a")
            .long("addr")
            .value_name("ADDR")
            .help("Byte offset into the segment")
            .default_value("0")
            .takes_value(true)
    };

    let matches = App::new("shmseg-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Named shared memory segment tool")
        .subcommand(
            SubCommand::with_name("create")
                .about("Create a segment, or attach to it if it already exists")
                .arg(name_arg())
                .arg(size_arg())
                .arg(dir_arg()),
        )
        .subcommand(
            SubCommand::with_name("write")
                .about("Write hex-encoded bytes at an offset")
                .arg(name_arg())
                .arg(size_arg())
                .arg(dir_arg())
                .arg(attach_arg())
                .arg(addr_arg())
                .arg(
                    Arg::with_name("hex")
                        .short("x")
                        .long("hex")
                        .value_name("HEX")
                        .help("Bytes to write, e.g. 010203")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Read bytes at an offset and print them as hex")
                .arg(name_arg())
                .arg(size_arg())
                .arg(dir_arg())
                .arg(attach_arg())
                .arg(addr_arg())
                .arg(
                    Arg::with_name("len")
                        .short("l")
                        .long("len")
                        .value_name("LEN")
                        .help("Number of bytes to read")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Decode fixed-layout values stored at the start of the segment")
                .arg(name_arg())
                .arg(size_arg())
                .arg(dir_arg())
                .arg(attach_arg())
                .arg(
                    Arg::with_name("type")
                        .short("t")
                        .long("type")
                        .value_name("TYPE")
                        .help("Value type of each element")
                        .possible_values(RECORD_TYPES)
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("count")
                        .short("c")
                        .long("count")
                        .value_name("COUNT")
                        .help("Number of consecutive values to decode")
                        .default_value("1")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("remove")
                .about("Remove a segment name")
                .arg(name_arg())
                .arg(dir_arg()),
        )
        .subcommand(SubCommand::with_name("info").about("Show version and build information"))
        .get_matches();

    match matches.subcommand() {
        ("create", Some(m)) => handle_create(m),
        ("write", Some(m)) => handle_write(m),
        ("read", Some(m)) => handle_read(m),
        ("dump", Some(m)) => handle_dump(m),
        ("remove", Some(m)) => handle_remove(m),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .unwrap_or_default()
        .parse()
        .map_err(|_| ShmError::from(SegmentError::invalid_argument(name, "Invalid number")))
}

fn open_segment(matches: &ArgMatches, writable: bool) -> Result<Segment> {
    let name = matches.value_of("name").unwrap_or_default();
    let size: i64 = parse_arg(matches, "size")?;

    let mut config = SegmentConfig::new(name, size)
        .with_create(!matches.is_present("attach"))
        .with_writable(writable);
    if let Some(dir) = matches.value_of("dir") {
        config = config.with_file_dir(dir);
    }

    Ok(Segment::with_config(config)?)
}

fn parse_hex(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim_start_matches("0x");
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(
            SegmentError::invalid_argument("hex", "Expected an even number of hex digits").into(),
        );
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ShmError::from(SegmentError::invalid_argument("hex", "Invalid hex digit")))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn handle_create(matches: &ArgMatches) -> Result<()> {
    let segment = open_segment(matches, true)?;

    println!(
        "{} segment '{}' with size {} bytes",
        if segment.already_existed() { "Attached to" } else { "Created" },
        segment.name(),
        segment.size()
    );
    println!("already_existed: {}", segment.already_existed());
    Ok(())
}

fn handle_write(matches: &ArgMatches) -> Result<()> {
    let mut segment = open_segment(matches, true)?;
    let addr: usize = parse_arg(matches, "addr")?;
    let bytes = parse_hex(matches.value_of("hex").unwrap_or_default())?;

    segment.write_from(addr, &bytes)?;
    segment.flush()?;
    println!("Wrote {} bytes at {}", bytes.len(), addr);
    Ok(())
}

fn handle_read(matches: &ArgMatches) -> Result<()> {
    let segment = open_segment(matches, false)?;
    let addr: usize = parse_arg(matches, "addr")?;
    let len: usize = parse_arg(matches, "len")?;

    let bytes = segment.read(addr, len)?;
    println!("{}", to_hex(&bytes));
    Ok(())
}

fn handle_dump(matches: &ArgMatches) -> Result<()> {
    let segment = open_segment(matches, false)?;
    let count: usize = parse_arg(matches, "count")?;

    let values = match matches.value_of("type").unwrap_or_default() {
        "u8" => dump_values::<u8>(&segment, count)?,
        "u16" => dump_values::<u16>(&segment, count)?,
        "u32" => dump_values::<u32>(&segment, count)?,
        "u64" => dump_values::<u64>(&segment, count)?,
        "i8" => dump_values::<i8>(&segment, count)?,
        "i16" => dump_values::<i16>(&segment, count)?,
        "i32" => dump_values::<i32>(&segment, count)?,
        "i64" => dump_values::<i64>(&segment, count)?,
        "f32" => dump_values::<f32>(&segment, count)?,
        "f64" => dump_values::<f64>(&segment, count)?,
        "bool" => dump_values::<bool>(&segment, count)?,
        other => {
            let message = format!("Unknown type {}", other);
            return Err(SegmentError::invalid_argument("type", message).into());
        }
    };

    println!("{}", values.join(" "));
    Ok(())
}

/// Decode `count` consecutive `R` values from the record offset
fn dump_values<R: Record + Display>(segment: &Segment, count: usize) -> Result<Vec<String>> {
    let len = R::SIZE
        .checked_mul(count)
        .ok_or_else(|| ShmError::from(SegmentError::invalid_argument("count", "Too large")))?;
    let bytes = segment.read(RECORD_OFFSET, len)?;

    bytes
        .chunks_exact(R::SIZE)
        .map(|chunk| {
            record::decode::<R>(chunk)
                .map(|value| value.to_string())
                .map_err(ShmError::from)
        })
        .collect()
}

fn handle_remove(matches: &ArgMatches) -> Result<()> {
    let name = matches.value_of("name").unwrap_or_default();

    match matches.value_of("dir") {
        Some(dir) => FileBackend::new(dir)
            .remove(name)
            .map_err(|e| ShmError::from_io(e, "Failed to remove backing file"))?,
        None => Segment::remove(name)?,
    }
    println!("Removed segment '{}'", name);
    Ok(())
}

fn show_info() -> Result<()> {
    println!("shmseg v{}", shmseg::VERSION);
    println!("Maximum segment size: {} bytes", shmseg::config::MAX_SEGMENT_SIZE);
    println!("Default backing: {}", backing_name(&Backend::default()));

    #[cfg(feature = "c-api")]
    println!("C API: enabled");
    #[cfg(not(feature = "c-api"))]
    println!("C API: disabled");

    Ok(())
}

fn backing_name(backend: &Backend) -> &'static str {
    match backend {
        Backend::Shm(_) => "POSIX shared memory",
        Backend::File(_) => "file",
    }
}
