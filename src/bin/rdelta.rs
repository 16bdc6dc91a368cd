#![deny(unsafe_code)]

//! `rdelta` — compute and apply network deltas in the rdiff style.
//!
//! Three subcommands chain into a transfer: `signature` summarises the file
//! the receiver already has, `delta` compares that summary against the new
//! file, and `patch` rebuilds the new file from the old one plus the delta.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use engine::SeekBasis;
use engine::whole::{BufSizes, delta_file, loadsig_file, patch_file, signature_file};
use protocol::SigMagic;
use signature::StrongLen;

fn cli() -> Command {
    let buffer_args = [
        Arg::new("input-size")
            .short('I')
            .long("input-size")
            .value_name("BYTES")
            .help("Input buffer size for the file driver"),
        Arg::new("output-size")
            .short('O')
            .long("output-size")
            .value_name("BYTES")
            .help("Output buffer size for the file driver"),
        Arg::new("statistics")
            .short('s')
            .long("statistics")
            .help("Report operation statistics on stderr")
            .action(ArgAction::SetTrue),
    ];

    Command::new("rdelta")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compute and apply network deltas")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase diagnostic output (repeatable)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("signature")
                .about("Generate the signature of a basis file")
                .arg(
                    Arg::new("block-size")
                        .short('b')
                        .long("block-size")
                        .value_name("BYTES")
                        .help("Signature block size (default derived from the basis size)"),
                )
                .arg(
                    Arg::new("sum-size")
                        .short('S')
                        .long("sum-size")
                        .value_name("BYTES")
                        .help("Strong sum truncation (default: the full digest)"),
                )
                .arg(
                    Arg::new("hash")
                        .short('H')
                        .long("hash")
                        .value_name("ALG")
                        .value_parser(["md4", "blake2"])
                        .default_value("blake2")
                        .help("Strong checksum algorithm"),
                )
                .arg(
                    Arg::new("rollsum")
                        .short('R')
                        .long("rollsum")
                        .value_name("ALG")
                        .value_parser(["rollsum", "rabinkarp"])
                        .default_value("rabinkarp")
                        .help("Rolling checksum algorithm"),
                )
                .args(buffer_args.clone())
                .arg(Arg::new("basis").required(true).value_name("BASIS"))
                .arg(Arg::new("signature").value_name("SIGNATURE")),
        )
        .subcommand(
            Command::new("delta")
                .about("Generate a delta from a signature and a new file")
                .args(buffer_args.clone())
                .arg(Arg::new("signature").required(true).value_name("SIGNATURE"))
                .arg(Arg::new("newfile").value_name("NEWFILE"))
                .arg(Arg::new("delta").value_name("DELTA")),
        )
        .subcommand(
            Command::new("patch")
                .about("Apply a delta to a basis file")
                .args(buffer_args)
                .arg(Arg::new("basis").required(true).value_name("BASIS"))
                .arg(Arg::new("delta").value_name("DELTA"))
                .arg(Arg::new("newfile").value_name("NEWFILE")),
        )
}

/// Opens a named input, `-` meaning stdin.
fn open_input(name: Option<&String>) -> io::Result<(Box<dyn Read>, Option<u64>)> {
    match name.map(String::as_str) {
        None | Some("-") => Ok((Box::new(io::stdin().lock()), None)),
        Some(path) => {
            let file = File::open(Path::new(path))?;
            let len = file.metadata().ok().map(|meta| meta.len());
            Ok((Box::new(file), len))
        }
    }
}

/// Opens a named output, `-` meaning stdout.
fn open_output(name: Option<&String>) -> io::Result<Box<dyn Write>> {
    match name.map(String::as_str) {
        None | Some("-") => Ok(Box::new(io::stdout().lock())),
        Some(path) => Ok(Box::new(File::create(Path::new(path))?)),
    }
}

fn parse_size(matches: &ArgMatches, name: &str) -> Result<Option<usize>, String> {
    match matches.get_one::<String>(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| format!("{name} must be a byte count, got {raw:?}")),
    }
}

fn buf_sizes(matches: &ArgMatches) -> Result<BufSizes, String> {
    Ok(BufSizes {
        input: parse_size(matches, "input-size")?,
        output: parse_size(matches, "output-size")?,
    })
}

fn run_signature(matches: &ArgMatches) -> Result<(), String> {
    let block_len = parse_size(matches, "block-size")?;
    let strong_len = match parse_size(matches, "sum-size")? {
        None => StrongLen::Max,
        Some(len) => StrongLen::Exact(len),
    };
    let magic = match (
        matches.get_one::<String>("rollsum").map(String::as_str),
        matches.get_one::<String>("hash").map(String::as_str),
    ) {
        (Some("rollsum"), Some("md4")) => SigMagic::Md4Rollsum,
        (Some("rollsum"), _) => SigMagic::Blake2Rollsum,
        (_, Some("md4")) => SigMagic::Md4RabinKarp,
        _ => SigMagic::Blake2RabinKarp,
    };

    let (mut basis, basis_len) = open_input(matches.get_one("basis")).map_err(stringify)?;
    let mut sig_out = open_output(matches.get_one("signature")).map_err(stringify)?;
    let stats = signature_file(
        &mut basis,
        &mut sig_out,
        basis_len,
        Some(magic),
        block_len,
        strong_len,
        buf_sizes(matches)?,
    )
    .map_err(stringify)?;
    report(matches, "signature", &stats);
    Ok(())
}

fn run_delta(matches: &ArgMatches) -> Result<(), String> {
    let (mut sig_in, sig_len) = open_input(matches.get_one("signature")).map_err(stringify)?;
    let (mut sig, load_stats) =
        loadsig_file(&mut sig_in, sig_len, BufSizes::default()).map_err(stringify)?;
    sig.build_hash_table().map_err(stringify)?;
    report(matches, "loadsig", &load_stats);

    let (mut new, _) = open_input(matches.get_one("newfile")).map_err(stringify)?;
    let mut delta_out = open_output(matches.get_one("delta")).map_err(stringify)?;
    let stats =
        delta_file(&sig, &mut new, &mut delta_out, buf_sizes(matches)?).map_err(stringify)?;
    report(matches, "delta", &stats);
    Ok(())
}

fn run_patch(matches: &ArgMatches) -> Result<(), String> {
    let basis_name = matches
        .get_one::<String>("basis")
        .expect("basis is a required argument");
    let basis = File::open(Path::new(basis_name)).map_err(stringify)?;

    let (mut delta, _) = open_input(matches.get_one("delta")).map_err(stringify)?;
    let mut new_out = open_output(matches.get_one("newfile")).map_err(stringify)?;
    let stats = patch_file(
        SeekBasis::new(basis),
        &mut delta,
        &mut new_out,
        buf_sizes(matches)?,
    )
    .map_err(stringify)?;
    report(matches, "patch", &stats);
    Ok(())
}

fn stringify(err: impl std::fmt::Display) -> String {
    err.to_string()
}

fn report(matches: &ArgMatches, op: &str, stats: &engine::Stats) {
    if matches.get_flag("statistics") {
        eprintln!("{op} statistics: {stats}");
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let result = match matches.subcommand() {
        Some(("signature", sub)) => run_signature(sub),
        Some(("delta", sub)) => run_delta(sub),
        Some(("patch", sub)) => run_patch(sub),
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("rdelta: {message}");
            ExitCode::FAILURE
        }
    }
}
