use ihexlib::{
    HexImage, RecordSize, SegmentKind, annotate_listing, decode_with_diagnostics, diff, encode,
    verify_checksum,
};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");

    println!(" -----------------------------------");
    println!("|  Intel HEX Image Utility  | v{version} |");
    println!(" -----------------------------------");
    println!("\nUsage:");
    println!("  hexcli info <input>");
    println!("  hexcli canon <input> <output> [options]");
    println!("  hexcli compare <input1> <input2>");
    println!("  hexcli annotate <input>");
    println!("\nOptions:");
    println!("  --record-size <val>   Data bytes per record when writing (default: 16)");
    println!("\nExamples:");
    println!("  hexcli info program.hex");
    println!("  hexcli canon program.hex program_canon.hex --record-size 32");
    println!("  hexcli compare program.hex reference.hex");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    println!();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    // Dispatch and immediately handle results
    if let Err(e) = run_dispatch(command, &args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_dispatch(cmd: &str, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        "info" => {
            // Guard: Check args count
            let path_str = args.get(2).ok_or("Missing input file path")?;

            // Guard: File must exist
            let abs_path =
                validate_exists(path_str).map_err(|_| format!("File not found: {path_str}"))?;

            run_info(&abs_path)
        }
        "canon" => {
            // Guard: Check file path arguments given
            let in_path_str = args.get(2).ok_or("Missing input path")?;
            let out_path_str = args.get(3).ok_or("Missing output path")?;

            // Guard: Check input exists
            let in_abs_path = validate_exists(in_path_str)?;

            // Guard: Check output is a hex path
            let out_path = PathBuf::from(out_path_str);
            if !is_hex_path(&out_path) {
                return Err(format!("Argument '{out_path_str}' is not a HEX output path").into());
            }

            let record_size = match get_flag_value(args, "--record-size") {
                Some(size) => {
                    let size: u8 = size
                        .parse()
                        .map_err(|_e| format!("Invalid record size: {size}"))?;
                    RecordSize::new(size)?
                }
                None => RecordSize::DEFAULT,
            };

            run_canon(&in_abs_path, &out_path, record_size)
        }
        "compare" => {
            let left = validate_exists(args.get(2).ok_or("Missing first input path")?)?;
            let right = validate_exists(args.get(3).ok_or("Missing second input path")?)?;

            run_compare(&left, &right)
        }
        "annotate" => {
            let path = validate_exists(args.get(2).ok_or("Missing input file path")?)?;

            run_annotate(&path)
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn run_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fn format_addr(addr: u16) -> String {
        format!("0x{addr:04X}")
    }

    if !is_hex_path(path) {
        return Err(format!("File type not supported: {}", path.display()).into());
    }

    let text = std::fs::read_to_string(path)?;
    let decoded = decode_with_diagnostics(&text);
    let bad_checksums = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(':') && !verify_checksum(line))
        .count();

    println!("File Path:   {}", path.display());
    println!("Data Size:   {} bytes", decoded.image.len());
    println!(
        "Range:       {} - {}",
        format_addr(decoded.image.get_min_addr().unwrap_or(0)),
        format_addr(decoded.image.get_max_addr().unwrap_or(0)),
    );
    println!("Skipped:     {} line(s)", decoded.skipped.len());
    println!("Checksums:   {bad_checksums} mismatch(es)");
    for err in &decoded.skipped {
        println!("  {err}");
    }
    Ok(())
}

fn run_canon(
    in_path: &Path,
    out_path: &Path,
    record_size: RecordSize,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = HexImage::from_hex(in_path)?;
    image.write_hex(out_path, record_size)?;

    // Validate output file was written
    let out_abs_path = validate_exists(&out_path.to_string_lossy())?;

    println!(
        "Canonicalized {} ({} bytes) -> {}",
        in_path.display(),
        image.len(),
        out_abs_path.display()
    );
    Ok(())
}

fn run_compare(left: &Path, right: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let left_text = std::fs::read_to_string(left)?;
    let right_text = std::fs::read_to_string(right)?;

    let differences = diff(&left_text, &right_text);
    if differences.is_empty() {
        println!("Images match: {} == {}", left.display(), right.display());
        return Ok(());
    }

    let show = |byte: Option<u8>| byte.map_or_else(|| "--".to_string(), |b| format!("{b:02X}"));
    for d in differences.iter().take(32) {
        println!("  0x{:04X}: {} != {}", d.address, show(d.left), show(d.right));
    }
    Err(format!("Images differ at {} address(es)", differences.len()).into())
}

fn run_annotate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;

    for line in annotate_listing(&text) {
        let labels: Vec<String> = line
            .segments
            .iter()
            .map(|seg| {
                let kind = match seg.kind {
                    SegmentKind::Header => "header",
                    SegmentKind::Data => "data",
                    SegmentKind::Checksum => "checksum",
                    SegmentKind::Malformed => "malformed",
                };
                format!("{kind}[{}..{}]", seg.range.start, seg.range.end)
            })
            .collect();
        println!("{}  {}", line.numbered(), labels.join(" "));
    }
    Ok(())
}

// =============================== HELPER FUNCTIONS ===============================

/// Check the file's extension is "hex" (case-insensitive)
fn is_hex_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex"))
}

/// Validate that a path exists and is a file. Returns absolute path.
fn validate_exists(path_str: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(format!("File not found: {path_str}").into());
    }
    if !path.is_file() {
        return Err(format!("Path is not a file: {path_str}").into());
    }
    // Return absolute path
    Ok(std::fs::canonicalize(path)?)
}

/// Find the value after a specific flag (e.g., "--record-size 32")
fn get_flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}
