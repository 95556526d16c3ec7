// Command-line driver for the svfmt formatter.
//
// Reads SystemVerilog sources, runs the analysis and formatting pipeline,
// and writes the result to stdout or back to the file. Exit codes:
//   0 - everything formatted, no diagnostics
//   1 - some file produced diagnostics (or --check found a difference)
//   2 - an I/O failure (the file is skipped, processing continues)

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use svfmt_format::{format_source, FormatStyle, LineNumberSet};

#[derive(Parser)]
#[command(name = "svfmt", version, about = "SystemVerilog formatter")]
struct Args {
    /// Input files; reads stdin when none are given.
    files: Vec<PathBuf>,

    /// Rewrite files in place instead of printing to stdout.
    #[arg(long)]
    inplace: bool,

    /// Exit non-zero when any file would change, without writing.
    #[arg(long)]
    check: bool,

    /// Only format these 1-based lines (e.g. "3-7,12"); other lines are
    /// preserved verbatim.
    #[arg(long)]
    lines: Option<String>,

    /// Style configuration file (YAML); defaults apply when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print diagnostics for rejected tokens to stderr.
    #[arg(long)]
    verbose: bool,
}

/// Parse "3-7,12" into a 0-based line set.
fn parse_line_ranges(spec: &str) -> Result<LineNumberSet, String> {
    let mut set = LineNumberSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((a, b)) => {
                let first: usize = a.trim().parse().map_err(|_| format!("bad line: {}", a))?;
                let last: usize = b.trim().parse().map_err(|_| format!("bad line: {}", b))?;
                if first == 0 || last < first {
                    return Err(format!("bad range: {}", part));
                }
                set.add_range(first - 1, last);
            }
            None => {
                let line: usize = part.parse().map_err(|_| format!("bad line: {}", part))?;
                if line == 0 {
                    return Err(format!("bad line: {}", part));
                }
                set.add_line(line - 1);
            }
        }
    }
    Ok(set)
}

fn load_style(args: &Args) -> Result<FormatStyle, String> {
    match &args.config {
        Some(path) => FormatStyle::from_yaml_file(path).map_err(|e| e.to_string()),
        None => Ok(FormatStyle::default()),
    }
}

enum FileStatus {
    Clean,
    Diagnostics,
    IoError,
}

fn process(source: &str, path_label: &str, args: &Args, style: &FormatStyle) -> (String, FileStatus) {
    let outcome = match &args.lines {
        Some(spec) => {
            let lines = match parse_line_ranges(spec) {
                Ok(lines) => lines,
                Err(message) => {
                    eprintln!("svfmt: {}", message);
                    return (source.to_string(), FileStatus::IoError);
                }
            };
            let mut options = svfmt_format::FormatOptions::default();
            options.disabled_ranges = lines.complement_byte_ranges(source);
            let cancel = std::sync::atomic::AtomicBool::new(false);
            match svfmt_format::format_source_with(source, style, &options, &cancel) {
                Ok(outcome) => outcome,
                Err(_) => return (source.to_string(), FileStatus::Diagnostics),
            }
        }
        None => format_source(source, style),
    };
    let status = if outcome.rejects.is_empty() {
        FileStatus::Clean
    } else {
        if args.verbose {
            for reject in &outcome.rejects {
                eprintln!(
                    "{}: {} error at byte {}: {}",
                    path_label, reject.phase, reject.token.span.start, reject.explanation
                );
            }
        }
        FileStatus::Diagnostics
    };
    (outcome.text, status)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let style = match load_style(&args) {
        Ok(style) => style,
        Err(message) => {
            eprintln!("svfmt: {}", message);
            return ExitCode::from(2);
        }
    };

    let mut had_diagnostics = false;
    let mut had_io_error = false;

    if args.files.is_empty() {
        let mut source = String::new();
        if std::io::stdin().read_to_string(&mut source).is_err() {
            eprintln!("svfmt: cannot read stdin");
            return ExitCode::from(2);
        }
        let (formatted, status) = process(&source, "<stdin>", &args, &style);
        match status {
            FileStatus::Diagnostics => had_diagnostics = true,
            FileStatus::IoError => had_io_error = true,
            FileStatus::Clean => {}
        }
        if args.check {
            if formatted != source {
                had_diagnostics = true;
            }
        } else {
            print!("{}", formatted);
        }
    }

    for path in &args.files {
        let label = path.display().to_string();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("svfmt: {}: {}", label, error);
                had_io_error = true;
                continue;
            }
        };
        let (formatted, status) = process(&source, &label, &args, &style);
        match status {
            FileStatus::Diagnostics => had_diagnostics = true,
            FileStatus::IoError => had_io_error = true,
            FileStatus::Clean => {}
        }
        if args.check {
            if formatted != source {
                eprintln!("svfmt: {} needs formatting", label);
                had_diagnostics = true;
            }
        } else if args.inplace {
            if formatted != source {
                if let Err(error) = fs::write(path, &formatted) {
                    eprintln!("svfmt: {}: {}", label, error);
                    had_io_error = true;
                }
            }
        } else {
            print!("{}", formatted);
        }
    }

    if had_io_error {
        ExitCode::from(2)
    } else if had_diagnostics {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_ranges() {
        let set = parse_line_ranges("3-5,9").unwrap();
        assert!(!set.contains(1));
        assert!(set.contains(2));
        assert!(set.contains(4));
        assert!(!set.contains(5));
        assert!(set.contains(8));
        assert!(parse_line_ranges("0").is_err());
        assert!(parse_line_ranges("5-3").is_err());
        assert!(parse_line_ranges("x").is_err());
    }
}
