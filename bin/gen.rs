use clap::{Arg, Command};
use std::io::{self, Write};

const LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic course-registration CSV to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("no_header")
                .long("no-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("extra_cols")
                .long("extra-cols")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .get_matches();

    let rows: u64 = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let extra = matches.get_one::<usize>("extra_cols").copied().unwrap_or_default();

    let mut out = io::BufWriter::new(io::stdout().lock());

    if !matches.get_flag("no_header") {
        write!(&mut out, "Course Title,Total Registrations")?;
        for c in 0..extra {
            if c == 0 {
                write!(&mut out, ",Level")?;
            } else {
                write!(&mut out, ",Extra {c}")?;
            }
        }
        writeln!(&mut out)?;
    }

    // totals over 999 are written with grouping commas, so they must be quoted
    for i in 0..rows {
        let total = (i * 7919) % 250_000;
        write!(&mut out, "{} Course {i},\"{}\"", 100 + i % 900, group_thousands(total))?;
        for c in 0..extra {
            if c == 0 {
                write!(&mut out, ",{}", LEVELS[(i % 3) as usize])?;
            } else {
                write!(&mut out, ", {} ", i * c as u64)?;
            }
        }
        writeln!(&mut out)?;
        if i % 10_000 == 0 {
            out.flush()?;
        }
    }

    out.flush()?;
    Ok(())
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
