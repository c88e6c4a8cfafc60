//! # fontconv CLI
//!
//! Usage:
//!   fontconv --font Roboto.ttf -r 0x20-0x7F --size 16 --bpp 4 --format bin -o roboto_16.bin
//!   fontconv --font A.ttf -r 0x20-0x7F --font Icons.ttf --symbols "°" --size 20 --bpp 2 --format lvgl -o font.c
//!
//! `-r/--range` and `--symbols` belong to the `--font` given before them.

use std::env;
use std::path::PathBuf;
use std::process;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use fontconv::collect::{parse_range, FontSource, RangeItem};
use fontconv::error::FontError;
use fontconv::options::{Bpp, BuildOptions, OutputFormat, SubpixelMode};
use fontconv::writer::write_files;
use fontconv::ConvertArgs;

#[derive(Parser, Debug)]
#[command(
    name = "fontconv",
    version,
    about = "Compile TTF/OTF fonts into bitmap fonts for embedded GUIs"
)]
struct Cli {
    /// Source font file; may be given several times
    #[arg(long = "font", value_name = "PATH", required = true)]
    fonts: Vec<String>,

    /// Codepoint ranges for the preceding font, e.g. 0x20-0x7F,0xB0=>0xE000
    #[arg(short = 'r', long = "range", value_name = "RANGE")]
    ranges: Vec<String>,

    /// Characters to include from the preceding font
    #[arg(long, value_name = "CHARS")]
    symbols: Vec<String>,

    /// Output size, pixels
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    size: u16,

    /// Bits per pixel
    #[arg(long, value_parser = parse_bpp)]
    bpp: Bpp,

    /// Output format: bin, lvgl or dump
    #[arg(long, value_parser = parse_format)]
    format: OutputFormat,

    /// Output file (directory for dump)
    #[arg(short, long)]
    output: PathBuf,

    /// Horizontal subpixel rendering
    #[arg(long, conflicts_with = "lcd_v")]
    lcd: bool,

    /// Vertical subpixel rendering
    #[arg(long = "lcd-v")]
    lcd_v: bool,

    /// Store bitmaps without compression
    #[arg(long)]
    no_compress: bool,

    /// Disable the row filter before compression
    #[arg(long)]
    no_prefilter: bool,

    /// Drop kerning info
    #[arg(long)]
    no_kerning: bool,

    /// Prefer class kerning even when it is larger
    #[arg(long = "force-fast-kern-format")]
    fast_kerning: bool,

    /// Alternate path to lvgl.h in the C output
    #[arg(long, value_name = "PATH")]
    lv_include: Option<String>,

    /// Keep pixel data in the dump's font_info.json
    #[arg(long)]
    full_info: bool,
}

fn parse_bpp(s: &str) -> Result<Bpp, String> {
    let value: u8 = s.parse().map_err(|_| format!("{} is not a number", s))?;
    Bpp::try_from(value).map_err(|e| e.to_string())
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: FontError| e.to_string())
}

/// Attach every range/symbols value to the last `--font` before it.
fn assign_ranges(
    font_positions: &[usize],
    items: Vec<(usize, RangeItem)>,
) -> Result<Vec<Vec<RangeItem>>, FontError> {
    let mut per_font = vec![Vec::new(); font_positions.len()];

    for (pos, item) in items {
        let owner = font_positions
            .iter()
            .rposition(|&f| f < pos)
            .ok_or_else(|| {
                FontError::InvalidArgument(
                    "--range and --symbols must follow a --font".to_string(),
                )
            })?;
        per_font[owner].push(item);
    }

    if per_font.iter().any(Vec::is_empty) {
        return Err(FontError::InvalidArgument(
            "each --font needs at least one --range or --symbols".to_string(),
        ));
    }
    Ok(per_font)
}

fn indices(matches: &ArgMatches, id: &str) -> Vec<usize> {
    matches
        .indices_of(id)
        .map(|i| i.collect())
        .unwrap_or_default()
}

fn build_args(cli: Cli, matches: &ArgMatches) -> Result<ConvertArgs, FontError> {
    let mut items = Vec::new();
    for (pos, value) in indices(matches, "ranges").into_iter().zip(&cli.ranges) {
        items.push((pos, RangeItem::Range(parse_range(value)?)));
    }
    for (pos, value) in indices(matches, "symbols").into_iter().zip(&cli.symbols) {
        items.push((pos, RangeItem::Symbols(value.clone())));
    }
    items.sort_by_key(|(pos, _)| *pos);

    let per_font = assign_ranges(&indices(matches, "fonts"), items)?;
    let fonts = cli
        .fonts
        .iter()
        .zip(per_font)
        .map(|(path, ranges)| FontSource::load(path, ranges))
        .collect::<Result<Vec<_>, _>>()?;

    let subpixels = if cli.lcd {
        SubpixelMode::Horizontal
    } else if cli.lcd_v {
        SubpixelMode::Vertical
    } else {
        SubpixelMode::None
    };

    Ok(ConvertArgs {
        fonts,
        output: cli.output,
        format: cli.format,
        options: BuildOptions {
            size: cli.size,
            bpp: cli.bpp,
            no_compress: cli.no_compress,
            no_prefilter: cli.no_prefilter,
            no_kerning: cli.no_kerning,
            fast_kerning: cli.fast_kerning,
            subpixels,
            full_info: cli.full_info,
            lv_include: cli.lv_include,
        },
        command_line: env::args().skip(1).collect::<Vec<_>>().join(" "),
    })
}

fn run(cli: Cli, matches: &ArgMatches) -> Result<(), FontError> {
    let args = build_args(cli, matches)?;
    let files = fontconv::convert(&args)?;
    write_files(&files)?;

    let total: usize = files.values().map(Vec::len).sum();
    eprintln!(
        "✓ Written {} file(s), {} bytes, to {}",
        files.len(),
        total,
        args.output.display()
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if let Err(e) = run(cli, &matches) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}
