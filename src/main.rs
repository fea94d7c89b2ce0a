// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for lms2doc.
//!
//! This binary provides the `lms2doc` command for converting LM Studio
//! conversation exports from JSON to text, Markdown, HTML, or PDF.

use lms2doc::export;
use lms2doc::parser::{self, Conversation};
use lms2doc::renderer::{Format, RenderOptions, UnknownFormatError};
use lexopt::prelude::*;
use snafu::{ensure, prelude::*};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where to write the converted output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each file to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    format: Format,
    include_metadata: bool,
    include_timestamps: bool,
    include_system_prompts: bool,
    include_stats: bool,
    preview: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple files to stdout"))]
    MultipleFilesToStdout,

    #[snafu(display("{} is not a JSON file", path.display()))]
    NotJsonFile { path: PathBuf },

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to convert {}: {source}", path.display()))]
    Convert {
        path: PathBuf,
        source: export::ExportError,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write to stdout: {source}"))]
    WriteStdout { source: std::io::Error },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert LM Studio conversation exports to text, Markdown, HTML, or PDF

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Input JSON files or directories containing exports

Options:
  -o, --output <OUTPUT>       Output directory (or - for stdout)
  -F, --format <FORMAT>       Output format: txt, md, html, pdf (default: txt)
  -p, --preview               Print a truncated preview instead of writing files

Content display (use --show-* or --hide-*):
      --show-metadata         Include the metadata header (default: on)
      --hide-metadata         Hide the metadata header
      --show-timestamps       Include the created-at line (default: on)
      --hide-timestamps       Hide the created-at line
      --show-system-prompt    Include the system prompt block (default: on)
      --hide-system-prompt    Hide the system prompt block
      --show-stats            Include generation statistics (default: on)
      --hide-stats            Hide generation statistics

Other options:
  -q, --quiet                 Suppress progress messages
  -n, --dry-run               Show what would be processed without writing
  -f, --force                 Overwrite existing output files
  -h, --help                  Print help
  -V, --version               Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut format = Format::Text;
    // Defaults: everything shown
    let mut include_metadata = true;
    let mut include_timestamps = true;
    let mut include_system_prompts = true;
    let mut include_stats = true;
    let mut preview = false;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Short('F') | Long("format") => {
                let val: String = parser.value()?.parse()?;
                format = val
                    .parse()
                    .map_err(|e: UnknownFormatError| e.to_string())?;
            }
            // Show/hide flags - last one wins
            Long("show-metadata") => include_metadata = true,
            Long("hide-metadata") => include_metadata = false,
            Long("show-timestamps") => include_timestamps = true,
            Long("hide-timestamps") => include_timestamps = false,
            Long("show-system-prompt" | "show-system-prompts") => include_system_prompts = true,
            Long("hide-system-prompt" | "hide-system-prompts") => include_system_prompts = false,
            Long("show-stats") => include_stats = true,
            Long("hide-stats") => include_stats = false,
            Short('p') | Long("preview") => preview = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        format,
        include_metadata,
        include_timestamps,
        include_system_prompts,
        include_stats,
        preview,
        quiet,
        dry_run,
        force,
    })
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input)?;

    if cli.preview {
        for file in &files {
            preview_file(file, &cli)?;
        }
        return Ok(());
    }

    match &cli.output {
        OutputTarget::Stdout => {
            // Without a directory, we can only output one file to stdout
            ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
            process_to_stdout(&files[0], &cli)?;
        }
        OutputTarget::Directory(dir) => {
            if !cli.dry_run {
                std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
            }
            for file in &files {
                process_file(file, dir, &cli)?;
            }
        }
    }

    Ok(())
}

/// Collects all JSON files from the given inputs (files and directories).
///
/// Explicit file arguments must carry a `.json` extension; directory
/// contents are filtered to it.
fn collect_input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            ensure!(
                input.extension().is_some_and(|ext| ext == "json"),
                NotJsonFileSnafu { path: input }
            );
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Creates render options from CLI arguments.
#[allow(clippy::missing_const_for_fn)]
fn make_render_options(cli: &Cli) -> RenderOptions {
    RenderOptions {
        include_metadata: cli.include_metadata,
        include_timestamps: cli.include_timestamps,
        include_system_prompts: cli.include_system_prompts,
        include_stats: cli.include_stats,
    }
}

/// Loads and parses one conversation file.
fn load_conversation(path: &Path) -> Result<Conversation, Error> {
    let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parser::parse_conversation(&json).context(ParseFileSnafu { path })
}

/// Prints a truncated preview of a single file to stdout.
fn preview_file(input: &Path, cli: &Cli) -> Result<(), Error> {
    let conversation = load_conversation(input)?;
    let opts = make_render_options(cli);

    let preview = export::preview(Some(&conversation), &opts, cli.format)
        .context(ConvertSnafu { path: input })?;
    println!("{preview}");
    Ok(())
}

/// Converts a single file and writes the artifact to stdout.
fn process_to_stdout(input: &Path, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let conversation = load_conversation(input)?;
    let opts = make_render_options(cli);
    let artifact = export::export_downloadable(Some(&conversation), &opts, cli.format)
        .context(ConvertSnafu { path: input })?;

    std::io::stdout()
        .write_all(&artifact.bytes)
        .context(WriteStdoutSnafu)?;
    Ok(())
}

/// Converts a single file and writes the artifact to the output directory.
///
/// The output filename comes from the conversation name, not the input
/// filename.
fn process_file(input: &Path, out_dir: &Path, cli: &Cli) -> Result<(), Error> {
    let conversation = load_conversation(input)?;
    let opts = make_render_options(cli);
    let artifact = export::export_downloadable(Some(&conversation), &opts, cli.format)
        .context(ConvertSnafu { path: input })?;

    let out_path = out_dir.join(&artifact.filename);

    // Handle dry-run mode
    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    std::fs::write(&out_path, &artifact.bytes).context(WriteFileSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}
