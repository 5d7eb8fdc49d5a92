//! # CHTL Command Line Interface
//!
//! A thin CLI wrapper around [`chtl::compile`] (spec.md §6 "CLI surface").
//!
//! ## Design Philosophy
//!
//! This binary follows a strict separation of concerns: argument parsing,
//! file I/O, and watch-mode polling live here; everything about *what* the
//! source means lives in the library's pure `compile()` function. The CLI
//! never touches the lexer, parser, or generator directly — it only ever
//! assembles a `CompileOptions` and a [`chtl::fs_loader::FsLoader`] and
//! hands them to the library.
//!
//! ## Commands
//!
//! - `compile` — translate a `.chtl` file to HTML/CSS/JS (the default
//!   command when none is given).
//! - `validate` — run the same pipeline but only report diagnostics; no
//!   files are written.
//! - `format` — reformat a `.chtl` file in canonical style (spec.md §1).
//! - `version` — print the crate version.
//!
//! ## Exit Codes
//!
//! `0` success, `1` compile error (a diagnostic with `Severity::Error`
//! survived), `2` usage error (bad flags, missing file).

use chtl::compile::{compile, CompileOptions};
use chtl::diagnostics::Severity;
use chtl::format::{format_source, FormatOptions};
use chtl::fs_loader::FsLoader;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Parser, Debug)]
#[command(name = "chtl", version, about = "Compiles CHTL sources to HTML/CSS/JS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input `.chtl` file. Required for `compile`/`validate`.
    path: Option<PathBuf>,

    /// Emit a single HTML document with CSS and JS inlined.
    #[arg(long)]
    inline: bool,

    /// Inline CSS into a `<style>` tag; JS stays a sibling file.
    #[arg(long = "inline-css")]
    inline_css: bool,

    /// Inline JS into a `<script>` tag; CSS stays a sibling file.
    #[arg(long = "inline-js")]
    inline_js: bool,

    /// Wrap output in a `<!DOCTYPE html><html>...</html>` skeleton with
    /// linked CSS/JS when not inline.
    #[arg(long = "default-struct")]
    default_struct: bool,

    /// Base name for sibling `.css`/`.js` output files.
    #[arg(long = "output", short = 'o')]
    output: Option<PathBuf>,

    /// Print diagnostics and a compile summary to stderr.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Include source-position comments in generated HTML.
    #[arg(long)]
    debug: bool,

    /// Re-compile whenever the input file changes.
    #[arg(long, short = 'w')]
    watch: bool,

    /// Overwrite the input file with formatted output (only meaningful for
    /// `chtl format`).
    #[arg(long = "in-place", short = 'i')]
    in_place: bool,

    /// Indent width used by `chtl format`.
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// Glob of paths to additionally watch/compile.
    #[arg(long)]
    include: Vec<String>,

    /// Glob of paths to exclude from `--include`.
    #[arg(long)]
    exclude: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a `.chtl` file (default).
    Compile,
    /// Parse and report diagnostics without writing output.
    Validate,
    /// Reformat a `.chtl` file in canonical style.
    Format,
    /// Print the crate version.
    Version,
}

fn main() {
    let cli = Cli::parse();
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);

    match cli.command.unwrap_or(Command::Compile) {
        Command::Version => {
            println!("chtl {}", env!("CARGO_PKG_VERSION"));
            std::process::exit(0);
        }
        Command::Format => run_format(&cli, &mut stderr),
        Command::Validate => run_once(&cli, &mut stderr, true),
        Command::Compile => {
            if cli.watch {
                run_watch(&cli, &mut stderr);
            } else {
                run_once(&cli, &mut stderr, false);
            }
        }
    }
}

fn run_watch(cli: &Cli, stderr: &mut StandardStream) {
    let Some(path) = &cli.path else {
        write_error(stderr, "a path is required for --watch");
        std::process::exit(2);
    };
    let mut last_modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    loop {
        run_once(cli, stderr, false);
        loop {
            std::thread::sleep(Duration::from_millis(300));
            let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
            if modified != last_modified {
                last_modified = modified;
                break;
            }
        }
    }
}

fn run_format(cli: &Cli, stderr: &mut StandardStream) {
    let Some(path) = &cli.path else {
        write_error(stderr, "a path to a .chtl file is required");
        std::process::exit(2);
    };
    if !path.exists() {
        write_error(stderr, &format!("input file '{}' does not exist", path.display()));
        std::process::exit(2);
    }
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            write_error(stderr, &format!("failed to read '{}': {}", path.display(), e));
            std::process::exit(2);
        }
    };

    let filename = path.display().to_string();
    let result = format_source(&source, &FormatOptions { indent: cli.indent });
    for diagnostic in result.diagnostics.iter() {
        print_diagnostic(stderr, &filename, diagnostic);
    }
    if result.diagnostics.iter().any(|d| d.severity == Severity::Error) {
        std::process::exit(1);
    }

    if cli.in_place {
        if let Err(e) = fs::write(path, &result.source) {
            write_error(stderr, &format!("failed to write '{}': {}", path.display(), e));
            std::process::exit(2);
        }
    } else {
        print!("{}", result.source);
    }
    std::process::exit(0);
}

fn run_once(cli: &Cli, stderr: &mut StandardStream, validate_only: bool) {
    let Some(path) = &cli.path else {
        write_error(stderr, "a path to a .chtl file is required");
        std::process::exit(2);
    };

    if !path.exists() {
        write_error(stderr, &format!("input file '{}' does not exist", path.display()));
        std::process::exit(2);
    }

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            write_error(stderr, &format!("failed to read '{}': {}", path.display(), e));
            std::process::exit(2);
        }
    };

    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut loader = FsLoader::new(root);

    let output_name = cli
        .output
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string())
        });

    let options = CompileOptions {
        entry_path: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        inline_output: cli.inline,
        inline_css: cli.inline_css,
        inline_js: cli.inline_js,
        default_struct: cli.default_struct,
        debug: cli.debug,
        output_name,
        ..CompileOptions::default()
    };

    let filename = path.display().to_string();
    let result = compile(&source, options, &mut loader);

    for diagnostic in result.diagnostics.iter() {
        print_diagnostic(stderr, &filename, diagnostic);
    }

    let has_errors = result.diagnostics.iter().any(|d| d.severity == Severity::Error);

    if validate_only {
        std::process::exit(if has_errors { 1 } else { 0 });
    }

    if has_errors {
        std::process::exit(1);
    }

    if let Err(e) = write_outputs(cli, path, &result.assembled) {
        write_error(stderr, &format!("failed to write output: {}", e));
        std::process::exit(2);
    }

    if cli.verbose {
        let _ = writeln!(stderr, "compiled '{}' ({} diagnostics)", filename, result.diagnostics.len());
    }

    std::process::exit(0);
}

fn write_outputs(cli: &Cli, input: &Path, assembled: &chtl::assemble::AssembledOutput) -> std::io::Result<()> {
    let base = cli.output.clone().unwrap_or_else(|| input.with_extension(""));
    let html_path = base.with_extension("html");
    fs::write(&html_path, &assembled.html)?;

    if let Some(css) = &assembled.css {
        fs::write(base.with_extension("css"), css)?;
    }
    if let Some(js) = &assembled.js {
        fs::write(base.with_extension("js"), js)?;
    }
    Ok(())
}

fn print_diagnostic(stderr: &mut StandardStream, filename: &str, diagnostic: &chtl::diagnostics::Diagnostic) {
    let color = match diagnostic.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stderr, "{}", diagnostic.display_for(filename));
    let _ = stderr.reset();
}

fn write_error(stderr: &mut StandardStream, message: &str) {
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = writeln!(stderr, "error: {}", message);
    let _ = stderr.reset();
}
