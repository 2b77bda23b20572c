//! rstx AST inspection tool
//!
//! Parses an RST file (or stdin) and prints the document tree as a
//! tree rendering, nested JSON, or XML, plus the diagnostics with
//! severity colors.

use clap::{Arg, Command};
use rstx::tools::treeviz::{render_document, RenderOptions, TreeChars};
use rstx::writers::document_to_xml;
use rstx::{default_registry, parse, Severity, Settings};
use std::fs;
use std::io::{self, Read, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("rstx-treeviz")
        .version(env!("CARGO_PKG_VERSION"))
        .about("rstx document tree visualization")
        .arg(
            Arg::new("input")
                .help("Input RST file; stdin when omitted")
                .required(false)
                .index(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Output format: treeviz, json, xml")
                .default_value("treeviz"),
        )
        .arg(
            Arg::new("ascii")
                .long("ascii")
                .help("Use ASCII characters instead of Unicode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-attributes")
                .long("no-attributes")
                .help("Hide node attributes in the tree rendering")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Do not list diagnostics")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let (source_id, content) = match matches.get_one::<String>("input") {
        Some(path) => (path.clone(), fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            ("<stdin>".to_string(), buffer)
        }
    };

    let settings = Settings::default();
    let registry = default_registry();
    let document = parse(&source_id, &content, &settings, &registry)?;

    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("treeviz");
    let output = match format {
        "json" => serde_json::to_string_pretty(&document.to_json())?,
        "xml" => document_to_xml(&document)?,
        "treeviz" => {
            let options = RenderOptions {
                tree_chars: if matches.get_flag("ascii") {
                    TreeChars::ascii()
                } else {
                    TreeChars::default()
                },
                include_attributes: !matches.get_flag("no-attributes"),
                ..RenderOptions::default()
            };
            render_document(&document, &options)
        }
        other => {
            eprintln!("Error: unknown format '{}'", other);
            std::process::exit(1);
        }
    };
    print!("{}", output);
    io::stdout().flush()?;

    if !matches.get_flag("quiet") && !document.diagnostics.is_empty() {
        let choice = if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut stderr = StandardStream::stderr(choice);
        for diagnostic in &document.diagnostics {
            let color = match diagnostic.severity {
                Severity::Info => Color::Cyan,
                Severity::Warning => Color::Yellow,
                Severity::Error | Severity::Severe => Color::Red,
            };
            stderr.set_color(ColorSpec::new().set_fg(Some(color)))?;
            write!(stderr, "{}", diagnostic.severity)?;
            stderr.reset()?;
            writeln!(
                stderr,
                " {}:{} {}",
                diagnostic.source.as_deref().unwrap_or("<input>"),
                diagnostic
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                diagnostic.message
            )?;
        }
    }
    Ok(())
}
