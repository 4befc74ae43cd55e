use std::{env, fs, path::PathBuf};

fn render_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--pretty "Pretty-print JSON output"))
        .arg(
            clap::Arg::new("no_figures")
                .long("no-figures")
                .help("Omit figures from JSON output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(clap::arg!(--frontmatter "Include TOML frontmatter (Markdown only)"))
        .arg(
            clap::Arg::new("base_url")
                .long("base-url")
                .value_name("URL")
                .help("Base URL for resolving relative links in HTML input"),
        )
        .arg(
            clap::Arg::new("input_format")
                .long("input-format")
                .value_name("FORMAT")
                .help("Input format")
                .default_value("auto")
                .value_parser(["auto", "html", "xml"]),
        )
        .arg(clap::arg!(-F --force "Overwrite existing output"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let convert = clap::Command::new("convert")
        .about("Convert a single article file")
        .arg(clap::arg!(<INPUT> "Article file (.html, .htm, .xml, .nxml) or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (json, markdown)")
                .value_name("FORMAT")
                .default_value("json")
                .value_parser(["json", "markdown", "md"]),
        );

    let batch = clap::Command::new("batch")
        .about("Convert every article under a directory (recursive)")
        .arg(
            clap::arg!(<DIR> "Directory searched for .html, .htm, .xml and .nxml files")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-o --output <DIR> "Output directory")
                .required(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (json, markdown)")
                .value_name("FORMAT")
                .default_value("markdown")
                .value_parser(["json", "markdown", "md"]),
        );

    let mut cmd = clap::Command::new("prism")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Prism Contributors")
        .about("Convert journal HTML and JATS XML articles to JSON or Markdown")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .arg(clap::arg!(-q --quiet "Only report errors").global(true))
        .subcommand(render_args(convert))
        .subcommand(render_args(batch));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "prism", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "prism", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "prism", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "prism", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
