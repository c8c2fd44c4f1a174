//! CLI Application logic

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use letter::{GeneratedLetter, LetterConfig, LetterGenerator, LetterRequest, Party};

#[derive(Debug, Parser)]
#[command(name = "tw-lal")]
#[command(
    version,
    about = "台灣郵局存證信函產生器 (Taiwan registered letter generator)",
    long_about = None
)]
pub struct Cli {
    /// Plain-text file holding the full letter body (存證信函全文)
    #[arg(required_unless_present = "request")]
    pub article_file: Option<PathBuf>,

    /// JSON request with from/to/copy/text instead of an article file
    #[arg(long, conflicts_with = "article_file")]
    pub request: Option<PathBuf>,

    /// Sender name (寄件人姓名); repeatable
    #[arg(long = "sender-name", num_args = 1.., conflicts_with = "request")]
    pub sender_names: Vec<String>,

    /// Sender address (寄件人詳細地址)
    #[arg(long = "sender-addr", conflicts_with = "request")]
    pub sender_addrs: Vec<String>,

    /// Receiver name (收件人姓名); repeatable
    #[arg(long = "receiver-name", num_args = 1.., conflicts_with = "request")]
    pub receiver_names: Vec<String>,

    /// Receiver address (收件人詳細地址)
    #[arg(long = "receiver-addr", conflicts_with = "request")]
    pub receiver_addrs: Vec<String>,

    /// Cc name (副本收件人姓名); repeatable
    #[arg(long = "cc-name", num_args = 1.., conflicts_with = "request")]
    pub cc_names: Vec<String>,

    /// Cc address (副本收件人詳細地址)
    #[arg(long = "cc-addr", conflicts_with = "request")]
    pub cc_addrs: Vec<String>,

    /// Configuration file (grid geometry, template and font paths)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Blank letter form PDF; overrides the configuration
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// TrueType font; overrides the configuration
    #[arg(short, long)]
    pub font: Option<PathBuf>,

    /// Output PDF file
    #[arg(short, long, default_value = "letter.pdf")]
    pub output: PathBuf,

    /// Log per-page details
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse arguments, generate the letter and report the result
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let generated = execute(&cli)?;
    println!(
        "Finished: {} ({} pages)",
        cli.output.display(),
        generated.page_count
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Generate the letter described by the arguments and write it out
pub fn execute(cli: &Cli) -> Result<GeneratedLetter> {
    let config = load_config(cli)?;
    let request = build_request(cli)?;
    let letter = request
        .into_letter()
        .context("Cannot generate a letter without body text")?;

    let generator = LetterGenerator::new(config).context("Failed to load template or font")?;
    generator
        .generate_to_file(&letter, &cli.output)
        .with_context(|| format!("Failed to generate {}", cli.output.display()))
}

fn load_config(cli: &Cli) -> Result<LetterConfig> {
    let mut config = match &cli.config {
        Some(path) => LetterConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LetterConfig::default(),
    };

    if let Some(template) = &cli.template {
        config.template = template.clone();
    }
    if let Some(font) = &cli.font {
        config.font = Some(font.clone());
    }
    config.validate()?;

    Ok(config)
}

fn build_request(cli: &Cli) -> Result<LetterRequest> {
    if let Some(path) = &cli.request {
        return LetterRequest::from_file(path)
            .with_context(|| format!("Failed to read request {}", path.display()));
    }

    let article = cli
        .article_file
        .as_ref()
        .context("An article file or --request is required")?;
    let text = std::fs::read_to_string(article)
        .with_context(|| format!("Failed to read article {}", article.display()))?;

    Ok(LetterRequest {
        from: pair_up(&cli.sender_names, &cli.sender_addrs),
        to: pair_up(&cli.receiver_names, &cli.receiver_addrs),
        copy: pair_up(&cli.cc_names, &cli.cc_addrs),
        text,
    })
}

/// Pair names with addresses by position; the shorter list is padded
/// with empty strings
fn pair_up(names: &[String], addrs: &[String]) -> Vec<Party> {
    let count = names.len().max(addrs.len());
    (0..count)
        .map(|i| {
            Party::new(
                names.get(i).cloned().unwrap_or_default(),
                addrs.get(i).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_original_style_arguments() {
        let cli = Cli::try_parse_from([
            "tw-lal",
            "article.txt",
            "--sender-name",
            "王小明",
            "李小華",
            "--sender-addr",
            "台北市",
            "--receiver-name",
            "陳大文",
            "-o",
            "out.pdf",
        ])
        .unwrap();

        assert_eq!(cli.article_file, Some(PathBuf::from("article.txt")));
        assert_eq!(cli.sender_names, vec!["王小明", "李小華"]);
        assert_eq!(cli.sender_addrs, vec!["台北市"]);
        assert_eq!(cli.receiver_names, vec!["陳大文"]);
        assert!(cli.cc_names.is_empty());
        assert_eq!(cli.output, PathBuf::from("out.pdf"));
    }

    #[test]
    fn test_repeated_name_flags_accumulate() {
        let cli = Cli::try_parse_from(["tw-lal", "article.txt", "--cc-name", "A", "--cc-name", "B"])
            .unwrap();
        assert_eq!(cli.cc_names, vec!["A", "B"]);
    }

    #[test]
    fn test_article_or_request_required() {
        assert!(Cli::try_parse_from(["tw-lal"]).is_err());
        assert!(Cli::try_parse_from(["tw-lal", "--request", "req.json"]).is_ok());
        assert!(Cli::try_parse_from(["tw-lal", "a.txt", "--request", "req.json"]).is_err());
    }

    #[test]
    fn test_default_output() {
        let cli = Cli::try_parse_from(["tw-lal", "article.txt"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("letter.pdf"));
    }

    #[test]
    fn test_pair_up() {
        let names = vec!["A".to_string(), "B".to_string()];
        let addrs = vec!["addr".to_string()];

        assert_eq!(
            pair_up(&names, &addrs),
            vec![Party::new("A", "addr"), Party::new("B", "")]
        );
        assert!(pair_up(&[], &[]).is_empty());
        assert_eq!(
            pair_up(&[], &addrs),
            vec![Party::new("", "addr")]
        );
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "tw-lal",
            "article.txt",
            "--template",
            "form.pdf",
            "--font",
            "kai.ttf",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.template, PathBuf::from("form.pdf"));
        assert_eq!(config.font, Some(PathBuf::from("kai.ttf")));
    }
}
