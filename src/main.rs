//! jsonlens - Paged JSON Lines Engine
//!
//! Command-line driver: reads one page, one line or one search result set from
//! a `.jsonl` file and prints it as JSON.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use jsonlens::{EngineConfig, FileSession, SearchQuery};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("jsonlens")
        .version(jsonlens::VERSION)
        .about("Page through and search large JSON Lines files")
        .long_about(
            "jsonlens indexes a JSON Lines file in the background and serves it one \
             page at a time, so files far larger than memory open instantly.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the .jsonl file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .short('p')
                .help("1-based page number to print")
                .value_parser(value_parser!(u64))
                .default_value("1"),
        )
        .arg(
            Arg::new("page-size")
                .long("page-size")
                .help("Lines per page (0 = configured default)")
                .value_parser(value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("line")
                .long("line")
                .short('l')
                .help("Print a single record by 1-based line number")
                .value_parser(value_parser!(u64))
                .conflicts_with("search"),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .short('s')
                .help("Text or pattern to search for"),
        )
        .arg(
            Arg::new("regex")
                .long("regex")
                .help("Treat the search text as a regular expression")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("case-sensitive")
                .long("case-sensitive")
                .help("Match case exactly")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("errors-only")
                .long("errors-only")
                .help("Also match lines that are not valid JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-results")
                .long("max-results")
                .help("Maximum number of search hits (0 = configured default)")
                .value_parser(value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("stride")
                .long("stride")
                .help("Lines between index checkpoints")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("wait-index")
                .long("wait-index")
                .help("Finish indexing before reading so totals are exact")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(feature = "config")]
fn base_config() -> Result<EngineConfig> {
    Ok(EngineConfig::load_default()?)
}

#[cfg(not(feature = "config"))]
fn base_config() -> Result<EngineConfig> {
    Ok(EngineConfig::default())
}

fn search_query(matches: &ArgMatches) -> Option<SearchQuery> {
    let errors_only = matches.get_flag("errors-only");
    let text = matches.get_one::<String>("search").cloned().unwrap_or_default();
    if text.is_empty() && !errors_only {
        return None;
    }
    Some(SearchQuery {
        text,
        case_sensitive: matches.get_flag("case-sensitive"),
        use_regex: matches.get_flag("regex"),
        max_results: matches.get_one::<u32>("max-results").copied().unwrap_or(0),
        errors_only,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let Some(file_path) = matches.get_one::<PathBuf>("file") else {
        anyhow::bail!("missing file argument");
    };

    let mut config = base_config()?;
    if let Some(stride) = matches.get_one::<u64>("stride") {
        config.stride_lines = *stride;
    }

    let session = FileSession::open(file_path, config)
        .with_context(|| format!("cannot open {}", file_path.display()))?;

    if matches.get_flag("wait-index") {
        if let Some(last) = session.index_to_completion().await? {
            log::info!("indexed {} lines", last.scanned_lines);
        }
    } else {
        // Progress is not reported by the CLI; the job keeps running regardless
        drop(session.start_indexing());
    }

    let output = if let Some(line) = matches.get_one::<u64>("line") {
        match session.read_line(*line).await? {
            Some(record) => serde_json::to_string_pretty(&record)?,
            None => anyhow::bail!("line {} is past the end of the file", line),
        }
    } else if let Some(query) = search_query(&matches) {
        let result = session.search_to_completion(query).await?;
        serde_json::to_string_pretty(&result)?
    } else {
        let page = matches.get_one::<u64>("page").copied().unwrap_or(1);
        let page_size = matches.get_one::<u64>("page-size").copied().unwrap_or(0);
        serde_json::to_string_pretty(&session.read_page(page, page_size).await?)?
    };
    println!("{}", output);

    session.close().await;
    Ok(())
}
