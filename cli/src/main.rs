use anyhow::Result;
use clap::{Parser, Subcommand};
use keyword_core::corpus::{load_documents, load_stopwords};
use keyword_core::persist::{self, IndexPaths, DEFAULT_INDEX_DIR};
use keyword_core::{search, DocId, InvertedIndex, Normalizer, SearchError, Stopwords, DEFAULT_SEARCH_LIMIT};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "keyword-search")]
#[command(about = "Keyword search over the movie dataset", long_about = None)]
struct Cli {
    /// Index snapshot directory
    #[arg(long, global = true, default_value = DEFAULT_INDEX_DIR)]
    index: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index from the movie dataset and save it
    Build {
        /// Movie dataset (JSON array or {"movies": [...]})
        #[arg(long, default_value = "data/movies.json")]
        movies: String,
        /// Stopword list, one word per line; the built-in English list is used if absent
        #[arg(long, default_value = "data/stopwords.txt")]
        stopwords: String,
    },
    /// Search movies by keyword
    Search {
        query: String,
        /// Maximum number of results, at least 1
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT as u64, value_parser = clap::value_parser!(u64).range(1..))]
        limit: u64,
    },
    /// Print how often a single term occurs in a movie
    Tf {
        id: DocId,
        term: String,
    },
}

fn main() -> Result<ExitCode> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.index);

    let outcome = match cli.command {
        Commands::Build { movies, stopwords } => build_index(&paths, &movies, &stopwords),
        Commands::Search { query, limit } => run_search(&paths, &query, usize::try_from(limit).unwrap_or(usize::MAX)),
        Commands::Tf { id, term } => run_tf(&paths, id, &term),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err @ SearchError::IndexNotFound { .. }) => {
            eprintln!("{err}. Run `keyword-search build` first.");
            Ok(ExitCode::FAILURE)
        }
        Err(err @ SearchError::InvalidQuery { .. }) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

fn build_index(paths: &IndexPaths, movies: &str, stopwords: &str) -> keyword_core::Result<()> {
    let stopwords = if Path::new(stopwords).is_file() {
        load_stopwords(stopwords)?
    } else {
        tracing::warn!(stopwords, "stopword file not found, using built-in list");
        Stopwords::english()
    };
    let documents = load_documents(movies)?;
    let index = InvertedIndex::build(Normalizer::new(stopwords), documents)?;
    persist::save(paths, &index)?;
    println!("Indexed {} movies ({} terms) into {}", index.num_docs(), index.num_terms(), paths.root.display());
    Ok(())
}

fn run_search(paths: &IndexPaths, query: &str, limit: usize) -> keyword_core::Result<()> {
    let index = persist::load(paths)?;
    println!("Searching for: {query}");
    for (rank, movie) in search(&index, query, limit).iter().enumerate() {
        println!("{}. {}", rank + 1, movie.title);
    }
    Ok(())
}

fn run_tf(paths: &IndexPaths, id: DocId, term: &str) -> keyword_core::Result<()> {
    let index = persist::load(paths)?;
    let tf = index.term_frequency(id, term)?;
    println!("Term frequency of '{term}' in document {id}: {tf}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_limit_defaults_to_five() {
        let cli = Cli::try_parse_from(["keyword-search", "search", "cars"]).unwrap();
        match cli.command {
            Commands::Search { limit, .. } => assert_eq!(limit, DEFAULT_SEARCH_LIMIT as u64),
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn zero_search_limit_is_rejected() {
        assert!(Cli::try_parse_from(["keyword-search", "search", "cars", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["keyword-search", "search", "cars", "--limit", "1"]).is_ok());
    }
}
