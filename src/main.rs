use askdocs::{
    DataDir,
    Error,
    IngestOptions,
    IngestOutcome,
    ModelManager,
    Pipeline,
    Result,
    VectorDb,
    chat,
    chunking::ChunkingConfig,
    cli::{AskArgs, Cli, Command, IngestArgs, StatusArgs},
    ingestion,
    remote,
    server::{self, QueryResponse},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("ASKDOCS_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Ingest(args) => cmd_ingest(&cli, args)?,
        Command::Ask(args) => match &args.remote {
            Some(url) => cmd_ask_remote(url, args)?,
            None => cmd_ask(&cli, args)?,
        },
        Command::Chat(args) => {
            let mut pipeline = open_pipeline(&cli, args.top_k, args.max_units)?;
            chat::run_chat(
                &mut pipeline,
                std::io::stdin().lock(),
                std::io::stdout(),
            )?;
        }
        Command::Serve(args) => {
            let pipeline = open_pipeline(&cli, args.top_k, args.max_units)?;
            server::run_server(pipeline, args.bind)?;
        }
        Command::Status(args) => cmd_status(&cli, args)?,
    }

    Ok(())
}

fn model_manager(cli: &Cli) -> ModelManager {
    match &cli.model {
        Some(model) => ModelManager::with_model_id(model.clone()),
        None => ModelManager::new(),
    }
}

fn open_pipeline(
    cli: &Cli,
    top_k: usize,
    max_units: usize,
) -> Result<Pipeline<ModelManager>> {
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let db = VectorDb::open_existing(&data_dir.index_db()).map_err(|e| match e {
        Error::NotFound { .. } => Error::Config(format!(
            "no index found in {}; run `askdocs ingest` first",
            data_dir.root().display()
        )),
        other => other,
    })?;
    let collection = db.get_collection(&cli.collection)?;

    Ok(Pipeline::new(model_manager(cli), collection)
        .with_top_k(top_k)
        .with_max_units(max_units))
}

fn cmd_ingest(cli: &Cli, args: &IngestArgs) -> Result<()> {
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let db = VectorDb::open(&data_dir.index_db())?;
    let mut model = model_manager(cli);

    let options = IngestOptions {
        batch_size: args.batch_size,
        chunking: ChunkingConfig {
            max_chars: args.max_chars,
            overlap: args.overlap,
        },
        show_progress: !args.no_progress,
    };

    let outcome = ingestion::ingest(
        &args.docs,
        &mut model,
        &db,
        &cli.collection,
        &options,
    )?;

    match outcome {
        IngestOutcome::EmptyCorpus(report) => {
            eprintln!(
                "No text found in PDFs under {} \
                 ({} files read, {} unreadable).",
                args.docs.display(),
                report.files_read,
                report.files_skipped
            );
        }
        IngestOutcome::Stored(report) => {
            println!(
                "Stored {} chunks from {} files into '{}'.",
                report.chunks_stored, report.files_read, cli.collection
            );
            if report.files_skipped > 0 || report.pages_failed > 0 {
                eprintln!(
                    "Skipped {} unreadable files and {} unreadable pages.",
                    report.files_skipped, report.pages_failed
                );
            }
        }
    }

    Ok(())
}

fn cmd_ask(cli: &Cli, args: &AskArgs) -> Result<()> {
    let mut pipeline = open_pipeline(cli, args.top_k, args.max_units)?;
    let answer = pipeline.answer(&args.question)?;

    if args.json {
        let response = QueryResponse::from(answer);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", answer.text);
    }
    Ok(())
}

fn cmd_ask_remote(url: &str, args: &AskArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    let client = reqwest::Client::new();
    let response =
        runtime.block_on(remote::ask_remote(&client, url, &args.question))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", remote::render(&response));
    }
    Ok(())
}

fn cmd_status(cli: &Cli, args: &StatusArgs) -> Result<()> {
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let index_path = data_dir.index_db();
    let model = model_manager(cli);

    let chunks = if index_path.is_file() {
        let db = VectorDb::open_existing(&index_path)?;
        match db.get_collection(&cli.collection) {
            Ok(collection) => Some(collection.count()?),
            Err(Error::NotFound { .. }) => None,
            Err(e) => return Err(e),
        }
    } else {
        None
    };

    if args.json {
        let status = serde_json::json!({
            "data_dir": data_dir.root(),
            "index": index_path,
            "model": model.model_id(),
            "collection": cli.collection,
            "chunks": chunks,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Index: {}", index_path.display());
        println!("Model: {}", model.model_id());
        match chunks {
            Some(count) => {
                println!("Collection '{}': {count} chunks", cli.collection)
            }
            None => {
                println!("Collection '{}': not ingested", cli.collection)
            }
        }
    }
    Ok(())
}
