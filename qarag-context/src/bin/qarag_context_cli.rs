use clap::Parser;
use qarag_context::text::{
    ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, WordWindowChunker,
};
use std::fs;
use std::io::{self, Read};
use std::process;

/// Preview how a document would be chunked before it is ingested.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Document name recorded on each chunk.
    #[arg(short, long, default_value = "stdin")]
    name: String,

    /// Words per chunk.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    size: usize,

    /// Words shared by consecutive chunks.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let (name, content) = if let Some(input_path) = args.input {
        let content = fs::read_to_string(&input_path)?;
        (input_path, content)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        (args.name, buffer)
    };

    let chunker = match WordWindowChunker::new(ChunkConfig::new(args.size, args.overlap)) {
        Ok(chunker) => chunker,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let chunks = chunker.chunk_document(&name, &content);
    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{json_output}");

    Ok(())
}
