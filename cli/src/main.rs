use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use infobuf_compiler::error::InfoError;
use infobuf_compiler::{compile_source, decode_buffer, schema_json};

#[derive(Parser)]
#[command(name = "infobuf")]
#[command(about = "Compile infobuf IDL sources and inspect encoded payloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `.info` source (schema plus root value) to a binary payload
    Build {
        /// Input `.info` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to the input name with a `.bin` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a `.info` schema and print it as JSON
    Schema {
        /// Input `.info` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Decode a binary payload against its schema and print it as JSON
    Decode {
        /// `.info` schema source
        #[arg(short, long)]
        schema: PathBuf,

        /// Encoded payload
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), InfoError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { input, output } => {
            let text = fs::read_to_string(input)?;
            let (_schema, bin) = compile_source(&text)?;
            if bin.is_empty() {
                println!("{} declares types only; nothing to write", input.display());
                return Ok(());
            }
            let out_path = match output {
                Some(path) => path.clone(),
                None => {
                    let mut path = input.clone();
                    path.set_extension("bin");
                    path
                }
            };
            fs::write(&out_path, &bin)?;
            println!(
                "Compiled {} -> {} ({} bytes)",
                input.display(),
                out_path.display(),
                bin.len()
            );
            Ok(())
        }

        Commands::Schema { input } => {
            let text = fs::read_to_string(input)?;
            let (schema, _bin) = compile_source(&text)?;
            let json = schema_json(&schema);
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            Ok(())
        }

        Commands::Decode { schema, input } => {
            let text = fs::read_to_string(schema)?;
            let (schema, _bin) = compile_source(&text)?;
            let data = fs::read(input)?;
            let json = decode_buffer(&schema, &data)?;
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            Ok(())
        }
    }
}
