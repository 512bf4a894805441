//! Vietnamese OCR server and CLI
//!
//! A cross-platform binary for OCR processing via CLI or HTTP server.
//!
//! # Usage
//!
//! ## CLI Mode
//! ```bash
//! viet-ocr-server ocr document.pdf --det-model models/det.onnx --rec-model models/rec.onnx --dict models/dict.txt
//! viet-ocr-server ocr scan.jpg --format json --det-model models/det.onnx --rec-model models/rec.onnx --dict models/dict.txt
//! ```
//!
//! ## Server Mode
//! ```bash
//! viet-ocr-server serve --det-model models/det.onnx --rec-model models/rec.onnx --dict models/dict.txt --port 8000
//! ```

mod cli;
mod config;
mod ocr;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "viet-ocr-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vietnamese OCR processing via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single image or PDF via CLI
    Ocr {
        /// Image or PDF file to process
        file: PathBuf,

        /// Path to the text detection model
        #[arg(long = "det-model", env = "VIET_OCR_DET_MODEL")]
        det_model: PathBuf,

        /// Path to the text recognition model
        #[arg(long = "rec-model", env = "VIET_OCR_REC_MODEL")]
        rec_model: PathBuf,

        /// Path to the character dictionary
        #[arg(long = "dict", env = "VIET_OCR_DICT")]
        dict_path: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Device to use (cpu, cuda, cuda:0, etc.)
        #[arg(long, default_value = "cpu", env = "VIET_OCR_DEVICE")]
        device: String,
    },
    /// Start the HTTP server
    Serve {
        /// Path to the text detection model
        #[arg(long = "det-model", env = "VIET_OCR_DET_MODEL")]
        det_model: PathBuf,

        /// Path to the text recognition model
        #[arg(long = "rec-model", env = "VIET_OCR_REC_MODEL")]
        rec_model: PathBuf,

        /// Path to the character dictionary
        #[arg(long = "dict", env = "VIET_OCR_DICT")]
        dict_path: PathBuf,

        /// Port to listen on
        #[arg(long, short, default_value = "8000", env = "VIET_OCR_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "VIET_OCR_HOST")]
        host: String,

        /// Device to use (cpu, cuda, cuda:0, etc.)
        #[arg(long, default_value = "cpu", env = "VIET_OCR_DEVICE")]
        device: String,

        /// Number of intra-op threads per ONNX session
        #[arg(long = "intra-threads", env = "VIET_OCR_INTRA_THREADS")]
        intra_threads: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    viet_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ocr {
            file,
            det_model,
            rec_model,
            dict_path,
            format,
            device,
        } => {
            let config = config::OcrConfig {
                det_model,
                rec_model,
                dict_path,
                device,
                intra_threads: None,
            };

            info!("Processing file: {}", file.display());
            cli::process_file(&file, &config, &format)?;
        }
        Commands::Serve {
            det_model,
            rec_model,
            dict_path,
            port,
            host,
            device,
            intra_threads,
        } => {
            let config = config::ServerConfig {
                ocr: config::OcrConfig {
                    det_model,
                    rec_model,
                    dict_path,
                    device,
                    intra_threads,
                },
                host,
                port,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
    }

    Ok(())
}
