use clap::Parser;
use image_to_excel::{cli, config, engine, error, excel, progress};

use cli::{Cli, Commands};
use config::RunConfig;
use engine::{Processor, RunSummary};
use error::Result;
use excel::XlsxDocument;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    success: bool,
    message: String,
    processed: usize,
    missing_codes: Vec<String>,
    failed_codes: Vec<String>,
    output_path: String,
}

impl RunReport {
    fn from_summary(summary: &RunSummary) -> Self {
        Self {
            success: true,
            message: format!(
                "{}件挿入, {}件画像なし",
                summary.processed,
                summary.missing.len()
            ),
            processed: summary.processed,
            missing_codes: summary.missing.clone(),
            failed_codes: summary.failed.clone(),
            output_path: summary.output_path.display().to_string(),
        }
    }

    fn from_error(e: &error::ImportError) -> Self {
        Self {
            success: false,
            message: e.to_string(),
            processed: 0,
            missing_codes: Vec::new(),
            failed_codes: Vec::new(),
            output_path: String::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run {
            excel,
            image_dir,
            code_col,
            image_col,
            sheet,
            workers,
            row_height,
            col_width,
            json,
        } => {
            let config = RunConfig {
                excel_path: excel,
                image_dir,
                code_col,
                image_col,
                sheet_name: sheet,
                worker_count: workers,
                row_height,
                col_width,
            };

            let mut processor = Processor::new(config);
            let (progress_tx, mut progress_rx) = progress::channel();
            processor.set_progress(progress_tx);

            // Ctrl-Cでキャンセル
            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                }
            });

            let bar_task = if json {
                None
            } else {
                println!("📊 image-to-excel - 画像一括挿入\n");
                let bar = ProgressBar::new(100);
                Some(tokio::spawn(async move {
                    while progress_rx.changed().await.is_ok() {
                        let fraction = *progress_rx.borrow();
                        bar.set_position((fraction * 100.0).round() as u64);
                    }
                    bar.finish_and_clear();
                }))
            };

            let outcome = processor.run(cancel).await;
            if let Some(task) = bar_task {
                task.abort();
            }

            match outcome {
                Ok(summary) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&RunReport::from_summary(&summary))?);
                    } else {
                        println!("\n✅ 完了: {}件挿入, {}件画像なし", summary.processed, summary.missing.len());
                        if !summary.failed.is_empty() {
                            println!("⚠ 失敗: {}件 ({})", summary.failed.len(), summary.failed.join(", "));
                        }
                        if !summary.missing.is_empty() {
                            println!("画像なし: {}", summary.missing.join(", "));
                        }
                        println!("出力: {}", summary.output_path.display());
                    }
                }
                Err(e) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&RunReport::from_error(&e))?);
                    }
                    return Err(e);
                }
            }
        }

        Commands::Sheets { excel } => {
            let doc = XlsxDocument::open(&excel)?;
            for name in doc.sheet_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
