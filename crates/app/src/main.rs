use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_intake_core::{
    build_save_payload, grade, join_pages, normalize_quiz_text, parse_quiz,
    parse_student_answers, quiz_prompt, save_payload, ChatModel, DocType, DocumentPipeline,
    DocumentRecord, ExtractOutcome, HttpBarcodeScanner, HttpChatModel, HttpEmployeeStore,
    HttpOcrEngine, InMemoryEmployeeStore, OcrEngine, QuizOutcome, UploadedDocument, Verdict,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-intake", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// QR/barcode decode service URL
    #[arg(long, env = "DOC_BARCODE_ENDPOINT", default_value = "http://localhost:8601/decode")]
    barcode_endpoint: String,

    /// OCR service URL
    #[arg(long, env = "DOC_OCR_ENDPOINT", default_value = "http://localhost:8602/ocr")]
    ocr_endpoint: String,

    /// Chat completions endpoint (OpenAI-compatible)
    #[arg(
        long,
        env = "DOC_MODEL_ENDPOINT",
        default_value = "https://api.groq.com/openai/v1/chat/completions"
    )]
    model_endpoint: String,

    /// API key for the chat model
    #[arg(long, env = "DOC_MODEL_API_KEY")]
    model_api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "DOC_MODEL_NAME", default_value = "llama-3.3-70b-versatile")]
    model_name: String,

    /// Employee record store URL; without it, saves go to a throwaway
    /// in-memory store
    #[arg(long, env = "DOC_STORE_ENDPOINT")]
    store_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse already-generated quiz text into question records.
    ParseQuiz {
        /// Text file with the model's quiz output.
        #[arg(long)]
        input: PathBuf,
    },
    /// Generate a quiz from course material (PDF) via the chat model.
    GenerateQuiz {
        /// Course material PDF.
        #[arg(long)]
        pdf: PathBuf,
        /// Number of questions to ask for.
        #[arg(long, default_value = "5")]
        questions: usize,
    },
    /// Grade a solved quiz against parsed questions.
    Grade {
        /// Quiz JSON produced by parse-quiz or generate-quiz.
        #[arg(long)]
        quiz: PathBuf,
        /// Text file with the student's answers.
        #[arg(long)]
        answers: PathBuf,
    },
    /// Extract identity fields from one uploaded document.
    Extract {
        /// Image or PDF file.
        #[arg(long)]
        file: PathBuf,
        /// Declared document type: aadhaar, pan, or passport.
        #[arg(long)]
        doc_type: String,
    },
    /// Extract identity fields from every supported file under a folder.
    ExtractFolder {
        #[arg(long)]
        folder: PathBuf,
        /// Declared document type for every file in the folder.
        #[arg(long)]
        doc_type: String,
    },
    /// Build a save payload from extracted records and store it.
    Save {
        /// One or more record JSON files produced by extract.
        #[arg(long, required = true, num_args = 1..)]
        records: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "doc-intake boot"
    );

    let model = HttpChatModel::new(
        &cli.model_endpoint,
        cli.model_api_key.clone(),
        &cli.model_name,
    );

    match cli.command {
        Command::ParseQuiz { input } => {
            let raw = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("reading {}", input.display()))?;
            let quiz = parse_and_report(&raw)?;
            println!("{}", serde_json::to_string_pretty(&quiz)?);
        }
        Command::GenerateQuiz { ref pdf, questions } => {
            let course_text = read_course_text(pdf, &cli).await?;
            let prompt = quiz_prompt(&course_text, questions);
            let raw = model.complete(&prompt).await?;
            let quiz = parse_and_report(&raw)?;
            println!("{}", serde_json::to_string_pretty(&quiz)?);
        }
        Command::Grade { quiz, answers } => {
            let quiz_json = tokio::fs::read_to_string(&quiz)
                .await
                .with_context(|| format!("reading {}", quiz.display()))?;
            let questions: Vec<doc_intake_core::QuizQuestion> =
                serde_json::from_str(&quiz_json).context("quiz file is not valid quiz JSON")?;

            let solved = tokio::fs::read_to_string(&answers)
                .await
                .with_context(|| format!("reading {}", answers.display()))?;
            let student_answers = parse_student_answers(&solved)?;

            let report = grade(&questions, &student_answers);
            for result in &report.results {
                let line = match &result.verdict {
                    Verdict::Correct => format!("correct ({})", result.correct_answer),
                    Verdict::Wrong { given } => {
                        format!("wrong (your: {given}, correct: {})", result.correct_answer)
                    }
                    Verdict::Unanswered => {
                        format!("not answered (correct: {})", result.correct_answer)
                    }
                };
                println!("Q{}: {line}", result.number);
            }
            println!("score: {}/{}", report.score, report.total);
        }
        Command::Extract { ref file, ref doc_type } => {
            let doc_type: DocType = doc_type.parse()?;
            let document = read_document(&file).await?;
            let pipeline = build_pipeline(&cli);

            let outcome = pipeline.extract(&document, doc_type).await;
            print_outcome(file, &outcome)?;
        }
        Command::ExtractFolder { ref folder, ref doc_type } => {
            let doc_type: DocType = doc_type.parse()?;
            let pipeline = build_pipeline(&cli);

            let report = pipeline.extract_folder(&folder, doc_type).await?;
            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
            }
            for file_outcome in &report.outcomes {
                print_outcome(&file_outcome.path, &file_outcome.outcome)?;
            }
            println!(
                "{} processed, {} skipped",
                report.outcomes.len(),
                report.skipped.len()
            );
        }
        Command::Save { records } => {
            let mut loaded = Vec::new();
            for path in &records {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                let record: DocumentRecord = serde_json::from_str(&json)
                    .with_context(|| format!("{} is not a record JSON", path.display()))?;
                loaded.push(record);
            }

            let payload = build_save_payload(&loaded);
            info!(columns = payload.len(), "save payload built");

            let employee_id = match &cli.store_endpoint {
                Some(endpoint) => {
                    let store = HttpEmployeeStore::new(endpoint)?;
                    save_payload(&store, &payload).await?
                }
                None => {
                    warn!("no --store-endpoint set, saving to an in-memory store");
                    let store = InMemoryEmployeeStore::default();
                    save_payload(&store, &payload).await?
                }
            };

            println!("saved employee E{employee_id:03}");
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

fn build_pipeline(cli: &Cli) -> DocumentPipeline<HttpBarcodeScanner, HttpOcrEngine, HttpChatModel> {
    DocumentPipeline::new(
        HttpBarcodeScanner::new(&cli.barcode_endpoint, None),
        HttpOcrEngine::new(&cli.ocr_endpoint, None),
        HttpChatModel::new(
            &cli.model_endpoint,
            cli.model_api_key.clone(),
            &cli.model_name,
        ),
    )
}

async fn read_document(path: &Path) -> anyhow::Result<UploadedDocument> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("path has no file name: {}", path.display()))?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(UploadedDocument::new(file_name, bytes))
}

async fn read_course_text(pdf: &Path, cli: &Cli) -> anyhow::Result<String> {
    let document = read_document(pdf).await?;

    let pages = doc_intake_core::extract_embedded_pages(&document).unwrap_or_else(|error| {
        warn!(%error, "embedded text extraction failed, trying ocr");
        Vec::new()
    });

    let text = if pages.is_empty() {
        let ocr = HttpOcrEngine::new(&cli.ocr_endpoint, None);
        join_pages(&ocr.recognize(&document).await?)
    } else {
        join_pages(&pages)
    };

    if text.trim().is_empty() {
        anyhow::bail!("no readable text in {}", pdf.display());
    }
    Ok(text)
}

fn parse_and_report(raw: &str) -> anyhow::Result<Vec<doc_intake_core::QuizQuestion>> {
    let cleaned = normalize_quiz_text(raw)?;
    let parsed = parse_quiz(&cleaned)?;

    for dropped in &parsed.dropped {
        warn!(
            block = dropped.block_index,
            defect = ?dropped.defect,
            "quiz block dropped"
        );
    }
    if parsed.outcome() == QuizOutcome::Empty {
        anyhow::bail!("no well-formed questions in the quiz text");
    }

    Ok(parsed.questions)
}

fn print_outcome(path: &Path, outcome: &ExtractOutcome) -> anyhow::Result<()> {
    match outcome {
        ExtractOutcome::Structured(record) | ExtractOutcome::Parsed(record) => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        ExtractOutcome::Unparsed {
            raw_output,
            details,
        } => {
            warn!(path = %path.display(), %details, "model output was not parseable");
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "error": details,
                    "raw_output": raw_output,
                }))?
            );
        }
        ExtractOutcome::Empty { reason } => {
            warn!(path = %path.display(), %reason, "nothing extracted");
        }
    }
    Ok(())
}
