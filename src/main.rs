use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use exam_grader::utils::logging;
use exam_grader::{App, Config, GradingRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about = "使用视觉模型与文本模型为试卷答案评分", long_about = None)]
struct Cli {
    /// TOML 配置文件，未指定时只使用默认值和环境变量
    #[arg(long, global = true, env = "EXAM_GRADER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 识别手写答案图片并评分
    GradeImage(ImageArgs),
    /// 识别整页试卷并拆分成题目/答案对
    GradePage(ImageArgs),
    /// 为文本答案评分
    GradeText(TextArgs),
    /// 为 CSV 中的每一行评分
    GradeBatch(BatchArgs),
    /// 检查推理服务是否就绪
    Check,
}

#[derive(Args, Debug)]
struct ExamArgs {
    /// 题目
    #[arg(long)]
    question: String,
    /// 参考文本
    #[arg(long)]
    reference_text: String,
    /// 评分标准（可选）
    #[arg(long)]
    criteria: Option<String>,
}

#[derive(Args, Debug)]
struct ImageArgs {
    #[command(flatten)]
    exam: ExamArgs,
    /// 图片路径
    #[arg(long)]
    image: PathBuf,
}

#[derive(Args, Debug)]
struct TextArgs {
    #[command(flatten)]
    exam: ExamArgs,
    /// 学生答案
    #[arg(long)]
    answer: String,
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[command(flatten)]
    exam: ExamArgs,
    /// 输入 CSV（需要 student_answer 列）
    #[arg(long)]
    input: PathBuf,
    /// 输出 CSV，默认写到输入文件旁的 graded_<文件名>
    #[arg(long)]
    output: Option<PathBuf>,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("加载配置失败")?;
    logging::init(config.verbose_logging);

    let app = App::initialize(config)
        .await
        .context("推理服务未就绪")?;

    match cli.command {
        Commands::GradeImage(args) => {
            let request = image_request(args).await?;
            print_json(&app.grade_from_image(&request).await?)?;
        }
        Commands::GradePage(args) => {
            let request = image_request(args).await?;
            print_json(&app.grade_full_page(&request).await?)?;
        }
        Commands::GradeText(args) => {
            let request = GradingRequest::from_text(
                args.exam.question,
                args.exam.reference_text,
                args.exam.criteria,
                args.answer,
            );
            print_json(&app.grade_from_text(&request).await?)?;
        }
        Commands::GradeBatch(args) => {
            let output = args
                .output
                .unwrap_or_else(|| default_output_path(&args.input));
            let summary = app
                .grade_batch_file(
                    &args.input,
                    &output,
                    &args.exam.question,
                    &args.exam.reference_text,
                    args.exam.criteria.as_deref(),
                )
                .await
                .with_context(|| format!("批量评分失败: {}", args.input.display()))?;
            print_json(&summary)?;
        }
        Commands::Check => {
            println!("✅ 推理服务已就绪");
        }
    }

    Ok(())
}

// --- Command Helpers ---

async fn image_request(args: ImageArgs) -> Result<GradingRequest> {
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("无法读取图片: {}", args.image.display()))?;

    Ok(GradingRequest::from_image(
        args.exam.question,
        args.exam.reference_text,
        args.exam.criteria,
        image,
    ))
}

/// `answers.csv` -> `graded_answers.csv`
fn default_output_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.csv".to_string());
    input.with_file_name(format!("graded_{}", file_name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
