//! Command-line client for the Goszakup risk-analysis backend.
//!
//! Usage:
//!     goszakup health
//!     goszakup lots --risk-level HIGH --sort-by risk_score --summary
//!     goszakup analyze --file tz.txt
//!     goszakup quick-check "Требуется Dell Latitude, аналоги не допускаются"

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use goszakup_aggregate::{summarize, top_risks};
use goszakup_client::{ApiClient, ApiError, ClientConfig, API_URL_ENV, DEFAULT_BASE_URL};
use goszakup_explain::{
    describe_quick_check, format_budget, format_risk, format_risk_score, summarize_analysis,
};
use goszakup_model::{
    AnalyzeTextRequest, CategoryPricingQuery, CompareRequest, CustomerLot, DirectoryQuery,
    ExportFilters, FeedbackLabel, FeedbackRequest, GetLotsRequest, NetworkGraphQuery, PeriodType,
    RiskLevel, SortBy, TimelineQuery,
};
use goszakup_quickcheck::{QuickCheckConfig, QuickChecker};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "goszakup")]
#[command(about = "Query procurement risk analyses from the Goszakup backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Retries after the first attempt
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Label {
    Normal,
    Risky,
}

impl From<Label> for FeedbackLabel {
    fn from(label: Label) -> Self {
        match label {
            Label::Normal => FeedbackLabel::Normal,
            Label::Risky => FeedbackLabel::Risky,
        }
    }
}

/// Specification text: inline, from a file, or `-` for stdin.
#[derive(Args, Debug)]
struct TextInput {
    /// Text to analyse (`-` reads stdin)
    text: Option<String>,

    /// Read the text from a file
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PageArgs {
    #[arg(long, default_value = "0")]
    page: u32,

    #[arg(long, default_value = "20")]
    size: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend health
    Health,

    /// Dashboard statistics
    Stats,

    /// List lots
    Lots {
        #[command(flatten)]
        paging: PageArgs,

        /// LOW, MEDIUM, HIGH or CRITICAL
        #[arg(long)]
        risk_level: Option<RiskLevel>,

        /// Search in lot names and descriptions
        #[arg(long)]
        search: Option<String>,

        /// risk_score, budget or deadline_days
        #[arg(long)]
        sort_by: Option<SortBy>,

        /// Sort ascending instead of descending
        #[arg(long, requires = "sort_by")]
        ascending: bool,

        /// Print figures computed from the returned page
        #[arg(long)]
        summary: bool,
    },

    /// Full analysis of one lot
    Lot {
        lot_id: String,
    },

    /// Analyse a specification text; falls back to the quick-check offline
    Analyze {
        #[command(flatten)]
        input: TextInput,

        #[arg(long)]
        budget: Option<f64>,

        #[arg(long)]
        participants: Option<u32>,

        #[arg(long)]
        deadline_days: Option<i64>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Local heuristic estimate, no backend needed
    QuickCheck {
        #[command(flatten)]
        input: TextInput,
    },

    /// Label a lot for model retraining
    Feedback {
        lot_id: String,

        #[arg(long, value_enum)]
        label: Label,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Price statistics per category, or for one category
    Pricing {
        /// Category code for the detailed distribution
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        sort_by: Option<String>,

        #[arg(long)]
        min_count: Option<u32>,
    },

    /// List categories
    Categories {
        #[command(flatten)]
        paging: PageArgs,

        #[arg(long)]
        search: Option<String>,
    },

    /// One category with price statistics and top customers
    Category {
        code: String,
    },

    /// List customers
    Customers {
        #[command(flatten)]
        paging: PageArgs,

        #[arg(long)]
        search: Option<String>,
    },

    /// One customer by BIN
    Customer {
        bin: String,
    },

    /// Customer-supplier graph, or one organisation's profile with --bin
    Network {
        #[arg(long)]
        bin: Option<String>,

        #[arg(long)]
        min_connections: Option<u32>,

        #[arg(long)]
        max_nodes: Option<u32>,
    },

    /// Risk over time
    Timeline {
        /// day, week, month or quarter
        #[arg(long)]
        period: Option<PeriodType>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Compare 2 to 10 lots side by side
    Compare {
        #[arg(required = true, num_args = 1..)]
        lot_ids: Vec<String>,
    },

    /// Download lots as CSV
    ExportCsv {
        #[arg(short, long, default_value = "lots_export.csv")]
        output: PathBuf,

        #[arg(long)]
        risk_level: Option<RiskLevel>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        exclude_synthetic: bool,

        #[arg(long)]
        min_budget: Option<f64>,

        #[arg(long)]
        max_budget: Option<f64>,
    },

    /// Download a lot report as PDF
    ExportPdf {
        lot_id: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("goszakup=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::default()
        .with_base_url(cli.api_url)
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_retry_attempts(cli.retries);
    let client = ApiClient::new(config)?;
    let format = cli.format;

    match cli.command {
        Commands::Health => run_health(&client, format).await,
        Commands::Stats => run_stats(&client, format).await,
        Commands::Lots {
            paging,
            risk_level,
            search,
            sort_by,
            ascending,
            summary,
        } => {
            let mut request = GetLotsRequest::page(paging.page, paging.size);
            request.risk_level = risk_level;
            request.search = search;
            if let Some(sort_by) = sort_by {
                request = request.sorted_by(sort_by, !ascending);
            }
            run_lots(&client, &request, summary, format).await
        }
        Commands::Lot { lot_id } => {
            let analysis = client.lot_analysis(&lot_id).await?;
            emit(format, &analysis, || summarize_analysis(&analysis))
        }
        Commands::Analyze {
            input,
            budget,
            participants,
            deadline_days,
            category,
        } => {
            let request = AnalyzeTextRequest {
                text: input.read()?,
                budget,
                participants_count: participants,
                deadline_days,
                category_code: category,
            };
            run_analyze(&client, &request, format).await
        }
        Commands::QuickCheck { input } => run_quick_check(&input.read()?, format),
        Commands::Feedback {
            lot_id,
            label,
            comment,
        } => {
            let request = FeedbackRequest {
                lot_id,
                label: label.into(),
                comment,
            };
            let response = client.submit_feedback(&request).await?;
            emit(format, &response, || {
                vec![format!("Feedback for {} recorded", request.lot_id)]
            })
        }
        Commands::Pricing {
            category: Some(code),
            ..
        } => {
            let detail = client.category_pricing_detail(&code).await?;
            emit(format, &detail, || {
                let mut lines = vec![
                    format!("{} {}", detail.category_code, detail.category_name),
                    format!(
                        "Медиана: {} | Мин: {} | Макс: {} | Лотов: {}",
                        format_budget(detail.stats.median),
                        format_budget(detail.stats.min),
                        format_budget(detail.stats.max),
                        detail.stats.count
                    ),
                ];
                for lot in detail.outliers() {
                    lines.push(format!(
                        "  {} {} ({:+.0}%) {}",
                        lot.lot_id,
                        format_budget(lot.budget),
                        lot.deviation_pct,
                        lot.name_ru
                    ));
                }
                lines
            })
        }
        Commands::Pricing {
            category: None,
            sort_by,
            min_count,
        } => {
            let response = client
                .category_pricing(&CategoryPricingQuery { sort_by, min_count })
                .await?;
            emit(format, &response, || {
                response
                    .categories
                    .iter()
                    .map(|c| {
                        format!(
                            "{:<10} {:>6} лотов  медиана {:>10}  высокий риск {:.0}%  {}",
                            c.category_code,
                            c.count,
                            format_budget(c.median),
                            c.high_risk_pct,
                            c.category_name
                        )
                    })
                    .collect()
            })
        }
        Commands::Categories { paging, search } => {
            let page = client.categories(&paging.directory(search)).await?;
            emit(format, &page, || {
                let mut lines = vec![format!("Категорий: {}", page.total)];
                lines.extend(page.items.iter().map(|c| {
                    format!(
                        "{:<10} {:>6} лотов  {:>10}  риск {}  {}",
                        c.category_code,
                        c.lot_count,
                        format_budget(c.total_budget),
                        format_risk_score(c.avg_risk_score),
                        c.category_name
                    )
                }));
                lines
            })
        }
        Commands::Category { code } => {
            let detail = client.category(&code).await?;
            emit(format, &detail, || {
                let mut lines = vec![
                    format!("{} {}", detail.category_code, detail.category_name),
                    format!(
                        "Лотов: {} | Бюджет: {} | Риск: {}",
                        detail.total_lots,
                        format_budget(detail.total_budget),
                        format_risk_score(detail.avg_risk_score)
                    ),
                ];
                for customer in &detail.top_customers {
                    lines.push(format!(
                        "  {} {} ({} лотов)",
                        customer.customer_bin, customer.customer_name, customer.lot_count
                    ));
                }
                lines
            })
        }
        Commands::Customers { paging, search } => {
            let page = client.customers(&paging.directory(search)).await?;
            emit(format, &page, || {
                let mut lines = vec![format!("Заказчиков: {}", page.total)];
                lines.extend(page.items.iter().map(|c| {
                    format!(
                        "{} {:>6} лотов  {:>10}  риск {}  {}",
                        c.customer_bin,
                        c.lot_count,
                        format_budget(c.total_budget),
                        format_risk_score(c.avg_risk_score),
                        c.customer_name
                    )
                }));
                lines
            })
        }
        Commands::Customer { bin } => {
            let detail = client.customer(&bin).await?;
            emit(format, &detail, || {
                let mut lines = vec![
                    format!("{} {}", detail.customer_bin, detail.customer_name),
                    format!(
                        "Лотов: {} | Бюджет: {} | Риск: {}",
                        detail.total_lots,
                        format_budget(detail.total_budget),
                        format_risk_score(detail.avg_risk_score)
                    ),
                ];
                for lot in &detail.recent_lots {
                    lines.push(format!(
                        "  {} {} {} {}",
                        lot.lot_id,
                        customer_lot_risk(lot),
                        format_budget(lot.budget),
                        lot.name_ru
                    ));
                }
                lines
            })
        }
        Commands::Network {
            bin: Some(bin),
            ..
        } => {
            let analysis = client.network_node(&bin).await?;
            emit(format, &analysis, || {
                let mut lines = vec![
                    format!("{} ({})", analysis.bin, analysis.node.kind),
                    format!(
                        "Связей: {} | Центральность: {:.3} | Сообщество: {} ({} узлов)",
                        analysis.connections_count,
                        analysis.node.centrality,
                        analysis.node.community_id,
                        analysis.community_size
                    ),
                ];
                lines.extend(analysis.flags.iter().map(|flag| format!("  • {flag}")));
                lines
            })
        }
        Commands::Network {
            bin: None,
            min_connections,
            max_nodes,
        } => {
            let graph = client
                .network_graph(&NetworkGraphQuery {
                    min_connections,
                    max_nodes,
                })
                .await?;
            emit(format, &graph, || {
                vec![format!(
                    "Узлов: {} (заказчиков {}, поставщиков {}) | Связей: {}",
                    graph.stats.total_nodes,
                    graph.stats.customer_count,
                    graph.stats.supplier_count,
                    graph.stats.total_edges
                )]
            })
        }
        Commands::Timeline { period, limit } => {
            let response = client.timeline(&TimelineQuery { period, limit }).await?;
            emit(format, &response, || {
                response
                    .timeline
                    .iter()
                    .map(|t| {
                        format!(
                            "{:<10} {:>6} лотов  риск {}  высокий {:.0}%",
                            t.period,
                            t.count,
                            format_risk_score(t.avg_risk),
                            t.high_risk_pct
                        )
                    })
                    .collect()
            })
        }
        Commands::Compare { lot_ids } => {
            let response = client.compare_lots(&CompareRequest { lot_ids }).await?;
            emit(format, &response, || {
                let mut lines = vec![format!(
                    "Лотов: {} | Средний риск: {} | Высокий риск: {}",
                    response.count,
                    format_risk_score(response.avg_risk_score),
                    response.high_risk_count
                )];
                for analysis in &response.lots {
                    lines.push(format!(
                        "  {} {} {}",
                        analysis.lot_id,
                        format_risk(analysis.final_score, analysis.final_level),
                        analysis.lot_data.name_ru
                    ));
                }
                lines
            })
        }
        Commands::ExportCsv {
            output,
            risk_level,
            category,
            exclude_synthetic,
            min_budget,
            max_budget,
        } => {
            let filters = ExportFilters {
                risk_level,
                exclude_synthetic: exclude_synthetic.then_some(true),
                category_code: category,
                min_budget,
                max_budget,
            };
            let bytes = client.export_csv(&filters).await?;
            write_output(&output, &bytes)
        }
        Commands::ExportPdf { lot_id, output } => {
            let bytes = client.export_lot_pdf(&lot_id).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("lot_{lot_id}.pdf")));
            write_output(&output, &bytes)
        }
    }
}

impl TextInput {
    fn read(&self) -> Result<String> {
        let text = match (&self.file, self.text.as_deref()) {
            (Some(path), _) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, Some("-")) | (None, None) => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read stdin")?;
                text
            }
            (None, Some(text)) => text.to_string(),
        };

        if text.trim().is_empty() {
            bail!("Text cannot be empty");
        }
        Ok(text)
    }
}

impl PageArgs {
    fn directory(&self, search: Option<String>) -> DirectoryQuery {
        DirectoryQuery {
            page: self.page,
            size: self.size,
            search,
            ..Default::default()
        }
    }
}

/// Print `value` as JSON, or the lines from `text` otherwise.
fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> Vec<String>) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            for line in text() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Customer pages may carry legacy level names; those are shown as sent.
fn customer_lot_risk(lot: &CustomerLot) -> String {
    match lot.risk_level.parse::<RiskLevel>() {
        Ok(level) => format_risk(lot.risk_score, level),
        Err(_) => format!("{:.1} {}", lot.risk_score, lot.risk_level),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Export saved");
    Ok(())
}

async fn run_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    eprint!("Checking {}... ", client.config().base_url);

    match client.health().await {
        Ok(health) => {
            eprintln!("OK");
            emit(format, &health, || {
                let mut lines = vec![format!("Status: {:?}", health.status)];
                if let Some(total) = health.total_lots {
                    lines.push(format!("Lots: {total}"));
                }
                if let Some(ready) = health.analyzer_ready {
                    lines.push(format!("Analyzer ready: {ready}"));
                }
                lines
            })
        }
        Err(e) => {
            eprintln!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.dashboard_stats().await?;
    emit(format, &stats, || {
        let mut lines = vec![
            format!("Всего лотов: {} (обработано {})", stats.total_lots, stats.processed_lots),
            format!("Средний риск: {}", format_risk_score(stats.avg_score)),
            format!("Общий бюджет: {}", format_budget(stats.total_budget)),
            String::new(),
        ];
        for level in RiskLevel::ALL {
            lines.push(format!("  {:<8} {}", level.as_str(), stats.by_level.get(level)));
        }
        if !stats.top_risks.is_empty() {
            lines.push(String::new());
            for (i, lot) in stats.top_risks.iter().take(5).enumerate() {
                lines.push(format!(
                    "{}. {} ({})",
                    i + 1,
                    lot.lot_data.name_ru,
                    format_risk(lot.final_score, lot.final_level)
                ));
            }
        }
        lines
    })
}

async fn run_lots(
    client: &ApiClient,
    request: &GetLotsRequest,
    summary: bool,
    format: OutputFormat,
) -> Result<()> {
    let page = client.lots(request).await?;

    if summary {
        let figures = summarize(&page.items);
        let top: Vec<&str> = top_risks(&page.items, 5)
            .iter()
            .map(|lot| lot.lot_id.as_str())
            .collect();
        return emit(format, &serde_json::json!({"summary": figures, "top": top}), || {
            let mut lines = vec![
                format!("Лотов на странице: {} из {}", figures.total_lots, page.total),
                format!(
                    "Средний риск: {} | Взвешенный по бюджету: {}",
                    format_risk_score(figures.avg_score),
                    format_risk_score(figures.budget_weighted_score)
                ),
                format!(
                    "Бюджет: {} | Высокий риск: {:.0}%",
                    format_budget(figures.total_budget),
                    figures.high_risk_pct()
                ),
            ];
            for (code, category) in &figures.by_category {
                lines.push(format!(
                    "  {:<10} {:>4} лотов  {:>3} высокий риск  {}",
                    code, category.count, category.high_risk, category.name
                ));
            }
            lines.push(format!("Топ: {}", top.join(", ")));
            lines
        });
    }

    emit(format, &page, || {
        let mut lines = vec![format!("Найдено: {} лотов", page.total)];
        lines.extend(page.items.iter().map(|lot| {
            format!(
                "{:<14} {}  {:>10}  {}",
                lot.lot_id,
                format_risk(lot.risk_score, lot.risk_level),
                format_budget(lot.budget),
                lot.name_ru
            )
        }));
        lines
    })
}

async fn run_analyze(client: &ApiClient, request: &AnalyzeTextRequest, format: OutputFormat) -> Result<()> {
    match client.analyze_text(request).await {
        Ok(analysis) => emit(format, &analysis, || summarize_analysis(&analysis)),
        Err(e @ (ApiError::Connection(_) | ApiError::Timeout(_))) => {
            warn!(error = %e, "Backend unreachable, falling back to quick-check");
            run_quick_check(&request.text, format)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_quick_check(text: &str, format: OutputFormat) -> Result<()> {
    let checker = QuickChecker::new(QuickCheckConfig::default())?;
    let result = checker.check(text);
    emit(format, &result, || describe_quick_check(&result))
}
