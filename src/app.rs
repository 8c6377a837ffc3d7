use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::api::{ApiError, HttpOptions, HttpRecordsApi, DEFAULT_PER_PAGE};
use crate::cli::args::{CliArgs, Command, FilterArgs};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::export::{self, CustomExportRequest, CustomExportType, ExportFormat, ExportResult};
use crate::filters::FilterSet;
use crate::output::{self, OutputFormat};
use crate::progress::ProgressTicker;
use crate::upload::UploadFile;
use crate::view::{notify, Intent, Notification, NotificationLevel, TableController};

#[derive(Clone, Debug)]
struct RunConfig {
    http: HttpOptions,
    per_page: u32,
    no_color: bool,
    output_format: OutputFormat,
    download_dir: Option<PathBuf>,
    verbose: u8,
    command: Command,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let defaults = HttpOptions::default();
    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or(defaults.base_url);
    let timeout_seconds = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(defaults.timeout_seconds);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());
    let insecure = args.insecure || cfg.insecure.unwrap_or(false);

    let per_page = args.per_page.or(cfg.per_page).unwrap_or(DEFAULT_PER_PAGE);
    if per_page == 0 {
        return Err("invalid per_page, expected positive integer".to_string());
    }

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let output_format = if args.json {
        OutputFormat::Json
    } else {
        match cfg.output_format.as_deref() {
            Some(raw) => OutputFormat::parse(raw)
                .ok_or_else(|| format!("invalid output_format '{raw}', expected text or json"))?,
            None => OutputFormat::Text,
        }
    };

    let download_dir = cfg.download_dir.as_deref().map(config::expand_tilde);

    Ok(RunConfig {
        http: HttpOptions {
            base_url,
            timeout_seconds,
            proxy,
            insecure,
        },
        per_page,
        no_color,
        output_format,
        download_dir,
        verbose: args.verbose,
        command: args.command,
    })
}

fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the level for this crate. Logs go
/// to stderr so they never mix with JSON output.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("embalagem={}", level_for_verbosity(verbose)))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn api_failure(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Network { .. } => format!("{fallback}: {err}"),
        _ => err.user_message().unwrap_or(fallback).to_string(),
    }
}

fn print_out(run: &RunConfig, text: String, json: Vec<u8>) {
    match run.output_format {
        OutputFormat::Text => print!("{text}"),
        OutputFormat::Json => {
            let _ = std::io::stdout().write_all(&json);
        }
    }
}

fn announce(run: &RunConfig, notes: &[Notification]) {
    if run.output_format == OutputFormat::Text {
        for note in notes {
            eprintln!("{}", output::render_notification(note));
        }
    }
}

fn flush_notifications<A: crate::api::RecordsApi>(
    controller: &mut TableController<A>,
) -> Option<String> {
    let mut first_error = None;
    for note in controller.model_mut().take_notifications() {
        eprintln!("{}", output::render_notification(&note));
        if note.level == NotificationLevel::Error && first_error.is_none() {
            first_error = Some(note.message);
        }
    }
    first_error
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    let api = HttpRecordsApi::new(&run.http).map_err(|e| e.to_string())?;
    tracing::info!(base_url = %api.base_url(), "using API");

    match run.command.clone() {
        Command::List { page, filters } => list(api, &run, page, &filters).await,
        Command::Show { id } => show(api, &run, id).await,
        Command::Stats => {
            let stats = api
                .fetch_stats()
                .await
                .map_err(|e| api_failure(&e, "Erro ao carregar estatísticas"))?;
            print_out(&run, output::render_stats(&stats), output::render_json(&stats));
            Ok(())
        }
        Command::Upload { file } => upload(api, &run, &file).await,
        Command::Export {
            filters,
            format,
            download,
        } => {
            let set = FilterSet::from_raw(filters.raw_pairs());
            let format = format
                .as_deref()
                .and_then(ExportFormat::parse)
                .unwrap_or_default();
            let ticker = ProgressTicker::start("Exportando...", run.output_format == OutputFormat::Json);
            let result = api.export(&set, format).await;
            finish_export(&api, &run, ticker, result, download.as_deref()).await
        }
        Command::Faturamento {
            export_type,
            remessa,
            data_inicio,
            data_fim,
            download,
        } => {
            let request = match CustomExportType::parse(&export_type).unwrap_or_default() {
                CustomExportType::All => CustomExportRequest::all(),
                CustomExportType::Remessa => {
                    CustomExportRequest::by_remessa(remessa.unwrap_or_default())
                }
                CustomExportType::Date => {
                    CustomExportRequest::by_date(data_inicio.as_deref(), data_fim.as_deref())
                }
            };
            request.validate()?;
            let ticker = ProgressTicker::start(
                "Gerando faturamento...",
                run.output_format == OutputFormat::Json,
            );
            let result = api.export_custom(&request).await;
            finish_export(&api, &run, ticker, result, download.as_deref()).await
        }
        Command::Browse { filters } => browse(api, &run, &filters).await,
    }
}

async fn list(api: HttpRecordsApi, run: &RunConfig, page: u32, filters: &FilterArgs) -> Result<(), String> {
    let mut controller = TableController::new(api, run.per_page);
    let set = FilterSet::from_raw(filters.raw_pairs());
    let request = controller.model_mut().load(page, set);
    controller.execute(request).await;

    let view = controller.model().view();
    if let Some(message) = flush_notifications(&mut controller) {
        return Err(message);
    }
    print_out(run, output::render_table(&view), output::render_json(&view));
    Ok(())
}

async fn show(api: HttpRecordsApi, run: &RunConfig, id: i64) -> Result<(), String> {
    let mut controller = TableController::new(api, run.per_page);
    match controller.view_record(id).await {
        Some(detail) => {
            print_out(run, output::render_detail(&detail), output::render_json(&detail));
            Ok(())
        }
        None => Err(flush_notifications(&mut controller)
            .unwrap_or_else(|| notify::DETAIL_FAILED.to_string())),
    }
}

async fn upload(api: HttpRecordsApi, run: &RunConfig, file: &str) -> Result<(), String> {
    let file = UploadFile::inspect(config::expand_tilde(file))
        .await
        .map_err(|e| e.to_string())?;
    if run.output_format == OutputFormat::Text {
        print!("{}", output::kv_line("Arquivo", &file.file_name));
        print!("{}", output::kv_line("Tamanho", &file.size_display()));
    }

    let ticker = ProgressTicker::start(
        "Processando arquivo...",
        run.output_format == OutputFormat::Json,
    );
    match api.upload(&file).await {
        Ok(report) => {
            ticker.finish("Upload concluído");
            announce(run, &output::upload_notifications(&report));
            print_out(run, output::render_upload(&report), output::render_json(&report));
            Ok(())
        }
        Err(e) => {
            ticker.abandon();
            Err(format!("Erro no Upload: {}", api_failure(&e, "Erro no upload")))
        }
    }
}

async fn finish_export(
    api: &HttpRecordsApi,
    run: &RunConfig,
    ticker: ProgressTicker,
    result: Result<ExportResult, ApiError>,
    download: Option<&str>,
) -> Result<(), String> {
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            ticker.abandon();
            return Err(api_failure(&e, "Erro na exportação"));
        }
    };
    ticker.finish("Exportação concluída");

    let target_dir = download
        .map(config::expand_tilde)
        .or_else(|| run.download_dir.clone());
    let saved = match target_dir {
        Some(dir) => Some(save_export(api, &result, &dir).await?),
        None => None,
    };
    announce(run, &[output::export_notification(&result)]);
    print_out(
        run,
        output::render_export(&result, saved.as_deref()),
        output::render_json(&result),
    );
    Ok(())
}

async fn save_export(api: &HttpRecordsApi, result: &ExportResult, dir: &Path) -> Result<PathBuf, String> {
    let bytes = api
        .download(&result.download_url)
        .await
        .map_err(|e| api_failure(&e, "Erro ao baixar arquivo"))?;
    let path = export::save_download(dir, &result.filename, &bytes)
        .await
        .map_err(|e| format!("failed to save '{}' into '{}': {e}", result.filename, dir.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "export saved");
    Ok(path)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum BrowseCommand {
    Intent(Intent),
    Detail(i64),
    Help,
    Quit,
    Noop,
}

const BROWSE_HELP: &str = "n next page | p previous page | g N go to page | f key=value ... filter | c clear filters | r refresh | d ID details | q quit";

fn parse_browse_command(line: &str) -> Result<BrowseCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(BrowseCommand::Noop);
    };
    let rest: Vec<&str> = parts.collect();

    match head.to_lowercase().as_str() {
        "n" | "next" => Ok(BrowseCommand::Intent(Intent::NextPage)),
        "p" | "prev" | "previous" => Ok(BrowseCommand::Intent(Intent::PreviousPage)),
        "c" | "clear" => Ok(BrowseCommand::Intent(Intent::ClearFilters)),
        "r" | "refresh" => Ok(BrowseCommand::Intent(Intent::Refresh)),
        "q" | "quit" | "exit" => Ok(BrowseCommand::Quit),
        "h" | "?" | "help" => Ok(BrowseCommand::Help),
        "g" | "goto" => {
            let raw = rest.first().ok_or("usage: g <page>")?;
            let page = raw
                .parse::<u32>()
                .map_err(|_| format!("invalid page '{raw}'"))?;
            Ok(BrowseCommand::Intent(Intent::GoToPage(page)))
        }
        "d" | "detail" => {
            let raw = rest.first().ok_or("usage: d <id>")?;
            let id = raw
                .parse::<i64>()
                .map_err(|_| format!("invalid record id '{raw}'"))?;
            Ok(BrowseCommand::Detail(id))
        }
        "f" | "filter" => {
            let mut values: Vec<(String, String)> = Vec::new();
            for token in rest {
                match token.split_once('=') {
                    Some((key, value)) => values.push((key.to_string(), value.to_string())),
                    // a bare word continues the previous value ("status=em separacao")
                    None => match values.last_mut() {
                        Some((_, value)) => {
                            value.push(' ');
                            value.push_str(token);
                        }
                        None => return Err(format!("expected key=value, got '{token}'")),
                    },
                }
            }
            let set = FilterSet::from_raw(values.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            set.validate_dates()?;
            Ok(BrowseCommand::Intent(Intent::ApplyFilters { values }))
        }
        other => Err(format!("unknown command '{other}' (h for help)")),
    }
}

fn draw<A: crate::api::RecordsApi>(controller: &mut TableController<A>, run: &RunConfig) {
    let view = controller.model().view();
    print_out(run, output::render_table(&view), output::render_json(&view));
    flush_notifications(controller);
}

async fn browse(api: HttpRecordsApi, run: &RunConfig, filters: &FilterArgs) -> Result<(), String> {
    let mut controller = TableController::new(api, run.per_page);
    if run.output_format == OutputFormat::Text {
        print!("{}", output::kv_line("API", controller.api().base_url().as_str()));
        println!("{}", BROWSE_HELP.dimmed());
    }

    let raw = filters.raw_pairs();
    let first = if raw.is_empty() {
        Intent::Open
    } else {
        Intent::ApplyFilters {
            values: raw.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    };
    controller.dispatch(first).await;
    draw(&mut controller, run);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold());
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read input: {e}")),
        };

        match parse_browse_command(&line) {
            Ok(BrowseCommand::Quit) => break,
            Ok(BrowseCommand::Noop) => {}
            Ok(BrowseCommand::Help) => println!("{BROWSE_HELP}"),
            Ok(BrowseCommand::Intent(intent)) => {
                if controller.dispatch(intent).await.is_none() {
                    tracing::debug!("intent ignored");
                    controller.model_mut().notify(Notification::info(notify::NOTHING_TO_DO));
                    flush_notifications(&mut controller);
                    continue;
                }
                draw(&mut controller, run);
            }
            Ok(BrowseCommand::Detail(id)) => {
                if let Some(detail) = controller.view_record(id).await {
                    print_out(run, output::render_detail(&detail), output::render_json(&detail));
                }
                flush_notifications(&mut controller);
            }
            Err(message) => eprintln!("{}", message.red()),
        }
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["embalagem"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn defaults_apply_without_flags_or_config() {
        let run = build_run_config(args(&["stats"]), ConfigFile::default()).unwrap();
        assert_eq!(run.http.base_url, crate::api::http::DEFAULT_BASE_URL);
        assert_eq!(run.http.timeout_seconds, 10);
        assert_eq!(run.per_page, 50);
        assert_eq!(run.output_format, OutputFormat::Text);
        assert!(run.download_dir.is_none());
    }

    #[test]
    fn cli_flags_override_config_file() {
        let cfg = ConfigFile {
            base_url: Some("http://config:5000/api/embalagem".to_string()),
            timeout: Some(30),
            per_page: Some(20),
            ..ConfigFile::default()
        };
        let run = build_run_config(
            args(&["list", "--base-url", "http://cli:5000/api/embalagem", "-T", "5"]),
            cfg,
        )
        .unwrap();
        assert_eq!(run.http.base_url, "http://cli:5000/api/embalagem");
        assert_eq!(run.http.timeout_seconds, 5);
        assert_eq!(run.per_page, 20);
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let run = build_run_config(args(&["list", "--json", "--per-page", "10"]), ConfigFile::default())
            .unwrap();
        assert_eq!(run.output_format, OutputFormat::Json);
        assert_eq!(run.per_page, 10);
    }

    #[test]
    fn config_output_format_is_validated() {
        let cfg = ConfigFile {
            output_format: Some("xml".to_string()),
            ..ConfigFile::default()
        };
        assert!(build_run_config(args(&["stats"]), cfg).is_err());
    }

    #[test]
    fn invalid_filters_are_rejected_before_running() {
        assert!(build_run_config(args(&["list", "--data-inicio", "01/02/2024"]), ConfigFile::default())
            .is_err());
        assert!(build_run_config(args(&["list", "--page", "0"]), ConfigFile::default()).is_err());
        assert!(build_run_config(args(&["export", "--format", "pdf"]), ConfigFile::default()).is_err());
        assert!(build_run_config(args(&["faturamento", "--type", "mensal"]), ConfigFile::default())
            .is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    fn browse_commands_parse() {
        assert_eq!(
            parse_browse_command("n").unwrap(),
            BrowseCommand::Intent(Intent::NextPage)
        );
        assert_eq!(
            parse_browse_command(" g 4 ").unwrap(),
            BrowseCommand::Intent(Intent::GoToPage(4))
        );
        assert_eq!(parse_browse_command("d 17").unwrap(), BrowseCommand::Detail(17));
        assert_eq!(parse_browse_command("").unwrap(), BrowseCommand::Noop);
        assert_eq!(parse_browse_command("Q").unwrap(), BrowseCommand::Quit);
        assert!(parse_browse_command("g x").is_err());
        assert!(parse_browse_command("zzz").is_err());
    }

    #[test]
    fn filter_command_joins_bare_words() {
        let cmd = parse_browse_command("f status=em separacao loja=L01").unwrap();
        assert_eq!(
            cmd,
            BrowseCommand::Intent(Intent::ApplyFilters {
                values: vec![
                    ("status".to_string(), "em separacao".to_string()),
                    ("loja".to_string(), "L01".to_string()),
                ]
            })
        );
        assert!(parse_browse_command("f pendente").is_err());
        assert!(parse_browse_command("f data_fim=31/12/2024").is_err());
    }
}
