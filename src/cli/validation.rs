use crate::cli::args::{CliArgs, Command, FilterArgs};
use crate::export::{CustomExportType, ExportFormat};
use crate::filters::FilterSet;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(per_page) = args.per_page {
        if per_page == 0 {
            return Err("invalid --per-page, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.base_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --base-url '{raw}': {e}"))?;
    }

    match &args.command {
        Command::List { page, filters } => {
            if *page == 0 {
                return Err("invalid --page, expected positive integer".to_string());
            }
            validate_filters(filters)
        }
        Command::Browse { filters } => validate_filters(filters),
        Command::Export {
            filters, format, ..
        } => {
            if let Some(raw) = format.as_deref() {
                ExportFormat::parse(raw)
                    .ok_or_else(|| format!("invalid --format '{raw}', expected excel or csv"))?;
            }
            validate_filters(filters)
        }
        Command::Faturamento { export_type, .. } => {
            CustomExportType::parse(export_type).ok_or_else(|| {
                format!("invalid --type '{export_type}', expected all, remessa or date")
            })?;
            Ok(())
        }
        Command::Show { id } => {
            if *id <= 0 {
                return Err("invalid record id, expected positive integer".to_string());
            }
            Ok(())
        }
        Command::Stats | Command::Upload { .. } => Ok(()),
    }
}

fn validate_filters(filters: &FilterArgs) -> Result<(), String> {
    FilterSet::from_raw(filters.raw_pairs()).validate_dates()
}
