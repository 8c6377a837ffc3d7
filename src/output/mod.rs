use std::path::Path;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::export::ExportResult;
use crate::records::{DashboardStats, RecordDetail};
use crate::upload::UploadReport;
use crate::utils;
use crate::view::{
    Notification, NotificationLevel, PageItem, PaginationView, RenderState, TableRow, TableView,
};

pub const EMPTY_TABLE: &str = "Nenhum registro encontrado";
pub const LOADING_TABLE: &str = "Carregando dados...";
pub const UPLOAD_DONE: &str = "Upload Realizado com Sucesso!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = serde_json::to_vec_pretty(value).unwrap_or_else(|_| b"null".to_vec());
    out.push(b'\n');
    out
}

pub fn kv_line(label: &str, value: &str) -> String {
    format!(":: {:<16}: {}\n", label, value)
}

pub fn status_badge(label: &str, class: &str, width: usize) -> ColoredString {
    let padded = format!("{:<width$}", label);
    match class {
        "pendente" => padded.yellow(),
        "em_separacao" => padded.blue(),
        "finalizado" => padded.green(),
        "faturado" => padded.magenta(),
        _ => padded.normal(),
    }
}

const HEADERS: [&str; 8] = [
    "ID",
    "Loja",
    "Remessa",
    "Código",
    "Descrição",
    "Qtde Emb",
    "Status",
    "Data Registro",
];

fn column_widths(rows: &[TableRow]) -> [usize; 8] {
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in rows {
        let cells = row_cells(row);
        for (w, cell) in widths.iter_mut().zip(cells.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths
}

fn row_cells(row: &TableRow) -> [String; 8] {
    [
        row.id.to_string(),
        row.store.clone(),
        row.shipment_id.clone(),
        row.product_code.clone(),
        row.description.clone(),
        row.packaging_qty.clone(),
        row.status_label.clone(),
        row.registered_at.clone(),
    ]
}

pub fn render_table(view: &TableView) -> String {
    let mut out = String::new();
    if let Some(summary) = view.filters.summary() {
        out.push_str(&kv_line("Filtros", &summary));
    }
    match view.state {
        RenderState::Idle => return out,
        RenderState::Loading => {
            out.push_str(LOADING_TABLE);
            out.push('\n');
            return out;
        }
        RenderState::Empty => {
            out.push_str(&EMPTY_TABLE.dimmed().to_string());
            out.push('\n');
            return out;
        }
        RenderState::Loaded => {}
    }

    let widths = column_widths(&view.rows);
    let header = HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&header.bold().to_string());
    out.push('\n');

    for row in &view.rows {
        let cells = row_cells(row);
        let mut line = Vec::with_capacity(cells.len());
        for (idx, (cell, w)) in cells.iter().zip(widths.iter()).enumerate() {
            if idx == 6 {
                line.push(status_badge(cell, &row.status_class, *w).to_string());
            } else {
                line.push(format!("{:<w$}", cell, w = *w));
            }
        }
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    if let Some(pagination) = view.pagination.as_ref() {
        out.push('\n');
        out.push_str(&render_pagination(pagination));
    }
    out
}

pub fn render_pagination(p: &PaginationView) -> String {
    let mut out = format!(
        "Mostrando {} de {} registros\n",
        p.range, p.total_records
    );
    let mut controls: Vec<String> = Vec::with_capacity(p.items.len() + 2);
    controls.push(if p.prev_enabled {
        "<".to_string()
    } else {
        "<".dimmed().to_string()
    });
    for item in &p.items {
        controls.push(match item {
            PageItem::Page {
                number,
                active: true,
            } => format!("[{number}]").bold().to_string(),
            PageItem::Page { number, .. } => number.to_string(),
            PageItem::Ellipsis => "...".to_string(),
        });
    }
    controls.push(if p.next_enabled {
        ">".to_string()
    } else {
        ">".dimmed().to_string()
    });
    out.push_str(&controls.join(" "));
    out.push('\n');
    out
}

pub fn render_detail(detail: &RecordDetail) -> String {
    let r = &detail.record;
    let mut out = String::new();
    out.push_str(&"Informações Básicas\n".bold().to_string());
    out.push_str(&kv_line("ID", &r.id.to_string()));
    out.push_str(&kv_line("Loja", &r.store));
    out.push_str(&kv_line("Remessa", &r.shipment_id));
    out.push_str(&kv_line("Local", &detail.location));
    out.push_str(&kv_line("Ordem", &detail.order));
    out.push_str(&kv_line("Posição Depósito", &detail.warehouse_position));

    out.push_str(&"Produto\n".bold().to_string());
    out.push_str(&kv_line("Código", &r.product_code));
    out.push_str(&kv_line("Descrição", &r.product_description));
    out.push_str(&kv_line("UM", &detail.unit));
    out.push_str(&kv_line("EAN", utils::or_na(detail.ean.as_deref())));

    out.push_str(&"Quantidades\n".bold().to_string());
    out.push_str(&kv_line("Qtde Embalagem", &utils::format_quantity(r.packaging_qty)));
    out.push_str(&kv_line("Qtde Caixa", &utils::format_quantity(detail.box_qty)));
    out.push_str(&kv_line("Qtde UM", &utils::format_quantity(detail.unit_qty)));
    out.push_str(&kv_line("Estoque", &utils::format_quantity(detail.stock)));

    out.push_str(&"Status e Controle\n".bold().to_string());
    let label = r.status.to_string();
    let badge = status_badge(&label, &r.status.css_class(), 0);
    out.push_str(&kv_line("Status", &badge.to_string()));
    out.push_str(&kv_line("Usuário", utils::or_na(detail.user.as_deref())));
    out.push_str(&kv_line("Data Registro", r.registered_at_display()));
    out
}

pub fn render_stats(stats: &DashboardStats) -> String {
    let mut out = String::new();
    out.push_str(&kv_line("Total Remessas", &stats.total_remessas.to_string()));
    out.push_str(&kv_line("Pendentes", &stats.pendentes.to_string()));
    out.push_str(&kv_line("Em Separação", &stats.em_separacao.to_string()));
    out.push_str(&kv_line("Finalizados", &stats.finalizados.to_string()));
    out.push_str(&kv_line("Faturados", &stats.faturados.to_string()));
    out.push_str(&kv_line("Total Itens", &stats.total_itens.to_string()));
    out.push_str(&kv_line("Itens com Corte", &stats.itens_com_corte.to_string()));
    out.push_str(&kv_line("Percentual Corte", &stats.cut_percentage_display()));
    out
}

pub fn render_upload(report: &UploadReport) -> String {
    let mut out = String::new();
    if let Some(message) = report.message.as_deref() {
        out.push_str(message);
        out.push('\n');
    }
    let s = &report.summary;
    if let Some(total) = s.total_received {
        out.push_str(&kv_line("Total de registros", &total.to_string()));
    }
    if let Some(valid) = s.valid_records {
        out.push_str(&kv_line("Registros válidos", &valid.to_string()));
    }
    if report.has_duplicates() {
        let found = s.duplicates_found.unwrap_or(0).to_string();
        out.push_str(&kv_line("Duplicatas encontradas", &found.yellow().to_string()));
        for key in &s.duplicate_keys {
            out.push_str(&format!("   - {key}\n"));
        }
    }
    out
}

pub fn render_export(result: &ExportResult, saved_to: Option<&Path>) -> String {
    let mut out = String::new();
    out.push_str(&kv_line("Arquivo", &result.filename));
    out.push_str(&kv_line("Registros", &result.total_records.to_string()));
    match saved_to {
        Some(path) => out.push_str(&kv_line("Salvo em", &path.display().to_string())),
        None => out.push_str(&kv_line("Download", &result.download_url)),
    }
    out
}

pub fn upload_notifications(report: &UploadReport) -> Vec<Notification> {
    let mut notes = vec![Notification::success(UPLOAD_DONE)];
    if report.has_duplicates() {
        let found = report.summary.duplicates_found.unwrap_or(0);
        notes.push(Notification::warning(format!("Duplicatas encontradas: {found}")));
    }
    notes
}

pub fn export_notification(result: &ExportResult) -> Notification {
    Notification::success(result.notification_text())
}

pub fn render_notification(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Info => "info".cyan(),
        NotificationLevel::Success => "ok".green(),
        NotificationLevel::Warning => "warn".yellow(),
        NotificationLevel::Error => "erro".red(),
    };
    format!("[{}] {}", tag.bold(), notification.message)
}
