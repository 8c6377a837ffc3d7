use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "embalagem",
    version,
    about = "terminal dashboard for the packaging (embalagem) API",
    long_about = "Browse, filter, upload and export warehouse packaging records served by the embalagem API.\n\nExamples:\n  embalagem list --status Pendente --remessa 4500012345\n  embalagem browse\n  embalagem upload ./remessas.xlsx\n  embalagem faturamento --type date --data-inicio 2024-03-01 --download ./exports\n\nTip: Use --config to persist the API address and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'j',
        long = "json",
        global = true,
        help_heading = "Output",
        help = "Print results as JSON instead of text."
    )]
    pub json: bool,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.embalagem/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'u',
        long = "base-url",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "API base URL (e.g. http://127.0.0.1:5000/api/embalagem)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'T',
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'k',
        long = "insecure",
        global = true,
        help_heading = "HTTP",
        help = "Accept invalid TLS certificates and hostnames."
    )]
    pub insecure: bool,

    #[arg(
        long = "per-page",
        value_name = "N",
        global = true,
        help_heading = "Table",
        help = "Records per page (default 50)."
    )]
    pub per_page: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show one page of records.
    #[command(visible_alias = "ls")]
    List {
        #[arg(short = 'P', long = "page", value_name = "N", default_value_t = 1)]
        page: u32,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show every field of one record.
    Show {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Dashboard counters.
    Stats,

    /// Upload a spreadsheet (.xlsx or .xls, up to 16 MB).
    Upload {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Export the records matching the filters.
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(
            short = 'f',
            long = "format",
            value_name = "FORMAT",
            help = "excel or csv (default excel)."
        )]
        format: Option<String>,

        #[arg(
            short = 'd',
            long = "download",
            value_name = "DIR",
            help = "Save the generated file into DIR."
        )]
        download: Option<String>,
    },

    /// Faturamento export: everything, one remessa, or a date range.
    Faturamento {
        #[arg(
            short = 't',
            long = "type",
            value_name = "TYPE",
            default_value = "all",
            help = "all, remessa or date."
        )]
        export_type: String,

        #[arg(long = "remessa", value_name = "REMESSA")]
        remessa: Option<String>,

        #[arg(long = "data-inicio", value_name = "YYYY-MM-DD")]
        data_inicio: Option<String>,

        #[arg(long = "data-fim", value_name = "YYYY-MM-DD")]
        data_fim: Option<String>,

        #[arg(
            short = 'd',
            long = "download",
            value_name = "DIR",
            help = "Save the generated file into DIR."
        )]
        download: Option<String>,
    },

    /// Interactive table: n/p to page, g N, f key=value, c, r, d ID, q.
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long = "data-inicio", value_name = "YYYY-MM-DD", help_heading = "Filters")]
    pub data_inicio: Option<String>,

    #[arg(long = "data-fim", value_name = "YYYY-MM-DD", help_heading = "Filters")]
    pub data_fim: Option<String>,

    #[arg(short = 's', long = "status", value_name = "STATUS", help_heading = "Filters")]
    pub status: Option<String>,

    #[arg(short = 'r', long = "remessa", value_name = "REMESSA", help_heading = "Filters")]
    pub remessa: Option<String>,

    #[arg(short = 'l', long = "loja", value_name = "LOJA", help_heading = "Filters")]
    pub loja: Option<String>,

    #[arg(short = 'c', long = "codigo", value_name = "CODIGO", help_heading = "Filters")]
    pub codigo: Option<String>,
}

impl FilterArgs {
    /// Raw `(name, value)` pairs as typed; blanks are dropped downstream.
    pub fn raw_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("data_inicio", &self.data_inicio),
            ("data_fim", &self.data_fim),
            ("status", &self.status),
            ("remessa", &self.remessa),
            ("loja", &self.loja),
            ("codigo", &self.codigo),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone())))
        .collect()
    }
}
