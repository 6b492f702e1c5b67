use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use codec_csv::{parse_delimiter, CsvOptions};
use flow_engine::{CommitScope, EngineConfig, Mode};

use crate::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Parser, Clone, Debug)]
#[command(
    name = "flowagg",
    about = "Почасовая агрегация netflow: пакеты и байты по Destination.IP и ProtocolName"
)]
pub struct Cli {
    /// Входной .csv файл
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Каталог для выходных .csv файлов (по одному на час)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Медленнее, но держит в памяти только текущий час
    #[arg(long)]
    pub lowmem: bool,

    /// Какие файлы партиций пересобирать после --lowmem: all | touched
    #[arg(long)]
    pub commit_scope: Option<String>,

    /// Разделитель полей входного файла
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Путь к TOML конфиг файлу
    #[arg(long, default_value = "flowagg.toml", env = "FLOWAGG_CONFIG")]
    pub config: String,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub commit_scope: Option<CommitScope>,
    pub delimiter: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Config {
            context: "read",
            detail: format!("'{path}': {e}"),
        })?;
        toml::from_str(&content).map_err(|e| CliError::Config {
            context: "parse",
            detail: format!("'{path}': {e}"),
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

const DEFAULT_OUTPUT: &str = ".";

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effective {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub commit_scope: CommitScope,
    pub csv: CsvOptions,
}

impl Effective {
    pub fn new(cli: &Cli) -> Result<Self, CliError> {
        let cfg = if Path::new(&cli.config).exists() {
            Config::load(&cli.config)?
        } else {
            Config::default()
        };
        Self::merge(cli, cfg)
    }

    fn merge(cli: &Cli, cfg: Config) -> Result<Self, CliError> {
        let input = cli.input.clone().or(cfg.input).ok_or(CliError::Config {
            context: "input",
            detail: "-i/--input is required".into(),
        })?;

        let mode = if cli.lowmem {
            Mode::Streaming
        } else {
            cfg.mode.unwrap_or_default()
        };

        let commit_scope = match cli.commit_scope.as_deref() {
            Some(s) => s.parse::<CommitScope>().map_err(|e| CliError::Config {
                context: "commit_scope",
                detail: e.to_string(),
            })?,
            None => cfg.commit_scope.unwrap_or_default(),
        };

        let mut csv = CsvOptions::default();
        if let Some(d) = cli.delimiter.as_deref().or(cfg.delimiter.as_deref()) {
            csv.delimiter = parse_delimiter(d)?;
        }

        Ok(Self {
            input,
            output: cli
                .output
                .clone()
                .or(cfg.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            mode,
            commit_scope,
            csv,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.output)
            .with_mode(self.mode)
            .with_commit_scope(self.commit_scope)
    }
}
