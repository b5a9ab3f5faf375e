use std::io;
use std::path::{Path, PathBuf};

use coa_accounts::JsonFileSource;
use comfy_table::Table;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::read_to_string;

use crate::Cli;

pub const CONFIG_FILE_NAME: &str = "coa.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("coa config not found at: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("company not found in config: {company_id}")]
    CompanyNotFound { company_id: String },

    #[error("no company selected (use --company or set default_company)")]
    NoCompanySelected,

    #[error("failed to resolve accounts path: {base_path} + {accounts_path}")]
    ResolvingAccountsPath {
        base_path: PathBuf,
        accounts_path: PathBuf,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigToml {
    #[serde(default)]
    pub companies: IndexMap<String, CompanyConfigToml>,
    pub log: Option<String>,
    pub default_company: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanyConfigToml {
    pub name: Option<String>,
    pub accounts: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub companies: IndexMap<String, CompanyConfig>,
    pub log: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyConfig {
    pub name: String,
    pub accounts: PathBuf,
}

impl Config {
    /// Load from a config file, or from `coa.toml` inside a directory.
    pub async fn load(path: &Path, cli: &Cli) -> Result<Self, ConfigError> {
        let path = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_owned()
        };
        let string = read_to_string(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::ConfigNotFound { path: path.clone() }
            } else {
                ConfigError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Self::parse(&path, &string, cli)
    }

    pub fn parse(path: &Path, string: &str, cli: &Cli) -> Result<Self, ConfigError> {
        let config: ConfigToml = toml::from_str(string).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        let ConfigToml {
            companies,
            log,
            default_company,
        } = config;

        let companies = Self::resolve_companies(companies, path)?;
        let log = cli.log.clone().or(log).unwrap_or("error".into());
        let company = cli.company.clone().or(default_company).or_else(|| {
            // A lone company needs no selection.
            (companies.len() == 1)
                .then(|| companies.keys().next().cloned())
                .flatten()
        });

        Ok(Config {
            path: path.to_owned(),
            companies,
            log,
            company,
        })
    }

    pub fn get_company(&self, company_id: &str) -> Result<&CompanyConfig, ConfigError> {
        self.companies
            .get(company_id)
            .ok_or_else(|| ConfigError::CompanyNotFound {
                company_id: company_id.to_string(),
            })
    }

    /// The company chosen by `--company`, `default_company`, or the only one
    /// configured.
    pub fn selected_company(&self) -> Result<(&str, &CompanyConfig), ConfigError> {
        let company_id = self.company.as_deref().ok_or(ConfigError::NoCompanySelected)?;
        let company = self.get_company(company_id)?;
        Ok((company_id, company))
    }

    pub fn account_source(&self) -> JsonFileSource {
        let mut source = JsonFileSource::new();
        for (company_id, company) in self.companies.iter() {
            source.insert(company_id.clone(), company.accounts.clone());
        }
        source
    }

    pub fn print_companies(&self) {
        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_FULL)
            .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
            .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
            .set_header(vec!["id", "name", "accounts", "selected"]);

        for (company_id, config) in self.companies.iter() {
            let CompanyConfig { name, accounts } = config;
            let selected = self.company.as_deref() == Some(company_id.as_str());
            table.add_row(vec![
                company_id.clone(),
                name.clone(),
                accounts.to_string_lossy().to_string(),
                if selected { "*".into() } else { String::new() },
            ]);
        }

        println!("{table}")
    }

    fn resolve_companies(
        companies: IndexMap<String, CompanyConfigToml>,
        config_path: &Path,
    ) -> Result<IndexMap<String, CompanyConfig>, ConfigError> {
        companies
            .into_iter()
            .map(|(company_id, config)| {
                let CompanyConfigToml { name, accounts } = config;
                let name = name.unwrap_or_else(|| company_id.clone());
                let accounts = Self::resolve_accounts_path(config_path, &accounts)?;
                Ok((company_id, CompanyConfig { name, accounts }))
            })
            .collect::<Result<_, _>>()
    }

    fn resolve_accounts_path(
        base_path: &Path,
        accounts_path: &Path,
    ) -> Result<PathBuf, ConfigError> {
        if accounts_path.is_absolute() {
            Ok(accounts_path.to_path_buf())
        } else {
            base_path
                .parent()
                .map(|parent| parent.join(accounts_path))
                .ok_or_else(|| ConfigError::ResolvingAccountsPath {
                    base_path: base_path.to_owned(),
                    accounts_path: accounts_path.to_owned(),
                })
        }
    }
}
