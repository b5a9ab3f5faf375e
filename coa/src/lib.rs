mod config;
mod tui;

use std::{env, path::PathBuf};

use clap::{Parser, Subcommand};
use coa_accounts::{AccountId, AccountRecord, AccountType, ChartOfAccounts, SourceError};
use coa_tree::Forest;
use coa_view::{TreeFilter, TreeViewState, apply_filter};
use comfy_table::Table;
use thiserror::Error;

pub use crate::config::{CompanyConfig, Config, ConfigError};
use crate::tui::{TuiError, browse};

#[derive(Parser, Debug)]
#[command(name = "coa", version, about = "Chart of accounts explorer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Cmd,

    #[arg(long = "config", env = "COA_CONFIG", global = true)]
    pub config_path: Option<PathBuf>,

    #[arg(long = "log", env = "COA_LOG", global = true)]
    pub log: Option<String>,

    #[arg(long = "company", env = "COA_COMPANY", global = true)]
    pub company: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    #[doc = " Manage company definitions"]
    Companies {
        #[command(subcommand)]
        command: CompaniesCmd,
    },
    #[doc = " Inspect a company's accounts"]
    Accounts {
        #[command(subcommand)]
        command: AccountsCmd,
    },
    #[doc = " Print the chart of accounts as a tree"]
    Tree {
        #[doc = " Only show accounts whose number or name contains this text"]
        #[arg(long = "search")]
        search: Option<String>,
        #[doc = " Only show accounts of this type"]
        #[arg(long = "type")]
        account_type: Option<AccountType>,
        #[doc = " Start with every account collapsed"]
        #[arg(long = "collapse")]
        collapse: bool,
    },
    #[doc = " List accounts that can become the parent of an account"]
    Parents {
        #[arg(long = "account")]
        account_id: String,
    },
    #[doc = " Report dangling parents, parent cycles and duplicate ids"]
    Check,
    #[doc = " Browse the chart of accounts interactively"]
    Browse,
}

#[derive(Subcommand, Debug)]
pub enum CompaniesCmd {
    #[doc = " List companies from coa.toml"]
    List,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCmd {
    #[doc = " List accounts in chart order"]
    List,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Tui(#[from] TuiError),

    #[error("account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    #[error("chart of accounts has {count} hierarchy anomalies")]
    Anomalies { count: usize },
}

pub async fn get_config(cli: &Cli) -> Result<Config, AppError> {
    let config_path = cli
        .config_path
        .clone()
        .or_else(|| env::var("COA_CONFIG").ok().map(PathBuf::from))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load(&config_path, cli).await?;
    Ok(config)
}

pub async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    match cli.command {
        Cmd::Companies { command } => match command {
            CompaniesCmd::List => cmd_companies_list(config).await,
        },
        Cmd::Accounts { command } => match command {
            AccountsCmd::List => cmd_accounts_list(config).await,
        },
        Cmd::Tree {
            search,
            account_type,
            collapse,
        } => cmd_tree(config, search, account_type, collapse).await,
        Cmd::Parents { account_id } => cmd_parents(config, AccountId::new(account_id)).await,
        Cmd::Check => cmd_check(config).await,
        Cmd::Browse => cmd_browse(config).await,
    }
}

async fn load_chart(config: &Config) -> Result<ChartOfAccounts, AppError> {
    let (company_id, _) = config.selected_company()?;
    let source = config.account_source();
    Ok(ChartOfAccounts::load(&source, company_id).await?)
}

async fn cmd_companies_list(config: Config) -> Result<(), AppError> {
    config.print_companies();
    Ok(())
}

async fn cmd_accounts_list(config: Config) -> Result<(), AppError> {
    let chart = load_chart(&config).await?;

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .set_header(vec![
            "number",
            "name",
            "type",
            "normal balance",
            "postable",
            "active",
        ]);

    for (depth, node) in chart.forest().iter() {
        let AccountRecord {
            number,
            name,
            account_type,
            normal_balance,
            is_postable,
            is_active,
            ..
        } = &node.record;
        table.add_row(vec![
            number.clone(),
            format!("{}{name}", "  ".repeat(depth)),
            account_type.to_string(),
            normal_balance.to_string(),
            yes_no(*is_postable).into(),
            yes_no(*is_active).into(),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

async fn cmd_tree(
    config: Config,
    search: Option<String>,
    account_type: Option<AccountType>,
    collapse: bool,
) -> Result<(), AppError> {
    let chart = load_chart(&config).await?;
    let filter = TreeFilter::new(search.unwrap_or_default(), account_type);
    for line in tree_lines(chart.company_id(), chart.forest(), &filter, collapse) {
        println!("{line}");
    }
    Ok(())
}

fn tree_lines(
    company_id: &str,
    forest: &Forest<AccountRecord>,
    filter: &TreeFilter<AccountType>,
    collapse: bool,
) -> Vec<String> {
    let filtered = apply_filter(forest, filter);
    let mut state = TreeViewState::new();
    state.load(company_id, &filtered);
    if collapse {
        state.collapse_all();
    }
    state
        .visible_rows(&filtered)
        .iter()
        .map(ToString::to_string)
        .collect()
}

async fn cmd_parents(config: Config, account_id: AccountId) -> Result<(), AppError> {
    let chart = load_chart(&config).await?;
    for line in parent_lines(&chart, &account_id)? {
        println!("{line}");
    }
    Ok(())
}

fn parent_lines(chart: &ChartOfAccounts, account_id: &AccountId) -> Result<Vec<String>, AppError> {
    if chart.find(account_id).is_none() {
        return Err(AppError::AccountNotFound {
            account_id: account_id.clone(),
        });
    }
    Ok(chart
        .reparent_candidates(account_id)
        .into_iter()
        .map(|record| format!("{} {} ({})", record.number, record.name, record.id))
        .collect())
}

async fn cmd_check(config: Config) -> Result<(), AppError> {
    let chart = load_chart(&config).await?;
    let diagnostics = chart.diagnostics();

    for id in &diagnostics.dangling_parents {
        println!("dangling parent: {id}");
    }
    for id in &diagnostics.cycle_roots {
        println!("parent cycle: {id}");
    }
    for id in &diagnostics.duplicate_ids {
        println!("duplicate id: {id}");
    }

    if diagnostics.is_clean() {
        println!("ok: {} accounts", chart.forest().len());
        Ok(())
    } else {
        Err(AppError::Anomalies {
            count: diagnostics.len(),
        })
    }
}

async fn cmd_browse(config: Config) -> Result<(), AppError> {
    let chart = load_chart(&config).await?;
    let source = config.account_source();
    browse(&source, chart).await?;
    Ok(())
}
