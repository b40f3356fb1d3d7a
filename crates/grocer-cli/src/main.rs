//! Grocer CLI - Grocery budget tracker
//!
//! Usage:
//!   grocer init                                  Initialize database
//!   grocer budgets create Weekly --limit 150 ... Create the active budget
//!   grocer items add Apples --price 3.5 -c Produce
//!   grocer serve --port 3000                     Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Budgets { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(BudgetsAction::List) => commands::cmd_budgets_list(&db, user),
                Some(BudgetsAction::Create {
                    name,
                    limit,
                    start,
                    end,
                    allocations,
                }) => commands::cmd_budgets_create(&db, user, &name, limit, &start, &end, &allocations),
                Some(BudgetsAction::Show { id }) => commands::cmd_budgets_show(&db, user, id),
                Some(BudgetsAction::Update {
                    id,
                    name,
                    limit,
                    activate,
                    deactivate,
                }) => {
                    let is_active = match (activate, deactivate) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    };
                    commands::cmd_budgets_update(&db, user, id, name, limit, is_active)
                }
                Some(BudgetsAction::Allocate { id, allocations }) => {
                    commands::cmd_budgets_allocate(&db, user, id, &allocations)
                }
                Some(BudgetsAction::Delete { id }) => commands::cmd_budgets_delete(&db, user, id),
                Some(BudgetsAction::Active) => commands::cmd_budgets_active(&db, user),
            }
        }
        Commands::Items { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_items_list(&db, user, None, None, None, 20),
                Some(ItemsAction::List {
                    budget,
                    category,
                    essential,
                    non_essential,
                    limit,
                }) => {
                    let essential = match (essential, non_essential) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    };
                    commands::cmd_items_list(&db, user, budget, category.as_deref(), essential, limit)
                }
                Some(ItemsAction::Add {
                    name,
                    price,
                    category,
                    quantity,
                    budget,
                    essential,
                    date,
                    notes,
                }) => commands::cmd_items_add(
                    &db,
                    user,
                    commands::ItemArgs {
                        name,
                        price,
                        category,
                        quantity,
                        budget,
                        essential,
                        date,
                        notes,
                    },
                ),
                Some(ItemsAction::Update {
                    id,
                    name,
                    price,
                    quantity,
                    category,
                    essential,
                    date,
                    notes,
                }) => commands::cmd_items_update(
                    &db,
                    user,
                    id,
                    commands::ItemChanges {
                        name,
                        price,
                        quantity,
                        category,
                        essential,
                        date,
                        notes,
                    },
                ),
                Some(ItemsAction::Delete { id }) => commands::cmd_items_delete(&db, user, id),
                Some(ItemsAction::Import { file, budget }) => {
                    commands::cmd_items_import(&db, user, &file, budget)
                }
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db, user),
                Some(CategoriesAction::Add {
                    name,
                    icon,
                    color,
                    parent,
                }) => commands::cmd_categories_add(
                    &db,
                    user,
                    &name,
                    icon.as_deref(),
                    color.as_deref(),
                    parent.as_deref(),
                ),
                Some(CategoriesAction::Delete { name_or_id }) => {
                    commands::cmd_categories_delete(&db, user, &name_or_id)
                }
            }
        }
        Commands::Tips { budget } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_tips(&db, user, budget)
        }
        Commands::Compare { budget, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_compare(&db, user, budget, json)
        }
        Commands::Trends { days, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_trends(&db, user, days, json)
        }
        Commands::Export {
            kind,
            budget,
            output,
            from,
            to,
            category,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_export(
                &db,
                user,
                &kind,
                budget,
                output.as_deref(),
                from.as_deref(),
                to.as_deref(),
                category.as_deref(),
            )
        }
        Commands::Activity {
            summary,
            days,
            action,
            limit,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            if summary {
                commands::cmd_activity_summary(&db, user, days)
            } else {
                commands::cmd_activity(&db, user, action.as_deref(), limit)
            }
        }
    }
}
