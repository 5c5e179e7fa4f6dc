//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled              |
//! |------------|-------------------------------|
//! | `project`  | `Init`                        |
//! | `config`   | `Config`                      |
//! | `auth`     | `Login`, `Logout`             |
//! | `board`    | `Board`, `Move`               |
//! | `deals`    | `Deals`, `History`            |
//! | `clients`  | `Clients`                     |
//! | `payments` | `Payments`                    |
//! | `actions`  | `Actions`                     |
//! | `users`    | `Users`                       |
//! | `stats`    | `Stats`                       |

pub mod actions;
pub mod auth;
pub mod board;
pub mod clients;
pub mod config;
pub mod deals;
pub mod payments;
pub mod project;
pub mod stats;
pub mod users;

pub use actions::cmd_actions;
pub use auth::{cmd_login, cmd_logout};
pub use board::{cmd_board, cmd_move};
pub use clients::cmd_clients;
pub use config::cmd_config;
pub use deals::{cmd_deals, cmd_history};
pub use payments::cmd_payments;
pub use project::cmd_init;
pub use stats::cmd_stats;
pub use users::cmd_users;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Service timestamps are naive UTC.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Ask before a destructive action unless `force` is set.
fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    let answer = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(answer)
}
