//! Command Handlers module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info};

use super::ui_builder::create_main_menu_keyboard;
use super::HandlerContext;
use crate::storage::run_blocking;

/// Handle the /start command
pub async fn handle_start_command(
    ctx: &HandlerContext<'_>,
    display_name: &str,
) -> Result<()> {
    let user_id = ctx.user_id;
    let name = display_name.to_string();
    let is_new = run_blocking(&ctx.deps.store, move |store| store.register_user(user_id, &name))
        .await?;
    if is_new {
        info!(user_id = %ctx.user_id, "New user registered");
    }

    let welcome = format!("{}\n\n{}", ctx.t("welcome"), ctx.t("help"));
    ctx.bot
        .send_message(ctx.chat_id, welcome)
        .reply_markup(create_main_menu_keyboard(&ctx.deps.localization, ctx.language))
        .await?;
    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(ctx: &HandlerContext<'_>) -> Result<()> {
    ctx.bot
        .send_message(ctx.chat_id, ctx.t("help"))
        .reply_markup(create_main_menu_keyboard(&ctx.deps.localization, ctx.language))
        .await?;
    Ok(())
}

/// Handle the /stats command (admins only)
pub async fn handle_stats_command(ctx: &HandlerContext<'_>) -> Result<()> {
    if !ctx.deps.store.is_admin(ctx.user_id, ctx.deps.master_admin_id) {
        debug!(user_id = %ctx.user_id, "Non-admin requested /stats");
        ctx.bot.send_message(ctx.chat_id, ctx.t("admin-only")).await?;
        return Ok(());
    }

    let stats = ctx.deps.store.stats();
    let users = stats.users.to_string();
    let reminder_users = stats.reminder_users.to_string();
    let reminders = stats.reminders.to_string();
    let message = ctx.t_args(
        "stats",
        &[
            ("users", users.as_str()),
            ("reminder_users", reminder_users.as_str()),
            ("reminders", reminders.as_str()),
        ],
    );
    ctx.bot.send_message(ctx.chat_id, message).await?;
    Ok(())
}

/// Handle the /addadmin command (master admin only)
pub async fn handle_add_admin_command(
    ctx: &HandlerContext<'_>,
    target: Option<i64>,
) -> Result<()> {
    if ctx.user_id != ctx.deps.master_admin_id {
        debug!(user_id = %ctx.user_id, "Non-master user requested /addadmin");
        ctx.bot.send_message(ctx.chat_id, ctx.t("master-only")).await?;
        return Ok(());
    }

    let Some(target) = target else {
        ctx.bot.send_message(ctx.chat_id, ctx.t("admin-usage")).await?;
        return Ok(());
    };

    run_blocking(&ctx.deps.store, move |store| store.add_admin(target)).await?;
    info!(user_id = %ctx.user_id, new_admin = %target, "Administrator added");

    let target = target.to_string();
    ctx.bot
        .send_message(ctx.chat_id, ctx.t_args("admin-added", &[("user_id", target.as_str())]))
        .await?;
    Ok(())
}

/// Handle unsupported message types
pub async fn handle_unsupported_message(ctx: &HandlerContext<'_>) -> Result<()> {
    debug!(user_id = %ctx.user_id, "Received unsupported message type from user");
    ctx.bot
        .send_message(ctx.chat_id, ctx.t("error-unsupported"))
        .reply_markup(create_main_menu_keyboard(&ctx.deps.localization, ctx.language))
        .await?;
    Ok(())
}
