use engine::{
    GridStore, RepositoryError, Transaction, TransactionRepository, parse_transaction_input,
};
use teloxide::{
    prelude::*,
    types::{MessageId, ReactionType},
};

use crate::ConfigParameters;

const REACTION_OK: &str = "👌";
const REACTION_FAIL: &str = "🤷‍♂";

pub(crate) async fn handle_message<S: GridStore + 'static>(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters<S>,
) -> ResponseResult<()> {
    if !is_allowed(cfg.allowed_users.as_deref(), msg.from.as_ref().map(|u| u.id)) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(cmd) = parse_command(text) else {
        let stored = store_transaction(&msg, &cfg, text, false).await;
        acknowledge(&bot, &msg, stored).await;
        return Ok(());
    };

    match cmd {
        Command::Start | Command::Help => {
            bot.send_message(msg.chat.id, help_text()).await?;
        }
        Command::Remove => match msg.reply_to_message() {
            Some(target) => remove_transaction(&bot, &msg, target.id, &cfg).await,
            None => {
                bot.send_message(msg.chat.id, "Reply with /remove to the expense to delete.")
                    .await?;
            }
        },
        Command::Unknown => {
            bot.send_message(msg.chat.id, "Unknown command, use /help")
                .await?;
        }
    }
    Ok(())
}

pub(crate) async fn handle_edited_message<S: GridStore + 'static>(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters<S>,
) -> ResponseResult<()> {
    if !is_allowed(cfg.allowed_users.as_deref(), msg.from.as_ref().map(|u| u.id)) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Editing a command does not run it again.
    if parse_command(text).is_some() {
        return Ok(());
    }

    let stored = store_transaction(&msg, &cfg, text, true).await;
    acknowledge(&bot, &msg, stored).await;
    Ok(())
}

/// Parses `text` and stores it under the id of `msg`. Edits replace the
/// stored row, or insert one when the message was never stored before.
async fn store_transaction<S: GridStore + 'static>(
    msg: &Message,
    cfg: &ConfigParameters<S>,
    text: &str,
    edited: bool,
) -> bool {
    let input = match parse_transaction_input(text) {
        Ok(input) => input,
        Err(err) => {
            tracing::debug!(%err, message_id = msg.id.0, "message is not an expense");
            return false;
        }
    };

    let transaction = Transaction::from_input(input, msg.id.0.to_string(), msg.date);
    let result = if edited {
        save_edited(&cfg.repository, &transaction).await
    } else {
        cfg.repository.insert(&transaction).await
    };

    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%err, message_id = msg.id.0, edited, "failed to store expense");
            false
        }
    }
}

/// Rewrites the row of an edited message. A message that was never stored,
/// e.g. one that did not parse before the edit, is inserted instead.
async fn save_edited<S: GridStore>(
    repository: &TransactionRepository<S>,
    transaction: &Transaction,
) -> Result<(), RepositoryError> {
    match repository.update(transaction).await {
        Err(RepositoryError::TransactionNotFound(_)) => {
            tracing::warn!(
                message_id = %transaction.message_id,
                "edited transaction not stored yet, inserting"
            );
            repository.insert(transaction).await
        }
        other => other,
    }
}

async fn remove_transaction<S: GridStore + 'static>(
    bot: &Bot,
    msg: &Message,
    target: MessageId,
    cfg: &ConfigParameters<S>,
) {
    match cfg
        .repository
        .delete_by_message_id(&target.0.to_string())
        .await
    {
        Ok(()) => {
            if let Err(err) = bot.delete_message(msg.chat.id, target).await {
                tracing::warn!(
                    %err,
                    message_id = target.0,
                    "failed to delete removed message"
                );
            }
        }
        Err(err @ RepositoryError::TransactionNotFound(_)) => {
            tracing::info!(%err, "nothing to remove");
            acknowledge(bot, msg, false).await;
        }
        Err(err) => {
            tracing::warn!(%err, message_id = target.0, "failed to remove expense");
            acknowledge(bot, msg, false).await;
        }
    }
}

/// Reacts on `msg` with the outcome. A failed reaction is only logged.
async fn acknowledge(bot: &Bot, msg: &Message, ok: bool) {
    let emoji = if ok { REACTION_OK } else { REACTION_FAIL };
    let reaction = ReactionType::Emoji {
        emoji: emoji.to_string(),
    };

    if let Err(err) = bot
        .set_message_reaction(msg.chat.id, msg.id)
        .reaction(vec![reaction])
        .await
    {
        tracing::warn!(%err, message_id = msg.id.0, "failed to acknowledge message");
    }
}

fn is_allowed(allowed_users: Option<&[UserId]>, from: Option<UserId>) -> bool {
    let Some(from) = from else {
        return false;
    };
    match allowed_users {
        None => true,
        Some(ids) => ids.contains(&from),
    }
}

fn parse_command(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let cmd = trimmed.split_whitespace().next().unwrap_or("");
    // In groups commands may carry the bot name: `/remove@telemoney_bot`.
    let cmd = cmd.split_once('@').map_or(cmd, |(cmd, _)| cmd);

    match cmd {
        "/start" => Some(Command::Start),
        "/help" => Some(Command::Help),
        "/remove" => Some(Command::Remove),
        _ => Some(Command::Unknown),
    }
}

fn help_text() -> &'static str {
    "Send an expense as:\n\n<amount> <category> [(tag, tag)] [comment]\n\n\
     9,5 lunch\n9.5 lunch (grenka, dumplings) I need food!\n\n\
     Edit the message to change the expense. Reply /remove to an expense to delete it."
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Remove,
    Unknown,
}
