//! chat-embed - terminal host for one chat widget session
//!
//! Reads questions from stdin and prints the conversation as plain text.
//! `/clear` starts over, `/import` pulls the remote message log, `/quit` exits.

use chat_embed::{
    LoggingTransport, Message, MessageGateway, ReqwestTransport, Role, SessionContext,
    SessionController, SqliteRecordStore, SubmitOutcome, WidgetConfig,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_embed=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = WidgetConfig::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!(path = %config.db_path.display(), "Opening record store");
    let store = SqliteRecordStore::open(&config.db_path)?;

    let transport = LoggingTransport::new(ReqwestTransport::new(config.request_timeout)?);
    let gateway = MessageGateway::new(transport, config.base_url.as_str());
    let mut controller =
        SessionController::mount(SessionContext::from_config(&config), store, gateway).await;

    tracing::info!(
        chatflow_id = %config.chatflow_id,
        chat_id = %controller.chat_id(),
        messages = controller.history().len(),
        "Session ready"
    );
    print_messages(controller.history());
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                controller.clear().await;
                print_messages(controller.history());
            }
            "/history" => print_messages(controller.history()),
            "/import" => match controller.import_remote_history().await {
                Ok(_) => print_messages(controller.history()),
                Err(e) => println!("could not fetch remote history: {}", e.describe()),
            },
            _ => {
                let before = controller.history().len();
                match controller.submit(&line).await {
                    SubmitOutcome::Ignored => {}
                    SubmitOutcome::Busy => println!("still waiting for the previous answer"),
                    SubmitOutcome::Answered | SubmitOutcome::Failed | SubmitOutcome::Discarded => {
                        // The question itself is already on screen
                        let history = controller.history();
                        if let Some(new) = history.get(before + 1..) {
                            print_messages(new);
                        }
                    }
                }
                if controller.persistence_degraded() {
                    println!("(history is not being saved)");
                }
            }
        }
        prompt()?;
    }

    controller.flush_mirrors().await;
    controller.unmount().await;
    Ok(())
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        match message.role {
            Role::User => println!("you> {}", message.content),
            Role::Api => {
                println!("bot> {}", message.content);
                for doc in message.display_sources() {
                    println!("     [source] {}", doc.label());
                }
            }
            Role::Waiting => {}
        }
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
