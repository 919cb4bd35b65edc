//! Database seed script for a fresh guestbook
//! Run with: cargo run --bin seed

use guestbook_service::config::Config;
use guestbook_service::db::{self, RootFilter};
use guestbook_service::models::{MessageStatus, NewMessage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Connecting to database...");
    let store = db::connect(&config.database).await?;
    store.ensure_schema().await?;
    println!("Connected successfully!");

    let existing = store.count_roots(&RootFilter::default()).await?;
    if existing > 0 {
        println!("Guestbook already has {} messages, skipping seed", existing);
        return Ok(());
    }

    let welcome = store
        .insert(NewMessage {
            name: config.admin.display_name.clone(),
            email: None,
            body: "Welcome to the guestbook! Leave us a message.".to_string(),
            language: "global".to_string(),
            parent_id: None,
            is_admin_reply: false,
            status: MessageStatus::Approved,
            ip: None,
        })
        .await?;

    let sample = store
        .insert(NewMessage {
            name: "Test User".to_string(),
            email: Some("test@example.com".to_string()),
            body: "This is a test message.".to_string(),
            language: "global".to_string(),
            parent_id: None,
            is_admin_reply: false,
            status: MessageStatus::Approved,
            ip: None,
        })
        .await?;

    let reply = store
        .insert(NewMessage {
            name: config.admin.display_name.clone(),
            email: None,
            body: "Thanks for stopping by!".to_string(),
            language: sample.language.clone(),
            parent_id: Some(sample.id),
            is_admin_reply: true,
            status: MessageStatus::Approved,
            ip: None,
        })
        .await?;

    println!("\n========================================");
    println!("Guestbook seeded");
    println!("========================================");
    println!("Welcome message: #{}", welcome.id);
    println!("Sample message:  #{}", sample.id);
    println!("Admin reply:     #{}", reply.id);

    Ok(())
}
