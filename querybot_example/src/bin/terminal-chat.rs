// Minimal terminal chat against a local QueryBot backend.
//
// Configure with QUERYBOT_API_URL / QUERYBOT_WS_URL / QUERYBOT_TRANSPORT;
// defaults target http://localhost:8000.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

use querybot_session::ChatSession;
use querybot_transport::TransportConfig;
use querybot_types::Role;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = TransportConfig::from_env();
    println!("Connecting to {} ({:?} transport)", config.api_url, config.kind);

    let mut session = ChatSession::new(&config)?;

    if !session.check_backend().await {
        println!("Warning: backend health check failed, messages may not go through");
    }

    println!("Type a message, /upload <path> to stage a file, /clear, or /quit");

    let stdin = io::stdin();
    let mut printed = 0;

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear();
                printed = 0;
                continue;
            }
            _ if line.starts_with("/upload ") => {
                let path = line.trim_start_matches("/upload ").trim();
                match std::fs::read(path) {
                    Ok(bytes) => {
                        let name = std::path::Path::new(path)
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.to_string());
                        session.stage_file(name, mime_for_path(path), bytes);
                        session.upload_staged().await;
                    }
                    Err(e) => println!("Could not read {}: {}", path, e),
                }
            }
            _ => {
                if let Err(e) = session.send_message(line).await {
                    println!("Send failed: {}", e);
                }
            }
        }

        for message in &session.conversation().messages()[printed..] {
            match message.role {
                Role::User => {}
                Role::Assistant => {
                    println!("bot> {}", message.content);
                    for source in message.sources() {
                        println!("     [{} {:.0}%]", source.title, source.similarity * 100.0);
                    }
                }
            }
        }
        printed = session.conversation().messages().len();

        if let Some(error) = session.conversation().error() {
            println!("error: {}", error);
        }
    }

    session.disconnect();
    Ok(())
}

fn mime_for_path(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
