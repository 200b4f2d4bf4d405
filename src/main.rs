use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use worklink::{
    AppResult,
    cli::Cli,
    config::Config,
    init_logging,
    session::{ClientAction, ClientEvent, CommandRouter, SessionClient},
    workspace::{Role, StateChange},
};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(&cli.effective_log_level())?;

    tracing::info!("Worklink workspace client starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    // Load configuration
    let mut config = Config::load_or_default(&cli.config_file);
    if let Some(url) = &cli.server_url {
        config.server.ws_url = url.clone();
    }
    config.validate()?;

    let mut client = SessionClient::new(config);
    let actions = client.action_sender();
    let mut events = client.event_receiver().expect("event receiver taken once");

    // Render client events to the terminal
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            render_event(event);
        }
    });

    // Translate stdin lines into client actions
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match CommandRouter::parse(&line) {
                Ok(Some(action)) => {
                    let quitting = action == ClientAction::Quit;
                    if actions.send(action).is_err() || quitting {
                        break;
                    }
                }
                Ok(None) => {}
                Err(usage) => println!("{}", usage.yellow()),
            }
        }
    });

    client.run().await?;

    Ok(())
}

fn render_event(event: ClientEvent) {
    match event {
        ClientEvent::StatusChanged { status } => {
            println!("{}", format!("[connection: {:?}]", status).dimmed());
        }
        ClientEvent::ConnectFailed { error } => {
            println!("{}", format!("connect failed: {} (retrying)", error).yellow());
        }
        ClientEvent::ActionRejected { error } => {
            println!("{}", format!("rejected: {}", error).yellow());
        }
        ClientEvent::TranscriptCleared => {
            println!("{}", "[transcript cleared]".dimmed());
        }
        ClientEvent::StatusReport { report } => {
            println!("connection: {:?}", report.connection);
            println!("session:    {}", report.session_id.as_deref().unwrap_or("-"));
            println!(
                "open files: {} ({} dirty)",
                report.open_files, report.dirty_files
            );
            println!("transcript: {} entries", report.transcript_len);
            if let Some(id) = report.pending_approval {
                println!("pending approval: {}", id.yellow());
            }
        }
        ClientEvent::StateChanged { change } => render_state_change(change),
    }
}

fn render_state_change(change: StateChange) {
    match change {
        StateChange::SessionJoined { session_id } => {
            println!("{}", format!("joined session {}", session_id).green());
        }
        StateChange::TranscriptAppended { entry } => {
            let prefix = match entry.role {
                Role::User => "you>".cyan(),
                Role::Assistant => "assistant>".green(),
                Role::Error => "error>".red(),
            };
            println!("{} {}", prefix, entry.text);
        }
        StateChange::TypingChanged { typing } => {
            if typing {
                println!("{}", "assistant is typing...".dimmed());
            }
        }
        StateChange::ListingReplaced { listing } => {
            println!("{}", listing.path.bold());
            for entry in &listing.entries {
                if entry.is_directory {
                    println!("  {}/", entry.name.blue());
                } else {
                    println!("  {}", entry.name);
                }
            }
        }
        StateChange::StaleListingDropped { path } => {
            println!("{}", format!("[ignored stale listing for {}]", path).dimmed());
        }
        StateChange::FileOpened { path, content } => {
            println!("{}", format!("opened {}", path).bold());
            println!("{}", content);
        }
        StateChange::ApprovalRequested {
            command,
            command_id,
        } => {
            println!(
                "{}",
                format!("approval required [{}]: {}", command_id, command).yellow()
            );
            println!("{}", "  respond with /approve, /reject, or /modify".dimmed());
        }
        StateChange::ApprovalReplaced {
            dropped_id,
            command,
            command_id,
        } => {
            println!(
                "{}",
                format!(
                    "warning: approval {} superseded before resolution",
                    dropped_id
                )
                .yellow()
            );
            println!(
                "{}",
                format!("approval required [{}]: {}", command_id, command).yellow()
            );
        }
    }
}
