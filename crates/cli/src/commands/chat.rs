//! `curalink chat`: Interactive consultation chat.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use curalink_core::SystemClock;
use curalink_session::{ChatSession, DoctorResponder, FlowResponder, SimulatedResponder};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_flows, load_config};

const GREETING: &str = "Hello! I'm your CuraLink doctor. How can I help you today?";

pub async fn run(simulated: bool) -> Result<()> {
    let responder: Arc<dyn DoctorResponder> = if simulated {
        Arc::new(SimulatedResponder::new(Arc::new(SystemClock)))
    } else {
        let config = load_config()?;
        Arc::new(FlowResponder::new(build_flows(&config)?))
    };
    let mut session = ChatSession::with_greeting(responder, GREETING);

    println!();
    println!("  CuraLink Consultation - {} doctor", session.responder_name());
    println!("  Type 'exit' or Ctrl+D to end the session.");
    println!();
    println!("  Doctor > {GREETING}");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if !line.is_empty() {
            eprint!("  ...");
            match session.send(line).await {
                Ok(turn) => {
                    eprint!("\r     \r");
                    println!("  Doctor > {}", turn.text);
                }
                Err(e) => {
                    eprint!("\r     \r");
                    eprintln!("  [Error] {e}");
                }
            }
            println!();
        }
        prompt()?;
    }

    println!();
    println!("  Session ended ({} messages).", session.history().len());
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
