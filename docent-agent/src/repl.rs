//! The interactive question loop.
//!
//! Reads one query per line from stdin. The `exit` sentinel (any case) and
//! end of input both terminate the session; blank lines are ignored.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::AnswerAgent;

const BANNER: &str = "Start asking questions! Type 'exit' to quit.";
const GOODBYE: &str = "Exiting the system. Goodbye!";

/// Run the loop until the user exits or stdin closes.
pub async fn run_loop(agent: &AnswerAgent) -> Result<()> {
    println!("{BANNER}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nyou> ");
        std::io::stdout().flush().context("flushing prompt")?;

        let Some(line) = lines.next_line().await.context("reading from stdin")? else {
            // Ctrl-D.
            println!("\n{GOODBYE}");
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") {
            println!("\n{GOODBYE}");
            break;
        }

        let response = agent.respond(query).await;
        println!("\n{response}");
    }
    Ok(())
}
