//! Terminal confirmation dialog

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokio::sync::Mutex;

use aptos_snap::confirm::{ConfirmationService, DialogResponse, Renderable};
use aptos_snap::error::{Error, Result};

/// Asks on stdin/stdout; one prompt at a time
#[derive(Debug, Default)]
pub struct ConsoleConfirmation {
    prompt_lock: Mutex<()>,
}

impl ConsoleConfirmation {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Map a line typed by the user; `None` is end of input
pub fn parse_answer(line: Option<&str>) -> DialogResponse {
    match line.map(|l| l.trim().to_ascii_lowercase()) {
        None => DialogResponse::Dismissed,
        Some(answer) if answer == "y" || answer == "yes" => DialogResponse::Approved,
        Some(_) => DialogResponse::Denied,
    }
}

fn ask(text: String) -> io::Result<DialogResponse> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout)?;
    write!(stdout, "{}Approve? [y/N] ", text)?;
    stdout.flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    Ok(parse_answer(if read == 0 { None } else { Some(&line) }))
}

#[async_trait]
impl ConfirmationService for ConsoleConfirmation {
    async fn prompt(&self, renderable: &Renderable) -> Result<DialogResponse> {
        let _guard = self.prompt_lock.lock().await;
        let text = renderable.to_string();

        tokio::task::spawn_blocking(move || ask(text))
            .await
            .map_err(|e| Error::Host(format!("confirmation task failed: {}", e)))?
            .map_err(|e| Error::Host(format!("terminal unavailable: {}", e)))
    }

    async fn notify(&self, renderable: &Renderable) -> Result<()> {
        let _guard = self.prompt_lock.lock().await;
        println!("\n{}", renderable);
        Ok(())
    }
}
