use services::AppServices;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::commands::{Command, execute, split_words};

const PROMPT: &str = "study> ";

/// Line-oriented editing loop over stdin.
///
/// Errors are printed and the loop carries on; `quit`, `exit` or end of input
/// leave it. Pending writes are flushed by the caller afterwards.
pub async fn run(services: &mut AppServices) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Study tracker shell. Type `help` for commands.\n")
        .await?;

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match split_words(&line).and_then(|words| Command::parse(&words)) {
            Ok(cmd) => cmd,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match cmd {
            Command::Quit => break,
            Command::Shell => stdout.write_all(b"already in the shell\n").await?,
            cmd => match execute(services, cmd).await {
                Ok(out) => stdout.write_all(out.as_bytes()).await?,
                Err(err) => eprintln!("{err}"),
            },
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
