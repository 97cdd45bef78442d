use std::env;
use std::error::Error;

use chat_protocol::line_codec::{format_input_line, parse_input_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Where to connect: env override or default.
    let addr = env::var("CHAT_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9000".to_string());

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    println!("Connected.");
    println!("Type commands like:");
    println!("  J, Alice          (join the lobby as Alice)");
    println!("  J, Alice, rust    (join or move to group 'rust')");
    println!("  M, hello all      (message your group)");
    println!("  D, Bob, hi Bob    (direct message)");
    println!("Type 'quit' or 'exit' to leave.\n");

    let (read_half, mut write_half) = stream.into_split();

    // Print everything the server sends as it arrives.
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("<< {}", line);
        }
        println!("Server closed the connection.");
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event = if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            chat_core::InboundEvent::Disconnect
        } else {
            match parse_input_line(trimmed) {
                Some(event) => event,
                None => {
                    eprintln!("Could not parse line. Check the command format.");
                    continue;
                }
            }
        };

        let leaving = event == chat_core::InboundEvent::Disconnect;
        let mut data = format_input_line(&event);
        data.push('\n');
        write_half.write_all(data.as_bytes()).await?;

        if leaving {
            break;
        }
    }

    write_half.shutdown().await?;
    reader.await?;
    println!("Exiting client.");
    Ok(())
}
