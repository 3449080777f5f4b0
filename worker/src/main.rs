use std::{env, io, net::SocketAddr};

use log::info;
use tokio::{
    net::{TcpListener, TcpStream},
    signal,
};

use worker::board::{self, NoticeBoard};

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    if env::var("MODE").is_ok_and(|mode| mode == "board") {
        info!("running as notice board");

        tokio::select! {
            ret = NoticeBoard::new().listen(listener) => ret?,
            _ = signal::ctrl_c() => info!("received SIGTERM"),
        }

        return Ok(());
    }

    if let Ok(board_addr) = env::var("BOARD") {
        let advertised: SocketAddr = match env::var("ADVERTISE") {
            Ok(advertised) => advertised.parse().map_err(io::Error::other)?,
            Err(_) => listener.local_addr()?,
        };

        let stream = TcpStream::connect(&board_addr).await?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);
        board::register(&mut rx, &mut tx, advertised).await?;
        info!("registered at notice board {board_addr} as {advertised}");
    }

    let (stream, peer) = listener.accept().await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    info!("orchestrator connected from {peer}");

    tokio::select! {
        ret = worker::serve(rx, tx) => {
            ret?;
            info!("wrapping up, disconnecting...");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
