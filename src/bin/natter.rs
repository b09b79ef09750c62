// ABOUTME: Interactive chat client binary
// ABOUTME: Reads commands from stdin and drives one or more client connections

use argh::FromArgs;
use indexmap::IndexMap;
use natter::client::{Broadcast, ChatClient, ChatConnection, DefaultClient};
use natter::message::tags;
use natter::{Server, frame::Frame};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const HELP: &str = "\
commands: /connect [addr [port]] | /disconnect | /active [name]
protocol: #identify <name> | #echo <text> | #create_room <room> | #list_rooms
          #join_room <room> | #leave_room <room> | #room_members <room>
          #msg_room <room> <text> | #msg_client <name> <text>";

/// Interactive chat client
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the server address (default: 127.0.0.1)
    #[argh(option, default = "String::from(\"127.0.0.1\")")]
    addr: String,

    /// the server port (default: 13180)
    #[argh(option, default = "13180")]
    port: u16,

    /// start an in-process server on addr:port first
    #[argh(switch, short = 's')]
    server: bool,
}

struct Repl {
    addr: String,
    port: u16,
    connections: IndexMap<String, DefaultClient>,
    active: Option<String>,
    next_conn: usize,
}

impl Repl {
    fn new(addr: String, port: u16) -> Repl {
        Repl {
            addr,
            port,
            connections: IndexMap::new(),
            active: None,
            next_conn: 0,
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if let Some(rest) = line.strip_prefix('/') {
            self.control_command(rest).await;
        } else if let Some(rest) = line.strip_prefix('#') {
            self.protocol_command(rest).await;
        } else {
            println!("{HELP}");
        }
    }

    async fn control_command(&mut self, rest: &str) {
        let mut words = rest.split_whitespace();
        match words.next() {
            Some("connect") => {
                let addr = words.next().unwrap_or(&self.addr).to_string();
                let port = match words.next() {
                    Some(word) => match word.parse::<u16>() {
                        Ok(port) => port,
                        Err(_) => {
                            println!("bad port: {word}");
                            return;
                        }
                    },
                    None => self.port,
                };
                self.connect(addr, port).await;
            }
            Some("disconnect") => self.disconnect_active().await,
            Some("active") => match words.next() {
                Some(name) => {
                    if self.connections.contains_key(name) {
                        self.active = Some(name.to_string());
                        println!("active: {name}");
                    } else {
                        println!("no such connection: {name}");
                    }
                }
                None => {
                    for name in self.connections.keys() {
                        let marker = if self.active.as_deref() == Some(name.as_str()) {
                            "*"
                        } else {
                            " "
                        };
                        println!("{marker} {name}");
                    }
                }
            },
            _ => println!("{HELP}"),
        }
    }

    async fn connect(&mut self, addr: String, port: u16) {
        match DefaultClient::connect((addr.as_str(), port)).await {
            Ok(mut client) => {
                client.add_handler(tags::BROADCAST, print_broadcast);
                client.add_handler(tags::CLIENT_MSG, print_client_msg);
                let name = format!("conn{}", self.next_conn);
                self.next_conn += 1;
                println!("{name}: connected to {addr}:{port}");
                self.connections.insert(name.clone(), client);
                self.active = Some(name);
            }
            Err(err) => println!("connect failed: {err}"),
        }
    }

    async fn disconnect_active(&mut self) {
        let Some(name) = self.active.take() else {
            println!("no active connection");
            return;
        };
        if let Some(mut client) = self.connections.shift_remove(&name) {
            if let Err(err) = client.disconnect().await {
                println!("disconnect failed: {err}");
            } else {
                println!("{name}: disconnected");
            }
        }
        self.active = self.connections.keys().next_back().cloned();
    }

    async fn protocol_command(&mut self, rest: &str) {
        let (verb, args) = match rest.split_once(' ') {
            Some((verb, args)) => (verb, args.trim()),
            None => (rest, ""),
        };

        let Some(name) = self.active.clone() else {
            println!("no active connection; /connect first");
            return;
        };
        let Some(client) = self.connections.get_mut(&name) else {
            return;
        };

        match verb {
            "identify" => report(client.identify(args).await.map(|_| "identified".to_string())),
            "echo" => report(client.echo(args).await),
            "create_room" => report(client.create_room(args).await.map(|_| "created".to_string())),
            "list_rooms" => report(client.list_rooms().await.map(|rooms| rooms.join("\n"))),
            "join_room" => report(client.join_room(args).await.map(|_| "joined".to_string())),
            "leave_room" => report(client.leave_room(args).await.map(|_| "left".to_string())),
            "room_members" => report(client.room_members(args).await.map(|names| names.join("\n"))),
            "msg_room" => match args.split_once(' ') {
                Some((room, text)) => {
                    report(client.msg_room(room, text).await.map(|outcome| format!("{outcome:?}")))
                }
                None => println!("usage: #msg_room <room> <text>"),
            },
            "msg_client" => match args.split_once(' ') {
                Some((target, text)) => report(
                    client
                        .msg_client(target, text)
                        .await
                        .map(|outcome| format!("{outcome:?}")),
                ),
                None => println!("usage: #msg_client <name> <text>"),
            },
            _ => println!("{HELP}"),
        }
    }

    async fn shutdown(mut self) {
        for (_, mut client) in self.connections.drain(..) {
            let _ = client.disconnect().await;
        }
    }
}

fn report<T: std::fmt::Display>(result: natter::ClientResult<T>) {
    match result {
        Ok(value) => println!("{value}"),
        Err(err) => println!("error: {err}"),
    }
}

fn print_broadcast(frame: &Frame) {
    let msg = Broadcast::from(frame);
    println!("[{}] {}: {}", msg.room, msg.sender, frame.str_payload());
}

fn print_client_msg(frame: &Frame) {
    println!("{} -> you: {}", frame.str_header(), frame.str_payload());
}

#[tokio::main]
async fn main() -> natter::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if cli_args.server {
        let listener = TcpListener::bind((cli_args.addr.as_str(), cli_args.port)).await?;
        info!("serving on {}", listener.local_addr()?);
        tokio::spawn(Server::new().run(listener));
    }

    let mut repl = Repl::new(cli_args.addr, cli_args.port);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => repl.handle_line(&line).await,
                None => break,
            },
        }
    }

    repl.shutdown().await;
    Ok(())
}
