use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "autoresponder")]
#[command(about = "Email auto-responder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config, prompt templates, emotki/ and pdf/ directories).
    Init {
        /// Config file path (default: AUTORESPONDER_CONFIG_PATH or ~/.autoresponder/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook gateway (GET / health, POST /webhook).
    Serve {
        /// Config file path (default: AUTORESPONDER_CONFIG_PATH or ~/.autoresponder/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config, PORT, or 10000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Answer one message read from stdin and print the reply payload as JSON.
    Reply {
        /// Config file path (default: AUTORESPONDER_CONFIG_PATH or ~/.autoresponder/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Sender address
        #[arg(long, value_name = "EMAIL", default_value = "")]
        from: String,

        /// Message subject
        #[arg(long, default_value = "")]
        subject: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("autoresponder {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Reply {
            config,
            from,
            subject,
        }) => {
            if let Err(e) = run_reply(config, from, subject).await {
                log::error!("reply failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(responder::config::default_config_path);
    let dir = responder::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = responder::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    responder::gateway::run_gateway(config, path).await
}

async fn run_reply(
    config_path: Option<PathBuf>,
    from: String,
    subject: String,
) -> anyhow::Result<()> {
    let (config, path) = responder::config::load_config(config_path)?;
    let mut body = String::new();
    std::io::stdin().read_to_string(&mut body)?;
    let pipeline = responder::pipeline::Pipeline::from_config(Arc::new(config), &path);
    let message = responder::pipeline::InboundMessage {
        sender: from,
        subject,
        body,
    };
    let response = pipeline.respond(&message).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
