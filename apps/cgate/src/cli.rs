use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cgate", about = "Multi-provider AI chat-completion gateway")]
pub(crate) struct Cli {
    #[arg(long, env = "CGATE_DSN")]
    pub(crate) dsn: Option<String>,
    #[arg(long, env = "CGATE_DATA_DIR")]
    pub(crate) data_dir: Option<String>,
    #[arg(long, env = "CGATE_HOST")]
    pub(crate) host: Option<String>,
    #[arg(long, env = "CGATE_PORT")]
    pub(crate) port: Option<u16>,
    #[arg(long, env = "CGATE_ADMIN_KEY")]
    pub(crate) admin_key: Option<String>,
    #[arg(long, env = "CGATE_PROXY")]
    pub(crate) proxy: Option<String>,
    #[arg(long, env = "CGATE_MEMORY_STORE")]
    pub(crate) memory_store: bool,
}
