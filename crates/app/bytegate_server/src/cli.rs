use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bytegate", version, about = "Bytegate identity service and edge gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the identity service (register, login, users).
    Identity(IdentityArgs),
    /// Run the edge gateway in front of the backend services.
    Gateway(GatewayArgs),
}

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8081")]
    pub bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/bytegate"
    )]
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,

    /// Keep identities in memory instead of PostgreSQL. Lost on exit.
    #[arg(long, default_value_t = false)]
    pub in_memory: bool,
}

#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind: String,
}
