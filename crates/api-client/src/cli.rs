//! Command-line interface definition

use clap::{Parser, Subcommand};
use serde_json::Value;
use transport::RequestDescriptor;

/// Call the backend through the session-refreshing client.
///
/// Prints the `{status, message, data}` envelope as JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "api-client")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (falls back to CONFIG_PATH, then api-client.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Send without the stored access credential
    #[arg(long, global = true)]
    pub no_auth: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// GET a path
    Get {
        path: String,
        /// Query parameters as a JSON object
        #[arg(value_parser = parse_json)]
        query: Option<Value>,
    },

    /// DELETE a path
    Delete {
        path: String,
        /// Query parameters as a JSON object
        #[arg(value_parser = parse_json)]
        query: Option<Value>,
    },

    /// POST a JSON body
    Post {
        path: String,
        #[arg(value_parser = parse_json)]
        body: Option<Value>,
    },

    /// PUT a JSON body
    Put {
        path: String,
        #[arg(value_parser = parse_json)]
        body: Option<Value>,
    },

    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(value_parser = parse_json)]
        body: Option<Value>,
    },

    /// Store an access/refresh pair issued by the login endpoint
    Login {
        #[arg(long, env = "API_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        #[arg(long, env = "API_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },

    /// Clear stored credentials
    Logout,

    /// Report session and network state
    Status,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

impl Cli {
    /// Descriptor for the HTTP verb commands; `None` for session commands.
    pub fn request(&self) -> Option<RequestDescriptor> {
        let request = match &self.command {
            Command::Get { path, query } => {
                with(RequestDescriptor::get(path), query.as_ref(), true)
            }
            Command::Delete { path, query } => {
                with(RequestDescriptor::delete(path), query.as_ref(), true)
            }
            Command::Post { path, body } => {
                with(RequestDescriptor::post(path), body.as_ref(), false)
            }
            Command::Put { path, body } => with(RequestDescriptor::put(path), body.as_ref(), false),
            Command::Patch { path, body } => {
                with(RequestDescriptor::patch(path), body.as_ref(), false)
            }
            Command::Login { .. } | Command::Logout | Command::Status => return None,
        };
        Some(request.with_auth(!self.no_auth))
    }
}

fn with(request: RequestDescriptor, payload: Option<&Value>, as_query: bool) -> RequestDescriptor {
    match payload {
        Some(payload) if as_query => request.query(payload.clone()),
        Some(payload) => request.json(payload.clone()),
        None => request,
    }
}
