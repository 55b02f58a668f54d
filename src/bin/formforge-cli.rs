use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formforge-cli")]
#[command(about = "Management CLI for the FormForge admin API", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FORMFORGE_ADMIN_URL", default_value = "http://127.0.0.1:8001")]
    url: String,

    #[arg(short, long, env = "FORMFORGE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status
    Status,
    /// List forms with submission counts
    Forms,
    /// Create a form and print its public id
    CreateForm {
        #[arg(long)]
        name: String,
        /// "*" or a comma-delimited list of origins
        #[arg(long, default_value = "*")]
        allowed_origins: String,
        #[arg(long)]
        redirect_url: Option<String>,
        #[arg(long)]
        notification_email: Option<String>,
    },
    /// Change settings of an existing form
    UpdateForm {
        form_id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        allowed_origins: Option<String>,
        /// Pass an empty string to clear
        #[arg(long)]
        redirect_url: Option<String>,
        /// Pass an empty string to clear
        #[arg(long)]
        notification_email: Option<String>,
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        #[arg(long)]
        inactive: bool,
    },
    /// Delete a form and all of its submissions
    DeleteForm { form_id: u64 },
    /// Download a form's submissions as CSV
    Export {
        form_id: u64,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Page through a form's submissions
    Submissions {
        form_id: u64,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        per_page: usize,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        include_spam: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")).send().await?,
        Commands::Forms => client.get(format!("{base}/admin/forms")).send().await?,
        Commands::CreateForm {
            name,
            allowed_origins,
            redirect_url,
            notification_email,
        } => {
            let body = serde_json::json!({
                "name": name,
                "allowed_origins": allowed_origins,
                "redirect_url": redirect_url,
                "notification_email": notification_email,
            });
            client
                .post(format!("{base}/admin/forms"))
                .json(&body)
                .send()
                .await?
        }
        Commands::UpdateForm {
            form_id,
            name,
            allowed_origins,
            redirect_url,
            notification_email,
            active,
            inactive,
        } => {
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".into(), Value::from(name));
            }
            if let Some(origins) = allowed_origins {
                body.insert("allowed_origins".into(), Value::from(origins));
            }
            if let Some(url) = redirect_url {
                body.insert("redirect_url".into(), clearable(url));
            }
            if let Some(email) = notification_email {
                body.insert("notification_email".into(), clearable(email));
            }
            if active || inactive {
                body.insert("is_active".into(), Value::from(active));
            }
            client
                .put(format!("{base}/admin/forms/{form_id}"))
                .json(&body)
                .send()
                .await?
        }
        Commands::DeleteForm { form_id } => {
            client
                .delete(format!("{base}/admin/forms/{form_id}"))
                .send()
                .await?
        }
        Commands::Export { form_id, output } => {
            let res = client
                .get(format!("{base}/admin/forms/{form_id}/export.csv"))
                .send()
                .await?;
            let res = check_status(res).await;
            let csv = res.bytes().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &csv)?;
                    eprintln!("Wrote {} bytes to {}", csv.len(), path.display());
                }
                None => print!("{}", String::from_utf8_lossy(&csv)),
            }
            return Ok(());
        }
        Commands::Submissions {
            form_id,
            page,
            per_page,
            search,
            include_spam,
        } => {
            let mut query = vec![
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("include_spam", include_spam.to_string()),
            ];
            if let Some(search) = search {
                query.push(("search", search));
            }
            client
                .get(format!("{base}/admin/forms/{form_id}/submissions"))
                .query(&query)
                .send()
                .await?
        }
    };

    print_response(res).await
}

fn clearable(value: String) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::from(value)
    }
}

/// Exit with the error body on a non-success status.
async fn check_status(res: reqwest::Response) -> reqwest::Response {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        std::process::exit(1);
    }
    res
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let res = check_status(res).await;
    if res.status() == reqwest::StatusCode::NO_CONTENT {
        println!("Done");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
