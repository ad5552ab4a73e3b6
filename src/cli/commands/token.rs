use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "Subject (external user id)")]
    pub sub: String,

    #[arg(long, help = "Email claim")]
    pub email: String,

    #[arg(long, help = "Given name claim")]
    pub first_name: Option<String>,

    #[arg(long, help = "Family name claim")]
    pub last_name: Option<String>,

    #[arg(long, default_value_t = 24, help = "Validity in hours")]
    pub hours: i64,
}

pub fn handle(args: TokenArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    if args.hours <= 0 {
        anyhow::bail!("--hours must be positive");
    }

    let mut claims = Claims::new(args.sub, args.email, chrono::Duration::hours(args.hours));
    claims.given_name = args.first_name;
    claims.family_name = args.last_name;
    claims.iss = config.security.jwt_issuer.clone();

    let token = generate_jwt(&config.security, &claims)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            "Token generated",
            Some(json!({ "token": token, "expires_at": claims.exp })),
        ),
    }
}
