//! Main devdine command line entry points
use crate::{
    client::ApiClient,
    paths::config_file,
    session::ClientSessionState,
    settings::Settings,
};
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use devdine_core::{
    common::OrderType,
    email::{Email, EmailPolicy},
    otp_code::OtpCode,
};
use inquire::{ui::RenderConfig, validator::Validation, CustomUserError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "devdine", version)]
#[command(about = "Verify your email and start an order from the command line")]
pub struct Cli {
    /// Path to a settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Address of the devdine server, overrides the settings")]
    api_endpoint: Option<Url>,
    #[arg(long, help = "Whether to turn off ansi terminal colors")]
    no_colors: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify your email address, register and pick an order type
    Start,
    /// Show the stored session and the matching server record
    Session,
    /// Forget the stored session
    Reset,
    /// Print file paths used by the application (e.g. the path to config)
    Paths,
}

impl Cli {
    /// Run the selected command
    pub async fn run(&self, mut settings: Settings) -> Result<()> {
        let ansi = !self.no_colors;
        setup_tracing(ansi);

        if let Some(api_endpoint) = &self.api_endpoint {
            settings.api_endpoint = api_endpoint.clone();
        }

        match &self.command {
            Commands::Start => {
                let state = CliState::load(&settings, ansi);
                let session = state.start().await?;

                tracing::info!(email = %session.email, order_type = ?session.order_type, "Session saved");
            }
            Commands::Session => {
                let state = CliState::load(&settings, ansi);
                state.show_session().await?;
            }
            Commands::Reset => {
                if ClientSessionState::clear(&settings.session_file)? {
                    println!("Forgot your session.");
                } else {
                    println!("There was no session to forget.");
                }
            }
            Commands::Paths => {
                println!("{}", config_file()?.display());
                println!("{}", settings.session_file.display());
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct CliState<'s> {
    pub(crate) settings: &'s Settings,
    pub(crate) render_config: RenderConfig,
    pub(crate) email_policy: EmailPolicy,
    pub(crate) client: ApiClient,
}

impl<'s> CliState<'s> {
    fn load(settings: &'s Settings, colors: bool) -> CliState<'s> {
        let render_config = if colors {
            RenderConfig::default_colored()
        } else {
            RenderConfig::empty()
        };

        Self {
            settings,
            render_config,
            email_policy: settings.email_policy(),
            client: ApiClient::new(settings.api_endpoint.clone()),
        }
    }

    async fn start(&self) -> Result<ClientSessionState> {
        let previous = ClientSessionState::load(&self.settings.session_file)?;

        let (name, email) = self.prompt_identity(previous.as_ref())?;
        let mut session = ClientSessionState::new(name, email);

        self.issue_code(&session.email).await?;
        self.verify_loop(&session.email).await?;

        session.mark_verified(Utc::now());
        session.save(&self.settings.session_file)?;
        println!("Your email is verified.");

        match self.client.save_user(&session.name, &session.email).await {
            Ok(saved) => {
                tracing::info!(id = saved.id, outcome = %saved.message, "Saved user");
            }
            Err(e) => {
                tracing::warn!(err = %e, "Couldn't save user, continuing");
            }
        }

        let order_type = inquire::Select::new(
            &format!("Welcome, {}! How would you like your order?", session.name),
            OrderType::ALL.to_vec(),
        )
        .with_render_config(self.render_config)
        .prompt()?;

        session.order_type = Some(order_type);
        session.save(&self.settings.session_file)?;

        println!("{order_type} it is. Continue to the menu to pick your dishes.");

        Ok(session)
    }

    fn prompt_identity(&self, previous: Option<&ClientSessionState>) -> Result<(String, Email)> {
        let mut name_prompt = inquire::Text::new("What's your name?")
            .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
                if input.trim().is_empty() {
                    Ok(Validation::Invalid("Please enter your name".into()))
                } else {
                    Ok(Validation::Valid)
                }
            })
            .with_render_config(self.render_config);

        if let Some(previous) = previous {
            name_prompt = name_prompt.with_default(&previous.name);
        }

        let name = name_prompt.prompt()?.trim().to_string();

        let policy = self.email_policy.clone();
        let mut email_prompt = inquire::Text::new("What's your email address?")
            .with_validator(move |input: &str| -> Result<Validation, CustomUserError> {
                match policy.parse(input) {
                    Ok(_) => Ok(Validation::Valid),
                    Err(_) => Ok(Validation::Invalid("Please enter a valid email".into())),
                }
            })
            .with_render_config(self.render_config);

        if let Some(previous) = previous {
            email_prompt = email_prompt.with_default(previous.email.as_str());
        }

        let email = self.email_policy.parse(&email_prompt.prompt()?)?;
        tracing::info!(%email, "Email entered");

        Ok((name, email))
    }

    async fn issue_code(&self, email: &Email) -> Result<()> {
        let issued = self.client.issue_code(email).await?;

        println!("We sent a verification code to {email}.");
        if let Some(otp) = issued.otp {
            println!("(Demo mode: your code is {otp})");
        }

        tracing::debug!(expires_at = %issued.expires_at, "Code issued");

        Ok(())
    }

    async fn verify_loop(&self, email: &Email) -> Result<()> {
        loop {
            let code = inquire::Text::new("Enter the 6-digit code:")
                .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
                    match input.trim().parse::<OtpCode>() {
                        Ok(_) => Ok(Validation::Valid),
                        Err(_) => Ok(Validation::Invalid(
                            "Please enter a valid 6-digit OTP".into(),
                        )),
                    }
                })
                .with_render_config(self.render_config)
                .prompt()?;

            let code: OtpCode = code.trim().parse()?;

            match self.client.verify_code(email, &code).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unauthorized() => {
                    println!("{e}");

                    let resend = inquire::Confirm::new("Send a new code?")
                        .with_default(false)
                        .with_render_config(self.render_config)
                        .prompt()?;

                    if resend {
                        self.issue_code(email).await?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn show_session(&self) -> Result<()> {
        let Some(session) = ClientSessionState::load(&self.settings.session_file)? else {
            println!("No session yet. Run \"devdine start\" to begin.");
            return Ok(());
        };

        println!("Name:       {}", session.name);
        println!("Email:      {}", session.email);
        match session.verified_at {
            Some(at) if session.verified => println!("Verified:   yes, at {at}"),
            _ => println!("Verified:   no"),
        }
        match session.order_type {
            Some(order_type) => println!("Order type: {order_type}"),
            None => println!("Order type: not picked yet"),
        }

        match self.client.get_user(&session.email).await {
            Ok(Some(user)) => {
                println!("Registered as user #{} since {}", user.id, user.created_at);
            }
            Ok(None) => println!("Not registered on the server yet."),
            Err(e) => {
                tracing::warn!(err = %e, "Couldn't look up user");
                println!("Couldn't look up your registration: {e}");
            }
        }

        Ok(())
    }
}

fn setup_tracing(ansi: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::from_default_env())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;
    use testresult::TestResult;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() -> TestResult {
        let cli = Cli::try_parse_from([
            "devdine",
            "--no-colors",
            "--api-endpoint",
            "http://localhost:4000",
            "session",
        ])?;

        assert!(cli.no_colors);
        assert_eq!(
            cli.api_endpoint.map(String::from).as_deref(),
            Some("http://localhost:4000/")
        );
        assert_matches!(cli.command, Commands::Session);

        Ok(())
    }

    #[test]
    fn test_requires_subcommand() {
        assert!(Cli::try_parse_from(["devdine"]).is_err());
    }
}
