//! Command-line shell over the session core.
//!
//! Each invocation restores the persisted session, performs one intent and
//! exits. `login` stays in a single process so the OTP challenge never
//! leaves memory.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use session_core::common::OTP_LENGTH;
use session_core::config::Config;
use session_core::domains::cart::{Cart, CartItem, Category};
use session_core::domains::profile::{
    FixedLocationProvider, Location, ProfileSummary, RegistrationForm,
};
use session_core::{RouteState, SessionDeps, SessionError, SessionService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_CODE_ATTEMPTS: usize = 3;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront account and session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a one-time code sent to your phone
    Login {
        #[arg(long)]
        phone: Option<String>,
    },

    /// Verify a new number and register it
    Register(RegisterArgs),

    /// Show the signed-in user's dashboard
    Whoami,

    /// Re-validate the session and pull the latest profile
    Refresh,

    /// Sign out and forget the session on this device
    Logout,

    /// Print the current session state
    State,

    /// Price a cart. Items are `id:name:unit_price:quantity:category`
    Quote {
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
}

#[derive(Args)]
struct RegisterArgs {
    /// Number to verify; prompted for when omitted
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    gender: String,
    #[arg(long)]
    age: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long = "address-line1")]
    address_line1: String,
    #[arg(long = "address-line2", default_value = "")]
    address_line2: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    district: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    country: String,
    #[arg(long = "postal-code")]
    postal_code: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl RegisterArgs {
    fn form(&self) -> RegistrationForm {
        RegistrationForm {
            name: self.name.clone(),
            email: self.email.clone(),
            gender: self.gender.clone(),
            age: self.age.clone(),
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            city: self.city.clone(),
            district: self.district.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            postal_code: self.postal_code.clone(),
        }
    }

    /// Without both coordinates the provider reports no position
    fn location(&self) -> Result<FixedLocationProvider> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let location = Location::new(lat, lon).map_err(|e| anyhow::anyhow!("{}", e))?;
                Ok(FixedLocationProvider::new(Some(location)))
            }
            _ => Ok(FixedLocationProvider::new(None)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,session_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let outcome = match cli.command {
        Commands::Quote { items } => quote(&items, config.delivery_fee),
        Commands::Login { phone } => login(&connect(&config).await?, phone).await,
        Commands::Register(args) => register(&connect(&config).await?, &args).await,
        Commands::Whoami => whoami(&connect(&config).await?).await,
        Commands::Refresh => refresh(&connect(&config).await?).await,
        Commands::Logout => logout(&connect(&config).await?).await,
        Commands::State => state(&connect(&config).await?).await,
    };

    if let Err(e) = outcome {
        match e.downcast_ref::<SessionError>() {
            Some(session_error) => {
                eprintln!("{}", session_error.user_message().bright_red());
                std::process::exit(1);
            }
            None => return Err(e),
        }
    }
    Ok(())
}

async fn connect(config: &Config) -> Result<SessionService> {
    Ok(SessionDeps::from_config(config)
        .await
        .context("Failed to set up session dependencies")?
        .into_service())
}

/// Restore the persisted session. An expired session is reported and the
/// command continues signed out.
async fn restore(service: &SessionService) -> Result<RouteState> {
    match service.start().await {
        Ok(state) => Ok(state),
        Err(SessionError::SessionExpired) => {
            println!("{}", SessionError::SessionExpired.user_message().yellow());
            Ok(RouteState::Unauthenticated)
        }
        Err(e) => Err(e.into()),
    }
}

async fn login(service: &SessionService, phone: Option<String>) -> Result<()> {
    if restore(service).await?.is_authenticated() {
        println!("{}", "Already signed in. Run `storefront logout` first.".yellow());
        return Ok(());
    }

    match authenticate(service, phone).await? {
        RouteState::AuthenticatedComplete => {
            println!("{}", "Signed in.".bright_green().bold());
        }
        _ => {
            println!("{}", "Signed in.".bright_green().bold());
            println!("This number is not registered yet. Run `storefront register` to finish.");
        }
    }
    Ok(())
}

/// Prompt for the phone number (unless given) and the code, allowing a few
/// retries of a mistyped code against the same challenge.
async fn authenticate(service: &SessionService, phone: Option<String>) -> Result<RouteState> {
    let theme = ColorfulTheme::default();
    let phone = match phone {
        Some(phone) => phone,
        None => Input::with_theme(&theme)
            .with_prompt("Phone number")
            .interact_text()?,
    };

    let challenge = service.sign_in(&phone).await?;
    println!(
        "{} {}",
        "Code sent to".bright_green(),
        challenge.phone_number().bold()
    );

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code: String = Input::with_theme(&theme)
            .with_prompt(format!("{}-digit code", OTP_LENGTH))
            .interact_text()?;

        match service.confirm_otp(&challenge, &code).await {
            Ok(state) => return Ok(state),
            Err(SessionError::InvalidCode) if attempt < MAX_CODE_ATTEMPTS => {
                println!("{}", SessionError::InvalidCode.user_message().bright_red());
            }
            Err(e) => return Err(e.into()),
        }
    }
    bail!(SessionError::InvalidCode)
}

/// A new number has no token until its registration is accepted, so the
/// code is verified and the form submitted in the same process.
async fn register(service: &SessionService, args: &RegisterArgs) -> Result<()> {
    // Validate before sending a code, so a bad form costs no SMS
    let form = args.form();
    form.validate()?;
    let location = args.location()?;

    let mut state = restore(service).await?;
    if state == RouteState::Unauthenticated {
        state = authenticate(service, args.phone.clone()).await?;
    }
    if state == RouteState::AuthenticatedComplete {
        println!("{}", "This number is already registered.".yellow());
        return Ok(());
    }

    let profile = service.register(&form, &location).await?;

    println!("{}", "Registration complete.".bright_green().bold());
    if let Some(identity) = service.snapshot().await.identity {
        print!("{}", ProfileSummary::new(&identity, &profile));
    }
    Ok(())
}

async fn whoami(service: &SessionService) -> Result<()> {
    restore(service).await?;
    let snapshot = service.snapshot().await;
    match (snapshot.identity, snapshot.profile) {
        (Some(identity), Some(profile)) => {
            print!("{}", ProfileSummary::new(&identity, &profile));
        }
        (Some(identity), None) => {
            println!("Signed in as {} (registration pending)", identity.phone_number);
        }
        _ => println!("{}", "Not signed in.".yellow()),
    }
    Ok(())
}

async fn refresh(service: &SessionService) -> Result<()> {
    if !restore(service).await?.is_authenticated() {
        println!("{}", "Not signed in.".yellow());
        return Ok(());
    }
    let profile = service.refresh().await?;
    println!(
        "{} ({})",
        "Profile refreshed".bright_green(),
        if profile.registration_complete {
            "registered"
        } else {
            "registration pending"
        }
    );
    Ok(())
}

async fn logout(service: &SessionService) -> Result<()> {
    service.sign_out().await?;
    println!("{}", "Signed out.".bright_green());
    Ok(())
}

async fn state(service: &SessionService) -> Result<()> {
    let state = restore(service).await?;
    println!("{} ({:?})", state.to_string().bold(), state.screen());
    Ok(())
}

fn parse_item(raw: &str) -> Result<CartItem> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [id, name, unit_price, quantity, category] = parts.as_slice() else {
        bail!("item '{}' must be id:name:unit_price:quantity:category", raw);
    };
    let category = match category.to_ascii_lowercase().as_str() {
        "grocery" => Category::Grocery,
        "food" => Category::Food,
        "medicine" => Category::Medicine,
        other => bail!("unknown category '{}'", other),
    };
    Ok(CartItem {
        id: id.to_string(),
        name: name.to_string(),
        unit_price: unit_price
            .parse()
            .with_context(|| format!("invalid price in '{}'", raw))?,
        quantity: quantity
            .parse()
            .with_context(|| format!("invalid quantity in '{}'", raw))?,
        category,
    })
}

fn quote(items: &[String], delivery_fee: i64) -> Result<()> {
    let mut cart = Cart::new(delivery_fee);
    for raw in items {
        cart.add(parse_item(raw)?)?;
    }

    for line in cart.items() {
        println!(
            "{:<24} {:>3} x {:>6} = {:>8}  [{}]",
            line.name,
            line.quantity,
            line.unit_price,
            line.line_total()?,
            line.category
        );
    }
    println!("{:<40} {:>8}", "Subtotal", cart.subtotal()?);
    println!("{:<40} {:>8}", "Delivery", cart.delivery_fee());
    println!("{:<40} {:>8}", "Total".bold(), cart.total()?);
    println!("{} items", cart.item_count());
    Ok(())
}
