mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use client_core::{
    compute_available_slots, validate_email, validate_phone, BookingFormController, BookingsApi,
    CancelOutcome, HttpBookingsApi, MissingBookingsApi, ProfileRefresh, SubmitOutcome,
};
use shared::{
    domain::{BookingId, ServiceKind},
    protocol::service_catalog,
};
use storage::{ProfileStore, Storage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::{load_settings, normalize_database_url, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "booking", about = "Book rooms, meeting rooms and spa treatments")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides the configured bookings API base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    /// Never contact the server; new bookings are only kept locally.
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the service catalog.
    Services,
    /// Show bookable start times.
    Slots {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List bookings from the server.
    List,
    /// Create a booking.
    Book(BookArgs),
    /// Change an existing booking.
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Cancel a booking.
    Cancel { id: String },
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Args, Debug)]
struct BookArgs {
    #[arg(long)]
    service: ServiceKind,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    time: String,
    /// Defaults to the cached profile name.
    #[arg(long)]
    name: Option<String>,
    /// Defaults to the cached profile email.
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: String,
    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(long)]
    service: Option<ServiceKind>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Show,
    /// Pull the profile from the server (rate limited).
    Refresh,
    /// Handle the URL the browser landed on after signing in.
    Login { url: Url },
    /// Forget the cached profile.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Services => {
            for service in service_catalog() {
                println!("{}", render::service_line(&service));
            }
            return Ok(());
        }
        Command::Slots { date } => {
            let slots = compute_available_slots(date);
            if slots.is_empty() {
                println!("Pick a date to see available times.");
            }
            for slot in slots {
                println!("{slot}");
            }
            return Ok(());
        }
        _ => {}
    }

    let mut settings = load_settings(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = normalize_database_url(&database_url);
    }

    let storage = Arc::new(
        Storage::new(&settings.database_url)
            .await
            .with_context(|| format!("failed to open local state at '{}'", settings.database_url))?,
    );
    storage.health_check().await?;
    let api: Arc<dyn BookingsApi> = if cli.offline {
        Arc::new(MissingBookingsApi)
    } else {
        let base_url = Url::parse(&settings.api_url)
            .with_context(|| format!("invalid api url '{}'", settings.api_url))?;
        Arc::new(HttpBookingsApi::new(base_url, settings.http_timeout())?)
    };
    info!(api_url = %settings.api_url, offline = cli.offline, "booking: starting");

    let controller = BookingFormController::new_with_dependencies(
        api,
        storage.clone(),
        Arc::new(client_core::SystemClock),
        settings.controller_settings(),
    );
    controller.init(None).await;

    match cli.command {
        Command::Services | Command::Slots { .. } => {}
        Command::List => {
            let bookings = controller.bookings().await;
            if bookings.is_empty() {
                println!("No bookings yet.");
            }
            for entry in &bookings {
                println!("{}", render::booking_line(entry));
            }
        }
        Command::Book(args) => book(&controller, args).await?,
        Command::Edit { id, changes } => edit(&controller, BookingId(id), changes).await?,
        Command::Cancel { id } => {
            controller.open_cancel(BookingId(id)).await;
            match controller.confirm_cancel().await {
                CancelOutcome::Cancelled(id) => println!("Booking {id} cancelled."),
                CancelOutcome::Failed(reason) => bail!("cancel failed: {reason}"),
                CancelOutcome::NothingPending => {}
            }
        }
        Command::Profile(command) => profile(&controller, storage, command).await?,
    }

    Ok(())
}

async fn book(controller: &Arc<BookingFormController>, args: BookArgs) -> Result<()> {
    controller.select_service(args.service).await;
    controller.select_date(Some(args.date)).await;
    if !controller.snapshot().await.available_slots.contains(&args.time) {
        warn!(time = %args.time, "booking: time is outside the offered slots");
    }
    controller.select_time(args.time).await;
    controller
        .update_draft(|draft| {
            if let Some(name) = args.name {
                draft.name = name;
            }
            if let Some(email) = args.email {
                draft.email = email;
            }
            draft.phone = args.phone;
            draft.notes = args.notes;
        })
        .await;

    submit(controller).await
}

async fn edit(
    controller: &Arc<BookingFormController>,
    id: BookingId,
    changes: EditArgs,
) -> Result<()> {
    let Some(entry) = controller.snapshot().await.find_booking(&id).cloned() else {
        bail!("no booking with id {id}");
    };
    controller.edit_booking(&entry.booking).await;

    if let Some(service) = changes.service {
        controller.select_service(service).await;
    }
    if let Some(date) = changes.date {
        controller.select_date(Some(date)).await;
    }
    if let Some(time) = changes.time {
        controller.select_time(time).await;
    }
    controller
        .update_draft(|draft| {
            if let Some(name) = changes.name {
                draft.name = name;
            }
            if let Some(email) = changes.email {
                draft.email = email;
            }
            if let Some(phone) = changes.phone {
                draft.phone = phone;
            }
            if let Some(notes) = changes.notes {
                draft.notes = notes;
            }
        })
        .await;

    submit(controller).await
}

async fn submit(controller: &Arc<BookingFormController>) -> Result<()> {
    let draft = controller.snapshot().await.draft;
    if !validate_email(&draft.email) {
        warn!(email = %draft.email, "booking: email address looks malformed");
    }
    if !validate_phone(&draft.phone) {
        warn!(phone = %draft.phone, "booking: phone number looks malformed");
    }

    match controller.submit_remote().await {
        SubmitOutcome::NotReady => {
            bail!("service, date, time, name, email and phone are all required")
        }
        SubmitOutcome::Created(booking) => {
            println!("Booking confirmed.\n{}", render::confirmation(&booking));
        }
        SubmitOutcome::CreatedLocally(booking) => {
            println!(
                "Server unavailable, booking kept locally.\n{}",
                render::confirmation(&booking)
            );
        }
        SubmitOutcome::Updated(booking) => {
            println!("Booking updated.\n{}", render::confirmation(&booking));
        }
        SubmitOutcome::UpdateFailed(reason) => bail!("update failed: {reason}"),
    }
    Ok(())
}

async fn profile(
    controller: &Arc<BookingFormController>,
    storage: Arc<Storage>,
    command: ProfileCommand,
) -> Result<()> {
    match command {
        ProfileCommand::Show => match ProfileStore::new(storage).load_profile().await {
            Some(profile) => {
                println!("{} <{}>", profile.name, profile.email);
                println!("avatar: {}", controller.avatar_or_fallback().await);
            }
            None => println!("Not signed in."),
        },
        ProfileCommand::Refresh => match controller.refresh_profile().await {
            ProfileRefresh::Refreshed(profile) => {
                println!("Signed in as {} <{}>", profile.name, profile.email)
            }
            ProfileRefresh::RateLimited => println!("Profile refreshed recently, using cached data."),
            ProfileRefresh::Incomplete => println!("Server returned no usable profile."),
            ProfileRefresh::Failed(reason) => bail!("profile refresh failed: {reason}"),
        },
        ProfileCommand::Login { url } => match controller.complete_login(&url).await {
            Some(cleaned) => println!("{cleaned}"),
            None => println!("Not a sign-in callback URL."),
        },
        ProfileCommand::Clear => {
            controller.clear_profile().await?;
            println!("Signed out.");
        }
    }
    Ok(())
}
